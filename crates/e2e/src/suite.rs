//! Declarative YAML check definitions
//!
//! A suite directory holds one check per `.yaml`/`.yml` file:
//!
//! ```yaml
//! name: api_year
//! description: Filtering by release year
//! tags: [api, filtering]
//! api:
//!   flow: year
//!   year: 2001
//!   limit: 5
//! ```
//!
//! UI checks use a `ui:` section instead (`flow: home_page`, `flow: search`, ...).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::contract::ApiCheck;
use crate::error::{E2eError, E2eResult};
use crate::probe::UiFlow;

/// A single named check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSpec {
    /// Unique name; also the evidence directory
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(flatten)]
    pub target: CheckTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckTarget {
    Api(ApiCheck),
    Ui(UiFlow),
}

impl CheckTarget {
    /// Short `surface/flow` label, e.g. `api/year` or `ui/search`
    pub fn flow_name(&self) -> &'static str {
        match self {
            CheckTarget::Api(ApiCheck::KeyValid { .. }) => "api/key_valid",
            CheckTarget::Api(ApiCheck::Search { .. }) => "api/search",
            CheckTarget::Api(ApiCheck::AgeRating { .. }) => "api/age_rating",
            CheckTarget::Api(ApiCheck::Year { .. }) => "api/year",
            CheckTarget::Api(ApiCheck::Genre { .. }) => "api/genre",
            CheckTarget::Api(ApiCheck::Listing { .. }) => "api/listing",
            CheckTarget::Ui(UiFlow::HomePage) => "ui/home_page",
            CheckTarget::Ui(UiFlow::Search { .. }) => "ui/search",
            CheckTarget::Ui(UiFlow::DetailPage { .. }) => "ui/detail_page",
            CheckTarget::Ui(UiFlow::Navigation) => "ui/navigation",
            CheckTarget::Ui(UiFlow::ListingPage { .. }) => "ui/listing_page",
        }
    }
}

impl CheckSpec {
    pub fn is_ui(&self) -> bool {
        matches!(self.target, CheckTarget::Ui(_))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Parse a check from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a check from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SuiteParse(format!("{}: {}", path.display(), e)))
    }

    /// Load every check under `dir`, recursively, sorted by file path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::SuiteParse(format!(
                "suite directory {} does not exist",
                dir.display()
            )));
        }

        let mut specs = Vec::new();
        let mut names = HashSet::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            if !names.insert(spec.name.clone()) {
                return Err(E2eError::SuiteParse(format!(
                    "duplicate check name '{}' in {}",
                    spec.name,
                    entry.path().display()
                )));
            }
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Keep checks carrying `tag` and/or named `name`
    pub fn select(specs: Vec<Self>, tag: Option<&str>, name: Option<&str>) -> Vec<Self> {
        specs
            .into_iter()
            .filter(|s| tag.map_or(true, |t| s.has_tag(t)))
            .filter(|s| name.map_or(true, |n| s.name == n))
            .collect()
    }
}

fn tags(items: &[&str]) -> Vec<String> {
    items.iter().map(|t| t.to_string()).collect()
}

fn api(name: &str, description: &str, tag_list: &[&str], check: ApiCheck) -> CheckSpec {
    CheckSpec {
        name: name.to_string(),
        description: description.to_string(),
        tags: tags(tag_list),
        target: CheckTarget::Api(check),
    }
}

fn ui(name: &str, description: &str, tag_list: &[&str], flow: UiFlow) -> CheckSpec {
    CheckSpec {
        name: name.to_string(),
        description: description.to_string(),
        tags: tags(tag_list),
        target: CheckTarget::Ui(flow),
    }
}

/// Built-in suite: six API checks, five UI flows
pub fn default_suite() -> Vec<CheckSpec> {
    let shrek = tags(&["шрэк", "shrek"]);

    vec![
        api(
            "api_key_valid",
            "The access key is accepted",
            &["api", "smoke"],
            ApiCheck::KeyValid { limit: 1 },
        ),
        api(
            "api_search",
            "Search by title returns matching names",
            &["api", "search"],
            ApiCheck::Search {
                query: "Шрек".to_string(),
                limit: 3,
            },
        ),
        api(
            "api_age_rating",
            "Age rating filter returns 16+ titles",
            &["api", "filtering"],
            ApiCheck::AgeRating { min_age: 16, limit: 5 },
        ),
        api(
            "api_year",
            "Release year filter is exact",
            &["api", "filtering"],
            ApiCheck::Year { year: 2001, limit: 5 },
        ),
        api(
            "api_genre",
            "Genre filter returns animation",
            &["api", "filtering"],
            ApiCheck::Genre {
                genre: "мультфильм".to_string(),
                limit: 5,
                keywords: tags(&crate::predicates::ANIMATION_KEYWORDS),
            },
        ),
        api(
            "api_listing",
            "Series listing is not empty",
            &["api", "filtering"],
            ApiCheck::Listing {
                kind: "tv-series".to_string(),
                limit: 3,
            },
        ),
        ui(
            "ui_home_page",
            "Home page loads with the site title",
            &["ui", "smoke"],
            UiFlow::HomePage,
        ),
        ui(
            "ui_search",
            "Searching the site finds Shrek",
            &["ui", "search"],
            UiFlow::Search {
                query: "Шрэк".to_string(),
                terms: shrek.clone(),
            },
        ),
        ui(
            "ui_detail_page",
            "Film page for Shrek opens",
            &["ui", "navigation"],
            UiFlow::DetailPage {
                film_id: 430,
                keywords: shrek,
                years: vec![2001, 2002, 2003, 2004],
            },
        ),
        ui(
            "ui_navigation",
            "Navigation links are present and clickable",
            &["ui", "navigation"],
            UiFlow::Navigation,
        ),
        ui(
            "ui_listing_page",
            "Movies-in-cinema listing has content",
            &["ui", "navigation"],
            UiFlow::ListingPage {
                slug: "lists/movies/movies-in-cinema".to_string(),
                link_text: "в кино".to_string(),
                title_keywords: tags(&["кино", "фильм", "cinema", "movie"]),
                content_keywords: tags(&["фильм", "кино", "movie", "cinema", "режиссер", "актер"]),
            },
        ),
    ]
}
