//! API flows: request parameters plus the business rule each one enforces

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kinocheck_common::{ApiQuerySpec, ContractVerdict};

use crate::api::ApiContractChecker;
use crate::error::{E2eError, E2eResult};
use crate::predicates;
use crate::report::{FlowOutcome, ReportSink};

pub const MOVIE_PATH: &str = "/v1.4/movie";
pub const SEARCH_PATH: &str = "/v1.4/movie/search";

/// An API flow and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum ApiCheck {
    /// The access key is accepted
    KeyValid {
        #[serde(default = "default_key_limit")]
        limit: u32,
    },
    /// At least one result name contains the query
    Search {
        query: String,
        #[serde(default = "default_limit")]
        limit: u32,
    },
    /// Every coercible age rating is at least `min_age`
    AgeRating {
        min_age: i64,
        #[serde(default = "default_limit")]
        limit: u32,
    },
    /// Every result was released in `year`
    Year {
        year: i64,
        #[serde(default = "default_limit")]
        limit: u32,
    },
    /// Every result has a genre matching one of `keywords`
    Genre {
        genre: String,
        #[serde(default = "default_limit")]
        limit: u32,
        #[serde(default = "default_genre_keywords")]
        keywords: Vec<String>,
    },
    /// Listing by content type (`movie`, `tv-series`, ...) is non-empty
    Listing {
        kind: String,
        #[serde(default = "default_limit")]
        limit: u32,
    },
}

fn default_key_limit() -> u32 {
    1
}

fn default_limit() -> u32 {
    5
}

fn default_genre_keywords() -> Vec<String> {
    predicates::ANIMATION_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

impl ApiCheck {
    /// The request this flow sends
    pub fn query_spec(&self) -> ApiQuerySpec {
        match self {
            ApiCheck::KeyValid { limit } => ApiQuerySpec::new(MOVIE_PATH).param("limit", *limit),
            ApiCheck::Search { query, limit } => ApiQuerySpec::new(SEARCH_PATH)
                .param("query", query.as_str())
                .param("limit", *limit),
            ApiCheck::AgeRating { min_age, limit } => by_rating(
                ApiQuerySpec::new(MOVIE_PATH)
                    .param("ageRating", *min_age)
                    .param("limit", *limit),
            ),
            ApiCheck::Year { year, limit } => ApiQuerySpec::new(MOVIE_PATH)
                .param("year", *year)
                .param("limit", *limit),
            ApiCheck::Genre { genre, limit, .. } => by_rating(
                ApiQuerySpec::new(MOVIE_PATH)
                    .param("genres.name", genre.as_str())
                    .param("limit", *limit),
            ),
            ApiCheck::Listing { kind, limit } => by_rating(
                ApiQuerySpec::new(MOVIE_PATH)
                    .param("type", kind.as_str())
                    .param("limit", *limit),
            ),
        }
    }
}

fn by_rating(spec: ApiQuerySpec) -> ApiQuerySpec {
    spec.param("sortField", "rating.kp").param("sortType", -1i64)
}

/// Send the flow's request and judge the verdict.
///
/// Transport failures are returned as `Network` with the request line as
/// evidence. Status and envelope problems are `ContractViolation`; an empty
/// result set or a broken business rule is `BusinessPredicate`. Evidence is
/// attached before any of them is returned.
pub async fn run_api_check(
    checker: &ApiContractChecker<'_>,
    check_name: &str,
    check: &ApiCheck,
    sink: &dyn ReportSink,
) -> E2eResult<FlowOutcome> {
    let spec = check.query_spec();
    let verdict = match checker.check(&spec).await {
        Ok(verdict) => verdict,
        Err(e) => {
            sink.attach_text(check_name, "response", &format!("{}\n{}: {}", spec, e.kind(), e));
            return Err(e);
        }
    };
    judge(check_name, check, &spec, &verdict, sink)
}

/// Apply contract and business rules to a verdict
pub fn judge(
    check_name: &str,
    check: &ApiCheck,
    spec: &ApiQuerySpec,
    verdict: &ContractVerdict,
    sink: &dyn ReportSink,
) -> E2eResult<FlowOutcome> {
    let mut outcome = FlowOutcome::default();

    sink.attach_text(
        check_name,
        "response",
        &format!("{}\nstatus: {}\n\n{}", spec, verdict.status_code, verdict.body_preview),
    );

    if !verdict.is_valid() {
        return Err(E2eError::ContractViolation {
            check: check_name.to_string(),
            status: verdict.status_code,
            reason: verdict.violations.join("; "),
            body_preview: verdict.body_preview.clone(),
        });
    }

    let records = &verdict.records;
    if !records.is_empty() {
        let lines: Vec<String> = records.iter().map(predicates::describe).collect();
        sink.attach_text(check_name, "records", &lines.join("\n"));
    }

    let violations = match check {
        // Key validity is status and envelope only; an empty page is still a valid key
        ApiCheck::KeyValid { .. } => Vec::new(),
        _ if records.is_empty() => predicates::non_empty(records),
        ApiCheck::Listing { .. } => Vec::new(),
        ApiCheck::Search { query, .. } => predicates::search_match(records, query),
        ApiCheck::AgeRating { min_age, .. } => {
            let report = predicates::age_rating_at_least(records, *min_age);
            for skipped in report.skipped {
                warn!("{}: {}", check_name, skipped);
                outcome.warn(format!("skipped {}", skipped));
            }
            report.violations
        }
        ApiCheck::Year { year, .. } => predicates::year_equals(records, *year),
        ApiCheck::Genre { keywords, .. } => predicates::genre_matches_any(records, keywords),
    };

    if !violations.is_empty() {
        sink.attach_text(check_name, "violations", &violations.join("\n"));
        return Err(E2eError::BusinessPredicate {
            check: check_name.to_string(),
            violations,
        });
    }

    info!("{}: {} records satisfy the contract", check_name, records.len());
    outcome.note(format!("{} records returned", records.len()));
    Ok(outcome)
}
