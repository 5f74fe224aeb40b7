//! Core types shared by the API checker and the UI probe

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// UI side
// =============================================================================

/// What an element matched by a strategy's query must also satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchPredicate {
    /// Attached to the DOM; visibility and text are not checked
    Present,

    /// Displayed on the page
    Visible,

    /// Displayed, and the inner text contains one of the needles (case-insensitive)
    TextContainsAny { needles: Vec<String> },

    /// Displayed, with non-empty trimmed text shorter than `max_len` characters
    NonEmptyText { max_len: Option<usize> },
}

impl MatchPredicate {
    /// Whether this predicate needs the element's text
    pub fn needs_text(&self) -> bool {
        !matches!(self, MatchPredicate::Present | MatchPredicate::Visible)
    }

    /// Evaluate the text part of the predicate
    pub fn accepts_text(&self, text: &str) -> bool {
        match self {
            MatchPredicate::Present | MatchPredicate::Visible => true,
            MatchPredicate::TextContainsAny { needles } => {
                let haystack = text.to_lowercase();
                needles.iter().any(|n| haystack.contains(&n.to_lowercase()))
            }
            MatchPredicate::NonEmptyText { max_len } => {
                let trimmed = text.trim();
                !trimmed.is_empty() && max_len.map_or(true, |max| trimmed.chars().count() < max)
            }
        }
    }
}

/// One way of finding a page element. A slice of these forms a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorStrategy {
    /// CSS selector
    pub query: String,
    pub predicate: MatchPredicate,
}

impl SelectorStrategy {
    pub fn present(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            predicate: MatchPredicate::Present,
        }
    }

    pub fn visible(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            predicate: MatchPredicate::Visible,
        }
    }

    pub fn with_text<I, S>(query: impl Into<String>, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: query.into(),
            predicate: MatchPredicate::TextContainsAny {
                needles: needles.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn non_empty_text(query: impl Into<String>, max_len: Option<usize>) -> Self {
        Self {
            query: query.into(),
            predicate: MatchPredicate::NonEmptyText { max_len },
        }
    }
}

impl std::fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.predicate {
            MatchPredicate::Present => write!(f, "{} (present)", self.query),
            MatchPredicate::Visible => write!(f, "{}", self.query),
            MatchPredicate::TextContainsAny { needles } => {
                write!(f, "{} ~ [{}]", self.query, needles.join("|"))
            }
            MatchPredicate::NonEmptyText { max_len: Some(max) } => {
                write!(f, "{} (text < {})", self.query, max)
            }
            MatchPredicate::NonEmptyText { max_len: None } => write!(f, "{} (text)", self.query),
        }
    }
}

/// Outcome of a locate or wait attempt. Absence is a normal value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub found: bool,
    pub strategy_index: Option<usize>,
    pub diagnostic: Option<String>,

    /// Reached through a heuristic fallback rather than a primary condition
    #[serde(default)]
    pub degraded: bool,
}

impl ProbeResult {
    pub fn found(index: usize) -> Self {
        Self {
            found: true,
            strategy_index: Some(index),
            diagnostic: None,
            degraded: false,
        }
    }

    pub fn not_found(diagnostic: impl Into<String>) -> Self {
        Self {
            found: false,
            strategy_index: None,
            diagnostic: Some(diagnostic.into()),
            degraded: false,
        }
    }

    pub fn degraded(diagnostic: impl Into<String>) -> Self {
        Self {
            found: true,
            strategy_index: None,
            diagnostic: Some(diagnostic.into()),
            degraded: true,
        }
    }
}

// =============================================================================
// API side
// =============================================================================

/// A query parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for QueryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryValue::Number(n) => write!(f, "{}", n),
            QueryValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for QueryValue {
    fn from(n: i64) -> Self {
        QueryValue::Number(n)
    }
}

impl From<u32> for QueryValue {
    fn from(n: u32) -> Self {
        QueryValue::Number(i64::from(n))
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::Text(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::Text(s)
    }
}

/// Endpoint path plus ordered query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiQuerySpec {
    pub path: String,
    pub params: Vec<(String, QueryValue)>,
}

impl ApiQuerySpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Parameters rendered as string pairs, in declaration order
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl std::fmt::Display for ApiQuerySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GET {}", self.path)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            write!(f, "{}{}={}", if i == 0 { '?' } else { '&' }, k, v)?;
        }
        Ok(())
    }
}

/// Age rating as the upstream reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgeRating {
    Number(i64),
    Text(String),
}

impl AgeRating {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => AgeRating::Number(i),
                None => AgeRating::Text(n.to_string()),
            }),
            Value::String(s) => Some(AgeRating::Text(s.clone())),
            other => Some(AgeRating::Text(other.to_string())),
        }
    }

    /// Integer value after trimming whitespace and a trailing `+`
    pub fn coerce(&self) -> Option<i64> {
        match self {
            AgeRating::Number(n) => Some(*n),
            AgeRating::Text(s) => s.trim().trim_end_matches('+').trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for AgeRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgeRating::Number(n) => write!(f, "{}", n),
            AgeRating::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub kp: Option<f64>,
}

/// Normalized view of one entry of a response's `docs` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: Option<i64>,
    pub name: String,
    pub year: Option<i64>,
    pub age_rating: Option<AgeRating>,
    pub genres: Vec<Genre>,
    pub rating: Option<Rating>,
}

impl MovieRecord {
    /// Build a record from a raw document.
    ///
    /// Missing fields are defaulted rather than rejected: name to `""`, year
    /// to `None` (also for non-integer years), ageRating to `0` (an explicit
    /// `null` stays `None`), genres to empty, rating to `None`.
    pub fn from_document(doc: &Value) -> Self {
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let year = doc
            .get("year")
            .filter(|y| y.is_i64() || y.is_u64())
            .and_then(Value::as_i64);

        let age_rating = match doc.get("ageRating") {
            None => Some(AgeRating::Number(0)),
            Some(v) => AgeRating::from_value(v),
        };

        let genres = doc
            .get("genres")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|g| Genre {
                        name: g
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let rating = doc.get("rating").filter(|r| r.is_object()).map(|r| Rating {
            kp: r.get("kp").and_then(Value::as_f64),
        });

        Self {
            id: doc.get("id").and_then(Value::as_i64),
            name,
            year,
            age_rating,
            genres,
            rating,
        }
    }

    /// Short human label used in evidence and violation messages
    pub fn label(&self) -> String {
        let name = if self.name.is_empty() { "<unnamed>" } else { self.name.as_str() };
        match self.id {
            Some(id) => format!("'{}' (id {})", name, id),
            None => format!("'{}'", name),
        }
    }

    /// Lower-cased genre names
    pub fn genre_names(&self) -> Vec<String> {
        self.genres.iter().map(|g| g.name.to_lowercase()).collect()
    }
}

/// Result of one API contract check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractVerdict {
    pub status_code: u16,
    pub schema_valid: bool,
    pub records: Vec<MovieRecord>,
    pub violations: Vec<String>,

    /// Leading part of the raw body, kept as evidence
    pub body_preview: String,
}

impl ContractVerdict {
    /// Status 200 with a well-formed envelope
    pub fn is_valid(&self) -> bool {
        self.status_code == 200 && self.schema_valid
    }
}
