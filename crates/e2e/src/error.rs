//! Error types for verification flows

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Contract violation in {check}: {reason} (status {status}, body: {body_preview})")]
    ContractViolation {
        check: String,
        status: u16,
        reason: String,
        body_preview: String,
    },

    #[error("Business predicate failed in {check}: {}", violations.join("; "))]
    BusinessPredicate {
        check: String,
        violations: Vec<String>,
    },

    #[error("Element not found: {what} (tried {strategies} strategies)")]
    ElementNotFound { what: String, strategies: usize },

    #[error("Page did not load: url={url}, title={title}")]
    PageLoadFailure {
        url: String,
        title: String,
        evidence: Option<PathBuf>,
    },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Configuration error: {0}")]
    Config(#[from] kinocheck_common::Error),

    #[error("Suite parse error: {0}")]
    SuiteParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl E2eError {
    /// Whether this error fails the flow it escaped from.
    ///
    /// Only element absence is non-fatal; callers that cannot tolerate it
    /// escalate to `PageLoadFailure` themselves.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, E2eError::ElementNotFound { .. })
    }

    /// Stable label for reports
    pub fn kind(&self) -> &'static str {
        match self {
            E2eError::Network(_) => "network_error",
            E2eError::ContractViolation { .. } => "contract_violation",
            E2eError::BusinessPredicate { .. } => "business_predicate_failure",
            E2eError::ElementNotFound { .. } => "element_not_found",
            E2eError::PageLoadFailure { .. } => "page_load_failure",
            E2eError::AssertionFailed(_) => "assertion_failed",
            E2eError::Browser(_) => "browser_error",
            E2eError::Config(_) => "config_error",
            E2eError::SuiteParse(_) => "suite_parse_error",
            E2eError::Io(_) => "io_error",
            E2eError::Json(_) => "json_error",
            E2eError::Yaml(_) => "yaml_error",
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_absence_is_non_fatal() {
        let absent = E2eError::ElementNotFound {
            what: "logo".into(),
            strategies: 5,
        };
        assert!(!absent.is_fatal());
        assert_eq!(absent.kind(), "element_not_found");

        let failed = E2eError::PageLoadFailure {
            url: "https://example.test/".into(),
            title: String::new(),
            evidence: None,
        };
        assert!(failed.is_fatal());
        assert_eq!(failed.kind(), "page_load_failure");
    }

    #[test]
    fn test_predicate_message_lists_violations() {
        let err = E2eError::BusinessPredicate {
            check: "api_year".into(),
            violations: vec![
                "record #0 'A': year None".into(),
                "record #2 'C': year Some(2000)".into(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("api_year"));
        assert!(msg.contains("record #0 'A'"));
        assert!(msg.contains("; record #2"));
    }
}
