//! API contract checker
//!
//! One `ApiSession` is built per run and shared read-only by every check.
//! The checker itself is generic: it validates transport, status and the
//! `{ "docs": [...] }` envelope, and leaves business rules to the calling flow.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use serde_json::Value;
use tracing::debug;

use kinocheck_common::{ApiQuerySpec, ContractVerdict, HarnessConfig, MovieRecord};

use crate::error::E2eResult;

/// Header carrying the access key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticated HTTP session with fixed headers
#[derive(Debug, Clone)]
pub struct ApiSession {
    client: reqwest::Client,
    base_url: String,
}

impl ApiSession {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> E2eResult<Self> {
        let mut key = HeaderValue::from_str(api_key).map_err(|e| {
            let reason = format!("API key is not a valid header value: {}", e);
            kinocheck_common::Error::InvalidConfig(reason)
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the session from configuration; fails if no key is configured
    pub fn from_config(config: &HarnessConfig) -> E2eResult<Self> {
        let key = config.api_key()?;
        Self::new(
            &config.api.base_url,
            key,
            Duration::from_millis(config.api.request_timeout_ms),
        )
    }

    /// Absolute URL for an endpoint path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Issues GET requests and validates the response envelope
pub struct ApiContractChecker<'a> {
    session: &'a ApiSession,
    preview_chars: usize,
}

impl<'a> ApiContractChecker<'a> {
    pub fn new(session: &'a ApiSession, preview_chars: usize) -> Self {
        Self {
            session,
            preview_chars,
        }
    }

    /// Run one request.
    ///
    /// Transport failures are errors; everything about the response itself
    /// (status, shape) lands in the verdict.
    pub async fn check(&self, spec: &ApiQuerySpec) -> E2eResult<ContractVerdict> {
        let url = self.session.url_for(&spec.path);
        debug!("{}", spec);

        let response = self
            .session
            .client
            .get(&url)
            .query(&spec.query_pairs())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("{} -> {} ({} bytes)", spec.path, status, body.len());

        Ok(evaluate_body(status, &body, self.preview_chars))
    }
}

/// Build a verdict from a status code and raw body
pub fn evaluate_body(status: u16, body: &str, preview_chars: usize) -> ContractVerdict {
    let body_preview: String = body.chars().take(preview_chars).collect();
    let mut violations = Vec::new();

    if status != 200 {
        violations.push(format!("unexpected status {}", status));
    }

    let (schema_valid, records) = match serde_json::from_str::<Value>(body) {
        Err(e) => {
            violations.push(format!("body is not JSON: {}", e));
            (false, Vec::new())
        }
        Ok(document) => match document.get("docs") {
            None => {
                violations.push("response has no 'docs' field".to_string());
                (false, Vec::new())
            }
            Some(Value::Array(docs)) => {
                (true, docs.iter().map(MovieRecord::from_document).collect())
            }
            Some(other) => {
                violations.push(format!("'docs' is not a sequence (got {})", json_type(other)));
                (false, Vec::new())
            }
        },
    };

    ContractVerdict {
        status_code: status,
        schema_valid,
        records,
        violations,
        body_preview,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
