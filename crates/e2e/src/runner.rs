//! Main check runner: API checks over one shared session, UI flows over
//! one browser session each

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use kinocheck_common::HarnessConfig;

use crate::api::{ApiContractChecker, ApiSession};
use crate::browser::{PageDriver, SessionProvider};
use crate::contract::run_api_check;
use crate::error::{E2eError, E2eResult};
use crate::probe::{UiFlow, UiProbe};
use crate::report::{FlowOutcome, ReportSink};
use crate::suite::{CheckSpec, CheckTarget};

/// Result of running a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub tags: Vec<String>,
    pub success: bool,
    pub duration_ms: u64,

    /// Non-fatal observations, warnings included
    pub notes: Vec<String>,

    /// Stable error label when the check failed
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

/// Result of running all checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<CheckResult>,
}

impl SuiteResult {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Runs checks in order, serially
pub struct TestRunner<'a, P: SessionProvider> {
    config: &'a HarnessConfig,
    provider: &'a P,
    sink: &'a dyn ReportSink,
    output_dir: PathBuf,
}

impl<'a, P: SessionProvider> TestRunner<'a, P> {
    pub fn new(config: &'a HarnessConfig, provider: &'a P, sink: &'a dyn ReportSink) -> Self {
        Self {
            config,
            provider,
            sink,
            output_dir: config.report.output_dir.clone(),
        }
    }

    /// Run a list of checks.
    ///
    /// The API session is built up front when any API check is selected, so a
    /// missing key fails the run before anything is sent.
    pub async fn run_specs(&self, specs: &[CheckSpec]) -> E2eResult<SuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        let api_session = if specs.iter().any(|s| !s.is_ui()) {
            Some(ApiSession::from_config(self.config)?)
        } else {
            None
        };

        info!("Run {}: {} check(s)", run_id, specs.len());

        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            let result = self.run_spec(spec, api_session.as_ref()).await;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Check results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        Ok(SuiteResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run a single check; every failure ends up in the result
    pub async fn run_spec(
        &self,
        spec: &CheckSpec,
        api_session: Option<&ApiSession>,
    ) -> CheckResult {
        let start = Instant::now();
        debug!("Running check: {}", spec.name);

        let mut outcome = FlowOutcome::default();
        let status = match &spec.target {
            CheckTarget::Api(check) => match api_session {
                Some(session) => {
                    let preview_chars = self.config.report.body_preview_chars;
                    let checker = ApiContractChecker::new(session, preview_chars);
                    run_api_check(&checker, &spec.name, check, self.sink)
                        .await
                        .map(|api_outcome| outcome = api_outcome)
                }
                None => Err(E2eError::Config(kinocheck_common::Error::MissingApiKey)),
            },
            CheckTarget::Ui(flow) => self.run_ui(&spec.name, flow, &mut outcome).await,
        };

        let mut result = CheckResult {
            name: spec.name.clone(),
            tags: spec.tags.clone(),
            success: true,
            duration_ms: start.elapsed().as_millis() as u64,
            notes: outcome.notes,
            error_kind: None,
            error: None,
        };

        match status {
            Ok(()) => {}
            Err(e) if !e.is_fatal() => {
                warn!("{}: {}", spec.name, e);
                result.notes.push(format!("warning: {}", e));
            }
            Err(e) => {
                self.sink
                    .attach_text(&spec.name, "error", &format!("{}: {}", e.kind(), e));
                result.success = false;
                result.error_kind = Some(e.kind().to_string());
                result.error = Some(e.to_string());
            }
        }

        if !result.notes.is_empty() {
            self.sink
                .attach_text(&spec.name, "notes", &result.notes.join("\n"));
        }
        result
    }

    /// One UI flow on a fresh session, released on every path
    async fn run_ui(
        &self,
        name: &str,
        flow: &UiFlow,
        outcome: &mut FlowOutcome,
    ) -> E2eResult<()> {
        let session = self.provider.acquire().await?;
        let config = self.config;
        let flows = UiProbe::new(&session, &config.site, &config.timing, self.sink, name);

        let status = flows.run(flow, outcome).await;
        if let Err(e) = &status {
            if e.is_fatal() {
                match session.screenshot().await {
                    Ok(png) => {
                        self.sink.attach_png(name, "failure", &png);
                    }
                    Err(shot) => warn!("{}: failure screenshot unavailable: {}", name, shot),
                }
            }
        }

        self.provider.release(session).await;
        status
    }

    /// Write results to `<output>/test-results.json`
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
