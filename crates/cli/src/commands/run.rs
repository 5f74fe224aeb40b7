//! Run Command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use kinocheck_common::HarnessConfig;
use kinocheck_e2e::{ChromeProvider, FsReportSink, TestRunner};

use super::{load_specs, SuiteArgs};
use crate::output::{print_info, print_suite, OutputFormat};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub suite: SuiteArgs,

    /// Run a single check by name
    #[arg(long)]
    pub name: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Chrome or Chromium executable
    #[arg(long, value_name = "PATH")]
    pub chrome: Option<PathBuf>,
}

impl RunArgs {
    /// Browser flags override file and environment settings
    pub fn apply(&self, config: &mut HarnessConfig) {
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(chrome) = &self.chrome {
            config.browser.chrome_executable = Some(chrome.clone());
        }
    }
}

/// Run the selected checks; `Ok(false)` means at least one check failed
pub async fn execute(
    args: RunArgs,
    mut config: HarnessConfig,
    format: OutputFormat,
) -> Result<bool> {
    args.apply(&mut config);

    let specs = load_specs(
        args.suite.suite.as_deref(),
        args.suite.tag.as_deref(),
        args.name.as_deref(),
    )?;
    info!(
        "Selected {} check(s), writing to {}",
        specs.len(),
        config.report.output_dir.display()
    );

    let evidence_dir = config.report.output_dir.join("evidence");
    let sink = FsReportSink::new(&evidence_dir)
        .with_context(|| format!("creating evidence directory {}", evidence_dir.display()))?;
    let provider = ChromeProvider::new(config.browser.clone());
    let runner = TestRunner::new(&config, &provider, &sink);

    let result = runner.run_specs(&specs).await?;
    let results_path = runner.write_results(&result)?;
    let manifest_path = sink.write_manifest()?;

    print_suite(&result, format);
    if format == OutputFormat::Table {
        print_info(&format!("Results: {}", results_path.display()));
        print_info(&format!("Evidence: {}", manifest_path.display()));
    }

    Ok(result.all_passed())
}
