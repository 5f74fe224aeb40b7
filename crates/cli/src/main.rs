//! kinocheck CLI - Main Entry Point
//!
//! Runs API contract checks and browser flows against the movie site and
//! reports a verdict per check.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use kinocheck_cli::commands::{list, run};
use kinocheck_cli::output::{self, OutputFormat};
use kinocheck_common::HarnessConfig;

/// kinocheck - black-box verification of the movie site and its API
#[derive(Parser, Debug)]
#[command(name = "kinocheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "KINOCHECK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Output directory for results and evidence
    #[arg(long, global = true, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run checks
    Run(run::RunArgs),

    /// List checks without running them
    List(list::ListArgs),
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

/// File, then environment, then `--output`
fn load_config(path: Option<&Path>, output: Option<PathBuf>) -> anyhow::Result<HarnessConfig> {
    let mut config = HarnessConfig::load(path)?;
    if let Some(output) = output {
        config.report.output_dir = output;
    }
    Ok(config)
}

async fn execute(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run(args) => {
            let config = load_config(cli.config.as_deref(), cli.output)?;
            run::execute(args, config, cli.format).await
        }
        Commands::List(args) => {
            list::execute(args, cli.format)?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match execute(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}
