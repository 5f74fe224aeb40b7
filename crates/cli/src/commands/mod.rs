//! CLI Commands

pub mod list;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;

use kinocheck_e2e::{default_suite, CheckSpec};

/// Which checks to pick up
#[derive(Args, Debug, Clone, Default)]
pub struct SuiteArgs {
    /// Directory of YAML check definitions (built-in suite when omitted)
    #[arg(long, value_name = "DIR")]
    pub suite: Option<PathBuf>,

    /// Only checks carrying this tag (api, ui, smoke, filtering, navigation, search)
    #[arg(long)]
    pub tag: Option<String>,
}

/// Load the suite and apply tag/name filters; an empty selection is an error
pub fn load_specs(
    suite: Option<&Path>,
    tag: Option<&str>,
    name: Option<&str>,
) -> Result<Vec<CheckSpec>> {
    let specs = match suite {
        Some(dir) => CheckSpec::load_all(dir)?,
        None => default_suite(),
    };

    let selected = CheckSpec::select(specs, tag, name);
    if selected.is_empty() {
        bail!(
            "no checks selected (tag: {}, name: {})",
            tag.unwrap_or("-"),
            name.unwrap_or("-")
        );
    }
    Ok(selected)
}
