//! List Command

use anyhow::Result;
use clap::Args;

use super::{load_specs, SuiteArgs};
use crate::output::{print_list, OutputFormat, SpecDisplay};

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub suite: SuiteArgs,
}

pub fn execute(args: ListArgs, format: OutputFormat) -> Result<()> {
    let specs = load_specs(args.suite.suite.as_deref(), args.suite.tag.as_deref(), None)?;
    let rows: Vec<SpecDisplay> = specs.iter().map(SpecDisplay::from).collect();
    print_list(&rows, format);
    Ok(())
}
