//! # Validate Subcommand
//!
//! Parses a scenario and checks it structurally without deploying it.
//! Exit code 0 when the scenario is deployable, 1 otherwise.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::scenario::Scenario;

/// Arguments for the `cct validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Scenario file to check.
    pub scenario: PathBuf,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let scenario = Scenario::load(&args.scenario)?;
    let problems = scenario.validate();
    if problems.is_empty() {
        println!(
            "{}: OK ({} identities, {} modules, {} actions)",
            args.scenario.display(),
            scenario.identities.len(),
            scenario.modules.len(),
            scenario.actions.len()
        );
        return Ok(0);
    }
    for problem in &problems {
        println!("{}: {problem}", args.scenario.display());
    }
    tracing::warn!(count = problems.len(), "scenario has problems");
    Ok(1)
}
