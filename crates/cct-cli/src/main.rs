//! # cct CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cct_cli::run::{run_scenario, RunArgs};
use cct_cli::validate::{run_validate, ValidateArgs};

/// Confidential compliance scenario runner.
///
/// Deploys a confidential token with its compliance modules in memory,
/// runs scripted actions and prints the balances each holder may decrypt.
#[derive(Parser, Debug)]
#[command(name = "cct", version, about, long_about = None)]
struct Cli {
    /// Emit logs and reports as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deploy a scenario and execute its actions.
    Run(RunArgs),

    /// Check a scenario without executing it.
    Validate(ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Run(args) => run_scenario(&args, cli.json),
        Commands::Validate(args) => run_validate(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
