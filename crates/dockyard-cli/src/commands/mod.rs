//! CLI command definitions and dispatch.

pub mod generate;
pub mod plan;

use clap::{Parser, Subcommand};
use dockyard_common::error::Diagnostics;

/// Dockyard — compose documents with shared infrastructure wired in.
#[derive(Parser, Debug)]
#[command(name = "dockyard", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the compose document for a project file.
    Generate(generate::GenerateArgs),
    /// Display the start order and shared entries without writing anything.
    Plan(plan::PlanArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Generate(args) => generate::execute(&args),
        Command::Plan(args) => plan::execute(&args),
    }
}

/// Turns engine diagnostics into one error listing every problem.
fn report(diagnostics: &Diagnostics) -> anyhow::Error {
    anyhow::anyhow!(
        "{} problem(s) found in project:\n{diagnostics}",
        diagnostics.len()
    )
}
