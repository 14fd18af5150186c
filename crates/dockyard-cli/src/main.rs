//! # dockyard — compose document generator
//!
//! Reads a project file declaring application services and their
//! infrastructure needs, and writes one compose document with shared
//! databases, caches and sidecars wired in.

mod commands;
mod project;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
