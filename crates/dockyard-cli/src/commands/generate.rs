//! `dockyard generate` — Write the compose document for a project file.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use dockyard_common::constants::DEFAULT_PROJECT_FILE;
use dockyard_compose::document::OrchestrationDocument;

use crate::project::ProjectFile;

/// Output serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Compose YAML.
    #[default]
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Path to the project file.
    #[arg(default_value = DEFAULT_PROJECT_FILE)]
    pub file: PathBuf,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,
}

/// Executes the `generate` command.
///
/// # Errors
///
/// Returns an error if the project file cannot be loaded, fails
/// validation, or the output cannot be written.
pub fn execute(args: &GenerateArgs) -> anyhow::Result<()> {
    tracing::info!(path = %args.file.display(), "generating compose document");
    let project = ProjectFile::load(&args.file)?;
    let document = dockyard_compose::generate(&project.services, &project.settings)
        .map_err(|d| super::report(&d))?;
    let rendered = render(&document, args.format)?;

    if let Some(ref out_path) = args.output {
        std::fs::write(out_path, &rendered)?;
        println!("Generated {} -> {}", args.file.display(), out_path.display());
        println!("Containers: {}", document.services.len());
        println!("Volumes: {}", document.volumes.len());
    } else {
        print!("{rendered}");
    }
    Ok(())
}

/// Serializes `document` in `format`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(document: &OrchestrationDocument, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Yaml => serde_yaml::to_string(document)?,
        Format::Json => {
            let mut json = serde_json::to_string_pretty(document)?;
            json.push('\n');
            json
        }
    })
}
