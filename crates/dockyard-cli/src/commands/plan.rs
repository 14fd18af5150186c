//! `dockyard plan` — Display the start order and shared entries.

use std::path::PathBuf;

use clap::Args;
use dockyard_common::constants::DEFAULT_PROJECT_FILE;
use dockyard_compose::document::OrchestrationDocument;
use dockyard_compose::graph::DependencyGraph;

use crate::project::ProjectFile;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the project file.
    #[arg(default_value = DEFAULT_PROJECT_FILE)]
    pub file: PathBuf,
}

/// Executes the `plan` command.
///
/// Generates the document in memory, rebuilds the dependency graph from its
/// `depends_on` lists, and displays the resulting start order.
///
/// # Errors
///
/// Returns an error if the project file cannot be loaded or fails validation.
pub fn execute(args: &PlanArgs) -> anyhow::Result<()> {
    let project = ProjectFile::load(&args.file)?;
    let document = dockyard_compose::generate(&project.services, &project.settings)
        .map_err(|d| super::report(&d))?;
    let order = start_order(&document)?;

    println!("Deployment Plan for: {}", args.file.display());
    println!("{}", "\u{2550}".repeat(35));
    println!();

    for name in &order {
        let Some(entry) = document.entry(name) else {
            continue;
        };
        println!("  + {name}");
        if let Some(ref image) = entry.image {
            println!("      image: {image}");
        }
        if let Some(ref build) = entry.build {
            println!("      build: {}", build.context);
        }
        for mount in entry.volumes.iter().filter(|m| m.named) {
            println!("      volume: {mount}");
        }
        if !entry.depends_on.is_empty() {
            println!("      depends on: {}", entry.depends_on.join(", "));
        }
    }

    println!();
    println!(
        "  {} container(s), {} declared service(s), {} volume(s).",
        order.len(),
        project.services.len(),
        document.volumes.len()
    );
    Ok(())
}

/// Start order of the document's entries, dependencies first.
///
/// # Errors
///
/// Returns an error if the `depends_on` lists form a cycle.
pub fn start_order(document: &OrchestrationDocument) -> anyhow::Result<Vec<String>> {
    let mut graph = DependencyGraph::new();
    for name in document.entry_names() {
        let _ = graph.add_component(name);
    }
    for (name, entry) in &document.services {
        let dependent = graph.add_component(name.as_str());
        for target in &entry.depends_on {
            let dependency = graph.add_component(target.as_str());
            graph.add_dependency(dependent, dependency);
        }
    }
    Ok(graph.resolve_order()?)
}

#[cfg(test)]
mod tests {
    use dockyard_common::config::GlobalSettings;
    use dockyard_compose::model::ServiceSpec;

    use super::*;

    #[test]
    fn dependencies_start_first() {
        let document = dockyard_compose::generate(
            &[
                ServiceSpec::new("api", "api:latest")
                    .resource("database", "postgres")
                    .resource("cache", "redis"),
                ServiceSpec::new("web", "web:latest").domain("web.test"),
            ],
            &GlobalSettings::default(),
        )
        .expect("generate");

        let order = start_order(&document).expect("order");
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert_eq!(order.len(), 5);
        assert!(pos("postgres-16") < pos("api"), "got: {order:?}");
        assert!(pos("redis-72") < pos("api"), "got: {order:?}");
        assert!(pos("traefik") < pos("web"), "got: {order:?}");
    }

    #[test]
    fn execute_fails_on_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = execute(&PlanArgs {
            file: dir.path().join("dockyard.yml"),
        })
        .unwrap_err();
        assert!(err.to_string().contains("failed to read"), "got: {err}");
    }
}
