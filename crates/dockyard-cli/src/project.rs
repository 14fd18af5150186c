//! Project file loading.

use std::path::Path;

use anyhow::Context;
use dockyard_common::config::GlobalSettings;
use dockyard_compose::model::ServiceSpec;
use serde::Deserialize;

/// Contents of a `dockyard.yml` project file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFile {
    /// Document-wide settings; every field has a default.
    #[serde(default)]
    pub settings: GlobalSettings,
    /// Declared services, in output order.
    pub services: Vec<ServiceSpec>,
}

impl ProjectFile {
    /// Reads and decodes the project file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid project file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        tracing::debug!(path = %path.display(), "loading project file");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid project file {}", path.display()))
    }

    /// Decodes a project file from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not describe a project.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
