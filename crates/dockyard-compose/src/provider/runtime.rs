//! Language-runtime sidecars: Node.js and Bun.

use dockyard_common::error::{DockyardError, Result};

use super::{Catalog, Provider, ResolvedRequest, VersionTable};
use crate::entry::{Credentials, SharedResourceEntry};
use crate::model::ResourceKind;

/// Provider for the `runtime` kind. Its entries are placed as sidecars.
#[derive(Debug)]
pub struct RuntimeProvider {
    catalog: Catalog,
}

impl RuntimeProvider {
    /// Creates a provider serving the subtypes in `catalog`.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl Default for RuntimeProvider {
    fn default() -> Self {
        Self::new(
            Catalog::new()
                .with("node", VersionTable::new("20", &["18", "20", "22"]))
                .with("bun", VersionTable::new("1.1", &["1.1"])),
        )
    }
}

impl Provider for RuntimeProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Runtime
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn is_stateful(&self, _subtype: &str) -> bool {
        false
    }

    fn materialize(&self, request: &ResolvedRequest) -> Result<SharedResourceEntry> {
        let image = match request.subtype.as_str() {
            "node" => format!("node:{}-alpine", request.version),
            "bun" => format!("oven/bun:{}-alpine", request.version),
            other => {
                return Err(DockyardError::validation(
                    "runtime subtype",
                    other,
                    "no recipe available",
                ));
            }
        };
        // Kept alive so tooling can be exec'd inside it.
        Ok(SharedResourceEntry::new(request, image)
            .sidecar()
            .command(["tail", "-f", "/dev/null"]))
    }

    fn environment_for(
        &self,
        entry: &SharedResourceEntry,
        _credentials: &Credentials,
    ) -> Vec<(String, String)> {
        vec![(
            format!("{}_SIDECAR_HOST", entry.key.subtype().to_ascii_uppercase()),
            entry.host().into(),
        )]
    }
}
