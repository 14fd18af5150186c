//! Search provider: Meilisearch and Typesense.

use dockyard_common::constants::DEFAULT_PASSWORD;
use dockyard_common::error::{DockyardError, Result};

use super::{Catalog, Provider, ResolvedRequest, VersionTable};
use crate::entry::{Credentials, SharedResourceEntry};
use crate::model::{HealthCheck, ResourceKind};

const MEILISEARCH_PORT: u16 = 7700;
const TYPESENSE_PORT: u16 = 8108;

/// Provider for the `search` kind.
#[derive(Debug)]
pub struct SearchProvider {
    catalog: Catalog,
}

impl SearchProvider {
    /// Creates a provider serving the subtypes in `catalog`.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl Default for SearchProvider {
    fn default() -> Self {
        Self::new(
            Catalog::new()
                .with("meilisearch", VersionTable::new("1.8", &["1.6", "1.8"]))
                .with("typesense", VersionTable::new("26.0", &["26.0", "27.0"])),
        )
    }
}

impl Provider for SearchProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Search
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn is_stateful(&self, _subtype: &str) -> bool {
        true
    }

    fn materialize(&self, request: &ResolvedRequest) -> Result<SharedResourceEntry> {
        let key = request
            .overrides
            .password
            .clone()
            .unwrap_or_else(|| DEFAULT_PASSWORD.into());
        let credentials = Credentials {
            password: Some(key.clone()),
            ..Credentials::default()
        };
        let entry = match request.subtype.as_str() {
            "meilisearch" => SharedResourceEntry::new(
                request,
                format!("getmeili/meilisearch:v{}", request.version),
            )
            .env("MEILI_MASTER_KEY", key)
            .env("MEILI_NO_ANALYTICS", "true")
            .port(MEILISEARCH_PORT)
            .data_volume("/meili_data")
            .healthcheck(HealthCheck::probe([
                "CMD",
                "wget",
                "--no-verbose",
                "--spider",
                "http://localhost:7700/health",
            ])),
            "typesense" => SharedResourceEntry::new(
                request,
                format!("typesense/typesense:{}", request.version),
            )
            .command([
                "--data-dir".to_owned(),
                "/data".into(),
                "--api-key".into(),
                key,
                "--enable-cors".into(),
            ])
            .port(TYPESENSE_PORT)
            .data_volume("/data"),
            other => {
                return Err(DockyardError::validation(
                    "search subtype",
                    other,
                    "no recipe available",
                ));
            }
        };
        Ok(entry.credentials(credentials))
    }

    fn environment_for(
        &self,
        entry: &SharedResourceEntry,
        credentials: &Credentials,
    ) -> Vec<(String, String)> {
        let host = entry.host();
        let key = credentials.password_or(DEFAULT_PASSWORD).to_owned();
        match entry.key.subtype() {
            "meilisearch" => vec![
                ("SCOUT_DRIVER".into(), "meilisearch".into()),
                (
                    "MEILISEARCH_HOST".into(),
                    format!("http://{host}:{}", entry.port_string()),
                ),
                ("MEILISEARCH_KEY".into(), key),
            ],
            "typesense" => vec![
                ("SCOUT_DRIVER".into(), "typesense".into()),
                ("TYPESENSE_HOST".into(), host.into()),
                ("TYPESENSE_PORT".into(), entry.port_string()),
                ("TYPESENSE_PROTOCOL".into(), "http".into()),
                ("TYPESENSE_API_KEY".into(), key),
            ],
            _ => Vec::new(),
        }
    }
}
