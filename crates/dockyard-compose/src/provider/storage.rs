//! Object storage provider: MinIO.

use dockyard_common::constants::{DEFAULT_DATABASE, DEFAULT_USERNAME};
use dockyard_common::error::{DockyardError, Result};

use super::{Catalog, Provider, ResolvedRequest, VersionTable, resolve};
use crate::entry::{Credentials, SharedResourceEntry};
use crate::model::{HealthCheck, ResourceKind, ResourceRequest};

const MINIO_PORT: u16 = 9000;
/// MinIO refuses root passwords shorter than eight characters.
const MINIO_MIN_PASSWORD_LEN: usize = 8;
const MINIO_DEFAULT_PASSWORD: &str = "dockyard-secret";

/// Provider for the `object-store` kind.
#[derive(Debug)]
pub struct StorageProvider {
    catalog: Catalog,
}

impl StorageProvider {
    /// Creates a provider serving the subtypes in `catalog`.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl Default for StorageProvider {
    fn default() -> Self {
        Self::new(Catalog::new().with("minio", VersionTable::new("latest", &["latest"])))
    }
}

impl Provider for StorageProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ObjectStore
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn is_stateful(&self, _subtype: &str) -> bool {
        true
    }

    fn validate(&self, request: &ResourceRequest) -> Result<ResolvedRequest> {
        let resolved = resolve(&self.catalog, request)?;
        if let Some(pw) = &resolved.overrides.password {
            if pw.len() < MINIO_MIN_PASSWORD_LEN {
                return Err(DockyardError::validation(
                    "object-store password",
                    "<redacted>",
                    format!("must be at least {MINIO_MIN_PASSWORD_LEN} characters"),
                ));
            }
        }
        Ok(resolved)
    }

    fn materialize(&self, request: &ResolvedRequest) -> Result<SharedResourceEntry> {
        if request.subtype != "minio" {
            return Err(DockyardError::validation(
                "object-store subtype",
                &request.subtype,
                "no recipe available",
            ));
        }
        let overrides = &request.overrides;
        let credentials = Credentials {
            username: Some(overrides.username.clone().unwrap_or_else(|| DEFAULT_USERNAME.into())),
            password: Some(
                overrides
                    .password
                    .clone()
                    .unwrap_or_else(|| MINIO_DEFAULT_PASSWORD.into()),
            ),
            database: Some(overrides.database.clone().unwrap_or_else(|| DEFAULT_DATABASE.into())),
        };
        Ok(
            SharedResourceEntry::new(request, format!("minio/minio:{}", request.version))
                .command(["server", "/data", "--console-address", ":9001"])
                .env("MINIO_ROOT_USER", credentials.username_or(DEFAULT_USERNAME))
                .env(
                    "MINIO_ROOT_PASSWORD",
                    credentials.password_or(MINIO_DEFAULT_PASSWORD),
                )
                .port(MINIO_PORT)
                .data_volume("/data")
                .healthcheck(HealthCheck::probe(["CMD", "mc", "ready", "local"]))
                .credentials(credentials),
        )
    }

    fn environment_for(
        &self,
        entry: &SharedResourceEntry,
        credentials: &Credentials,
    ) -> Vec<(String, String)> {
        vec![
            ("FILESYSTEM_DISK".into(), "s3".into()),
            (
                "AWS_ENDPOINT".into(),
                format!("http://{}:{}", entry.host(), entry.port_string()),
            ),
            (
                "AWS_ACCESS_KEY_ID".into(),
                credentials.username_or(DEFAULT_USERNAME).into(),
            ),
            (
                "AWS_SECRET_ACCESS_KEY".into(),
                credentials.password_or(MINIO_DEFAULT_PASSWORD).into(),
            ),
            ("AWS_DEFAULT_REGION".into(), "us-east-1".into()),
            (
                "AWS_BUCKET".into(),
                credentials.database_or(DEFAULT_DATABASE).into(),
            ),
            ("AWS_USE_PATH_STYLE_ENDPOINT".into(), "true".into()),
        ]
    }
}
