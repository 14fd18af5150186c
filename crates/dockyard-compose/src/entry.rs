//! Concrete infrastructure entries materialized by providers.

use std::collections::BTreeMap;

use dockyard_common::constants::DATA_VOLUME_SUFFIX;

use crate::model::{HealthCheck, MemoryLimit, RequestOverrides};
use crate::provider::{CanonicalKey, ResolvedRequest};

/// Where an entry is placed in the assembled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryRole {
    /// Shared infrastructure (database, cache, ...).
    Shared,
    /// Auxiliary container added for its consumers (runtime helpers).
    Sidecar,
}

/// Credentials an entry was configured with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: Option<String>,
    /// Password or API key.
    pub password: Option<String>,
    /// Database or bucket name.
    pub database: Option<String>,
}

impl Credentials {
    /// Returns these credentials with every field the consumer set replaced.
    #[must_use]
    pub fn overlay(&self, overrides: &RequestOverrides) -> Self {
        Self {
            username: overrides.username.clone().or_else(|| self.username.clone()),
            password: overrides.password.clone().or_else(|| self.password.clone()),
            database: overrides.database.clone().or_else(|| self.database.clone()),
        }
    }

    pub(crate) fn username_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.username.as_deref().unwrap_or(default)
    }

    pub(crate) fn password_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.password.as_deref().unwrap_or(default)
    }

    pub(crate) fn database_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.database.as_deref().unwrap_or(default)
    }
}

/// A named volume mounted into a stateful entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Volume name, `{entry}-data`.
    pub name: String,
    /// Mount point inside the container.
    pub target: String,
}

/// One concrete infrastructure container, keyed by its canonical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedResourceEntry {
    /// Deduplication key.
    pub key: CanonicalKey,
    /// Container name, derived from the key.
    pub name: String,
    /// Document placement.
    pub role: EntryRole,
    /// Resolved image reference.
    pub image: String,
    /// Startup command and arguments.
    pub command: Vec<String>,
    /// The entry's own container environment.
    pub environment: BTreeMap<String, String>,
    /// Port consumers connect to.
    pub port: Option<u16>,
    /// Data volume, present only for stateful kinds.
    pub volume: Option<VolumeMount>,
    /// Health check.
    pub healthcheck: Option<HealthCheck>,
    /// Credentials the entry actually listens with.
    pub credentials: Credentials,
    /// Container memory limit.
    pub memory_limit: Option<MemoryLimit>,
}

impl SharedResourceEntry {
    /// Starts an entry for `request` running `image`.
    #[must_use]
    pub fn new(request: &ResolvedRequest, image: impl Into<String>) -> Self {
        let key = request.key();
        Self {
            name: key.name(),
            key,
            role: EntryRole::Shared,
            image: image.into(),
            command: Vec::new(),
            environment: BTreeMap::new(),
            port: None,
            volume: None,
            healthcheck: None,
            credentials: Credentials::default(),
            memory_limit: request.overrides.memory,
        }
    }

    /// Marks the entry as a sidecar.
    #[must_use]
    pub const fn sidecar(mut self) -> Self {
        self.role = EntryRole::Sidecar;
        self
    }

    /// Sets the startup command.
    #[must_use]
    pub fn command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a variable to the entry's own environment.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.environment.insert(key.into(), value.into());
        self
    }

    /// Sets the port consumers connect to.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Attaches the `{name}-data` volume at `target`.
    #[must_use]
    pub fn data_volume(mut self, target: impl Into<String>) -> Self {
        self.volume = Some(VolumeMount {
            name: format!("{}{DATA_VOLUME_SUFFIX}", self.name),
            target: target.into(),
        });
        self
    }

    /// Sets the health check.
    #[must_use]
    pub fn healthcheck(mut self, healthcheck: HealthCheck) -> Self {
        self.healthcheck = Some(healthcheck);
        self
    }

    /// Sets the credentials the entry listens with.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Host name consumers use to reach the entry.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.name
    }

    /// Port as a string, empty if the entry exposes none.
    #[must_use]
    pub fn port_string(&self) -> String {
        self.port.map_or_else(String::new, |p| p.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_replaces_only_set_fields() {
        let base = Credentials {
            username: Some("dockyard".into()),
            password: Some("secret".into()),
            database: Some("app".into()),
        };
        let overrides = RequestOverrides {
            password: Some("other".into()),
            ..RequestOverrides::default()
        };
        let merged = base.overlay(&overrides);
        assert_eq!(merged.password.as_deref(), Some("other"));
        assert_eq!(merged.username.as_deref(), Some("dockyard"));
        assert_eq!(merged.database.as_deref(), Some("app"));
    }

    #[test]
    fn fallbacks_apply_to_missing_fields() {
        let creds = Credentials::default();
        assert_eq!(creds.username_or("root"), "root");
        assert_eq!(creds.password_or("pw"), "pw");
        assert_eq!(creds.database_or("db"), "db");
    }
}
