//! Typed model of declared services and their infrastructure requests.
//!
//! A [`ServiceSpec`] arrives already decoded from the project file. Its
//! resource requests are kept in their raw form ([`RequestInput`]) until
//! [`ServiceSpec::requests`] parses them into [`ResourceRequest`]s, so that
//! every malformed request of a run can be reported together.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use dockyard_common::error::{DockyardError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One declared application service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique service name, also the container entry name.
    pub name: String,
    /// Image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Build context used instead of (or alongside) an image.
    #[serde(default)]
    pub build: Option<BuildSpec>,
    /// Command overriding the image default.
    #[serde(default)]
    pub command: Option<Vec<String>>,
    /// Port the service listens on inside its container.
    #[serde(default)]
    pub port: Option<u16>,
    /// Public domain routed through the reverse proxy.
    #[serde(default)]
    pub domain: Option<String>,
    /// Infrastructure requests keyed by kind, in declaration order.
    #[serde(default)]
    pub resources: IndexMap<String, RequestInput>,
    /// Explicit environment; always wins over injected values.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Volume mounts.
    #[serde(default)]
    pub volumes: Vec<VolumeRequest>,
    /// Health check descriptor.
    #[serde(default)]
    pub healthcheck: Option<HealthCheck>,
}

impl ServiceSpec {
    /// Creates a service running the given image.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: Some(image.into()),
            ..Self::default()
        }
    }

    /// Adds a resource request in its short `[selector][:version]` form.
    #[must_use]
    pub fn resource(mut self, kind: impl Into<String>, spec: impl Into<String>) -> Self {
        let _ = self
            .resources
            .insert(kind.into(), RequestInput::Short(spec.into()));
        self
    }

    /// Adds a resource request with overrides.
    #[must_use]
    pub fn detailed_resource(mut self, kind: impl Into<String>, request: DetailedRequest) -> Self {
        let _ = self
            .resources
            .insert(kind.into(), RequestInput::Detailed(request));
        self
    }

    /// Sets the container port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Routes the service through the reverse proxy under `domain`.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Adds an explicit environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.environment.insert(key.into(), value.into());
        self
    }

    /// Adds a volume mount.
    #[must_use]
    pub fn volume(mut self, volume: VolumeRequest) -> Self {
        self.volumes.push(volume);
        self
    }

    /// Parses every resource request of this service, in declaration order.
    pub fn requests(&self) -> impl Iterator<Item = Result<ResourceRequest>> + '_ {
        self.resources
            .iter()
            .map(|(kind, input)| ResourceRequest::parse(kind, input))
    }
}

/// Build context of a service image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Build context directory.
    pub context: String,
    /// Dockerfile path relative to the context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
}

/// Health check descriptor shared by services and infrastructure entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Probe command in compose form (`["CMD", ...]` or `["CMD-SHELL", ...]`).
    pub test: Vec<String>,
    /// Time between probes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// Probe timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    /// Consecutive failures before the container is unhealthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Grace period after start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_period: Option<String>,
}

impl HealthCheck {
    /// A probe with the defaults used for infrastructure entries.
    #[must_use]
    pub fn probe<I, S>(test: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            test: test.into_iter().map(Into::into).collect(),
            interval: Some("10s".into()),
            timeout: Some("5s".into()),
            retries: Some(5),
            start_period: None,
        }
    }
}

/// A volume mount, already classified by the configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolumeRequest {
    /// A named volume declared in the document's volumes section.
    Named {
        /// Volume name.
        named: String,
        /// Mount point inside the container.
        target: String,
        /// Mount read-only.
        #[serde(default)]
        read_only: bool,
    },
    /// A host path mounted into the container.
    Bind {
        /// Host path.
        bind: String,
        /// Mount point inside the container.
        target: String,
        /// Mount read-only.
        #[serde(default)]
        read_only: bool,
    },
}

impl VolumeRequest {
    /// A read-write named volume.
    #[must_use]
    pub fn named(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Named {
            named: name.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// A read-write bind mount.
    #[must_use]
    pub fn bind(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Bind {
            bind: source.into(),
            target: target.into(),
            read_only: false,
        }
    }
}

/// A resource request as it appears in the project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestInput {
    /// `"redis:7.2"`, `"postgres"`, `"7.0"`.
    Short(String),
    /// A selector with per-consumer overrides.
    Detailed(DetailedRequest),
}

/// Long form of a resource request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedRequest {
    /// `[selector][:version]`, same syntax as the short form.
    #[serde(default, rename = "use")]
    pub using: Option<String>,
    /// Password or API key.
    #[serde(default)]
    pub password: Option<String>,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Database or bucket name.
    #[serde(default)]
    pub database: Option<String>,
    /// Memory limit, e.g. `256m` or `1g`.
    #[serde(default)]
    pub memory: Option<String>,
}

/// The closed set of infrastructure kinds a service can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Relational or document database.
    Database,
    /// In-memory cache.
    Cache,
    /// Full-text search index.
    Search,
    /// S3-compatible object storage.
    ObjectStore,
    /// Mail capture server.
    Mail,
    /// Language-runtime sidecar.
    Runtime,
}

impl ResourceKind {
    /// Every kind, in registry order.
    pub const ALL: [Self; 6] = [
        Self::Database,
        Self::Cache,
        Self::Search,
        Self::ObjectStore,
        Self::Mail,
        Self::Runtime,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Cache => "cache",
            Self::Search => "search",
            Self::ObjectStore => "object-store",
            Self::Mail => "mail",
            Self::Runtime => "runtime",
        }
    }

    /// Returns `true` if `name` spells this kind or one of its aliases.
    #[must_use]
    pub fn is_named(self, name: &str) -> bool {
        name.parse::<Self>().is_ok_and(|kind| kind == self)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = DockyardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" | "db" => Ok(Self::Database),
            "cache" => Ok(Self::Cache),
            "search" => Ok(Self::Search),
            "object-store" | "storage" | "s3" => Ok(Self::ObjectStore),
            "mail" | "mailer" => Ok(Self::Mail),
            "runtime" | "language-runtime" => Ok(Self::Runtime),
            _ => Err(DockyardError::validation(
                "resource kind",
                s,
                "expected one of database, cache, search, object-store, mail, runtime",
            )),
        }
    }
}

/// A memory limit expressed in mebibytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryLimit(u64);

impl MemoryLimit {
    /// Creates a limit of `megabytes` MiB.
    #[must_use]
    pub const fn from_megabytes(megabytes: u64) -> Self {
        Self(megabytes)
    }

    /// The limit in MiB.
    #[must_use]
    pub const fn megabytes(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

impl FromStr for MemoryLimit {
    type Err = DockyardError;

    /// Accepts `<n>`, `<n>m`, `<n>mb`, `<n>g`, `<n>gb` (case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let digits_end = lower
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(lower.len());
        let (number, unit) = lower.split_at(digits_end);
        let invalid = || DockyardError::validation("memory limit", s, "expected <n>[m|g]");
        let number: u64 = number.parse().map_err(|_| invalid())?;
        let megabytes = match unit {
            "" | "m" | "mb" => number,
            "g" | "gb" => number.checked_mul(1024).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
        if megabytes == 0 {
            return Err(DockyardError::validation(
                "memory limit",
                s,
                "must be greater than zero",
            ));
        }
        Ok(Self(megabytes))
    }
}

/// Overrides a consumer supplies alongside a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOverrides {
    /// Password or API key.
    pub password: Option<String>,
    /// Username.
    pub username: Option<String>,
    /// Database or bucket name.
    pub database: Option<String>,
    /// Memory limit.
    pub memory: Option<MemoryLimit>,
}

/// A parsed infrastructure request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Requested kind.
    pub kind: ResourceKind,
    /// Subtype name, kind name, or bare version, as written.
    pub selector: Option<String>,
    /// Version, if written after a colon.
    pub version: Option<String>,
    /// Consumer overrides.
    pub overrides: RequestOverrides,
}

impl ResourceRequest {
    /// A request of `kind` with no selector, version, or overrides.
    #[must_use]
    pub fn of(kind: ResourceKind) -> Self {
        Self {
            kind,
            selector: None,
            version: None,
            overrides: RequestOverrides::default(),
        }
    }

    /// Parses the request found under `kind` in a service's resources.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the kind is not one of the closed set
    /// or the memory override is malformed.
    pub fn parse(kind: &str, input: &RequestInput) -> Result<Self> {
        let kind: ResourceKind = kind.parse()?;
        let (spec, overrides) = match input {
            RequestInput::Short(spec) => (spec.as_str(), RequestOverrides::default()),
            RequestInput::Detailed(detailed) => (
                detailed.using.as_deref().unwrap_or_default(),
                RequestOverrides {
                    password: detailed.password.clone(),
                    username: detailed.username.clone(),
                    database: detailed.database.clone(),
                    memory: detailed
                        .memory
                        .as_deref()
                        .map(str::parse::<MemoryLimit>)
                        .transpose()?,
                },
            ),
        };

        let (selector, version) = match spec.split_once(':') {
            Some((selector, version)) => (selector, Some(version)),
            None => (spec, None),
        };
        Ok(Self {
            kind,
            selector: non_empty(selector).map(str::to_ascii_lowercase),
            version: version.and_then(non_empty).map(str::to_owned),
            overrides,
        })
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}
