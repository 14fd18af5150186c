//! Provider registry: one provider per infrastructure kind.
//!
//! Every provider shares the same contract ([`Provider`]) and the same
//! naming rule ([`canonical_name`]). Version tables are plain data handed
//! to each provider when it is constructed.

pub mod cache;
pub mod database;
pub mod mail;
pub mod runtime;
pub mod search;
pub mod storage;

use std::fmt;

use dockyard_common::error::{DockyardError, Result};

use crate::entry::{Credentials, SharedResourceEntry};
use crate::model::{RequestOverrides, ResourceKind, ResourceRequest};

/// Supported versions of one subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTable {
    default: String,
    supported: Vec<String>,
}

impl VersionTable {
    /// Creates a table; the default is always supported.
    #[must_use]
    pub fn new(default: &str, supported: &[&str]) -> Self {
        let mut versions: Vec<String> = supported.iter().map(|v| (*v).to_owned()).collect();
        if !versions.iter().any(|v| v == default) {
            versions.push(default.to_owned());
        }
        Self {
            default: default.to_owned(),
            supported: versions,
        }
    }

    /// Version used when a request omits one.
    #[must_use]
    pub fn default_version(&self) -> &str {
        &self.default
    }

    /// All supported versions.
    #[must_use]
    pub fn supported(&self) -> &[String] {
        &self.supported
    }

    /// Returns the supported spelling of `version`, if supported.
    #[must_use]
    pub fn find(&self, version: &str) -> Option<&str> {
        let version = version.trim();
        self.supported
            .iter()
            .find(|v| v.eq_ignore_ascii_case(version))
            .map(String::as_str)
    }
}

/// The subtypes a provider serves. The first one is the kind's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    subtypes: Vec<(String, VersionTable)>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            subtypes: Vec::new(),
        }
    }

    /// Adds or replaces a subtype's version table.
    #[must_use]
    pub fn with(mut self, subtype: &str, table: VersionTable) -> Self {
        let subtype = subtype.to_ascii_lowercase();
        if let Some(slot) = self.subtypes.iter_mut().find(|(name, _)| *name == subtype) {
            slot.1 = table;
        } else {
            self.subtypes.push((subtype, table));
        }
        self
    }

    /// The default subtype.
    #[must_use]
    pub fn default_subtype(&self) -> Option<&str> {
        self.subtypes.first().map(|(name, _)| name.as_str())
    }

    /// Version table of `subtype`.
    #[must_use]
    pub fn versions(&self, subtype: &str) -> Option<&VersionTable> {
        self.subtypes
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(subtype))
            .map(|(_, table)| table)
    }

    /// Subtype names, default first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.subtypes.iter().map(|(name, _)| name.as_str())
    }
}

/// A request whose subtype and version have been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// Requested kind.
    pub kind: ResourceKind,
    /// Concrete subtype.
    pub subtype: String,
    /// Supported version, as spelled in the version table.
    pub version: String,
    /// Consumer overrides.
    pub overrides: RequestOverrides,
}

impl ResolvedRequest {
    /// Deduplication key of this request.
    #[must_use]
    pub fn key(&self) -> CanonicalKey {
        CanonicalKey {
            kind: self.kind,
            subtype: self.subtype.to_ascii_lowercase(),
            version: normalize_version(&self.version),
        }
    }
}

/// Normalized `(kind, subtype, version)` identity of a shared entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey {
    kind: ResourceKind,
    subtype: String,
    version: String,
}

impl CanonicalKey {
    /// Kind of the entry.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Subtype of the entry.
    #[must_use]
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Container name of the entry.
    #[must_use]
    pub fn name(&self) -> String {
        canonical_name(&self.subtype, &self.version)
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Strips the separators `.`, `-`, `_` and lowercases.
#[must_use]
pub fn normalize_version(version: &str) -> String {
    version
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | '_'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Canonical container name of a `subtype:version` pair.
///
/// `redis:7.2` becomes `redis-72`, `memcached:1.6.23` becomes `memcached-1623`.
#[must_use]
pub fn canonical_name(subtype: &str, version: &str) -> String {
    format!(
        "{}-{}",
        subtype.trim().to_ascii_lowercase(),
        normalize_version(version)
    )
}

/// Resolves a request against a catalog.
///
/// The selector is a subtype, the kind's own name, or (when no version
/// follows it) a bare version of the default subtype.
///
/// # Errors
///
/// Returns a validation error naming the unknown subtype or unsupported version.
pub fn resolve(catalog: &Catalog, request: &ResourceRequest) -> Result<ResolvedRequest> {
    let kind = request.kind;
    let default_subtype = catalog.default_subtype().ok_or_else(|| {
        DockyardError::validation(
            format!("{kind} request"),
            kind.as_str(),
            "no subtypes are available",
        )
    })?;
    let known = || catalog.names().collect::<Vec<_>>().join(", ");

    let (subtype, version, bare) = match request.selector.as_deref() {
        None => (default_subtype, request.version.as_deref(), false),
        Some(selector) if catalog.versions(selector).is_some() => {
            (selector, request.version.as_deref(), false)
        }
        Some(selector) if kind.is_named(selector) => {
            (default_subtype, request.version.as_deref(), false)
        }
        Some(selector) if request.version.is_none() => (default_subtype, Some(selector), true),
        Some(selector) => {
            return Err(DockyardError::validation(
                format!("{kind} subtype"),
                selector,
                format!("expected one of {}", known()),
            ));
        }
    };

    let table = catalog.versions(subtype).ok_or_else(|| {
        DockyardError::validation(format!("{kind} subtype"), subtype, "not in the catalog")
    })?;
    let version = match version {
        None => table.default_version(),
        Some(v) => table.find(v).ok_or_else(|| {
            let supported = table.supported().join(", ");
            let reason = if bare {
                format!("neither a subtype ({}) nor a version supported by {subtype} ({supported})", known())
            } else {
                format!("{subtype} supports {supported}")
            };
            DockyardError::validation(format!("{kind} version"), v, reason)
        })?,
    };

    Ok(ResolvedRequest {
        kind,
        subtype: subtype.to_ascii_lowercase(),
        version: version.to_owned(),
        overrides: request.overrides.clone(),
    })
}

/// Uniform contract of an infrastructure provider.
pub trait Provider: fmt::Debug + Send + Sync {
    /// Kind served by this provider.
    fn kind(&self) -> ResourceKind;

    /// Subtypes and versions served by this provider.
    fn catalog(&self) -> &Catalog;

    /// Whether entries of `subtype` keep state in a named volume.
    fn is_stateful(&self, subtype: &str) -> bool;

    /// Validates a request and fills in the default subtype and version.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending value.
    fn validate(&self, request: &ResourceRequest) -> Result<ResolvedRequest> {
        resolve(self.catalog(), request)
    }

    /// Builds the shared entry the first time its key is seen.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the subtype has no materialization recipe.
    fn materialize(&self, request: &ResolvedRequest) -> Result<SharedResourceEntry>;

    /// Variables a consumer needs to reach `entry`, using `credentials`.
    fn environment_for(
        &self,
        entry: &SharedResourceEntry,
        credentials: &Credentials,
    ) -> Vec<(String, String)>;
}

/// Maps each resource kind to its provider.
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderRegistry {
    /// A registry with no providers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// A registry with every built-in provider and its documented version table.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            providers: vec![
                Box::new(database::DatabaseProvider::default()),
                Box::new(cache::CacheProvider::default()),
                Box::new(search::SearchProvider::default()),
                Box::new(storage::StorageProvider::default()),
                Box::new(mail::MailProvider::default()),
                Box::new(runtime::RuntimeProvider::default()),
            ],
        }
    }

    /// Registers a provider.
    ///
    /// # Errors
    ///
    /// Returns a validation error if its kind already has a provider or one
    /// of its subtypes is already served by another provider.
    pub fn register(&mut self, provider: Box<dyn Provider>) -> Result<()> {
        let kind = provider.kind();
        if self.get(kind).is_some() {
            return Err(DockyardError::validation(
                "provider kind",
                kind.as_str(),
                "already registered",
            ));
        }
        for subtype in provider.catalog().names() {
            if self
                .providers
                .iter()
                .any(|p| p.catalog().versions(subtype).is_some())
            {
                return Err(DockyardError::validation(
                    "provider subtype",
                    subtype,
                    "already served by another provider",
                ));
            }
        }
        self.providers.push(provider);
        Ok(())
    }

    /// Provider registered for `kind`, if any.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Option<&dyn Provider> {
        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| &**p)
    }

    /// Provider registered for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::UnsupportedKind`] if none is registered.
    pub fn provider_for(&self, kind: ResourceKind, consumer: &str) -> Result<&dyn Provider> {
        self.get(kind).ok_or_else(|| DockyardError::UnsupportedKind {
            kind: kind.as_str().to_owned(),
            consumer: consumer.to_owned(),
        })
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
