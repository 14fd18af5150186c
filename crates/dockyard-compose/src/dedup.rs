//! Shared-resource deduplication.
//!
//! Requests from every service are funneled through one [`Deduplicator`].
//! The first request seen for a canonical key materializes the entry; later
//! requests for the same key only reference it.

use dockyard_common::error::{DockyardError, Result};
use indexmap::IndexMap;

use crate::entry::SharedResourceEntry;
use crate::model::{RequestOverrides, ResourceKind};
use crate::provider::{CanonicalKey, Provider, ResolvedRequest};

/// Link from one consumer request to the shared entry that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Consuming service.
    pub consumer: String,
    /// Key of the serving entry.
    pub key: CanonicalKey,
    /// Container name of the serving entry.
    pub target: String,
    /// Overrides the consumer supplied.
    pub overrides: RequestOverrides,
    /// Whether this request materialized the entry.
    pub first_writer: bool,
}

impl Binding {
    /// Kind of the serving entry.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.key.kind()
    }
}

/// Shared entries in first-seen order.
pub type SharedEntries = IndexMap<CanonicalKey, SharedResourceEntry>;

/// Registry of materialized entries, local to one engine run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    entries: SharedEntries,
    /// Overrides of the request that materialized each entry.
    configured: IndexMap<CanonicalKey, RequestOverrides>,
}

impl Deduplicator {
    /// Creates an empty deduplicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request from `consumer` and returns its binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot materialize a new entry, or
    /// if the entry's data volume disagrees with the provider's statefulness.
    pub fn observe(
        &mut self,
        provider: &dyn Provider,
        consumer: &str,
        request: &ResolvedRequest,
    ) -> Result<Binding> {
        let key = request.key();
        let first_writer = !self.entries.contains_key(&key);
        if first_writer {
            let entry = provider.materialize(request)?;
            let stateful = provider.is_stateful(&request.subtype);
            if stateful != entry.volume.is_some() {
                let reason = if stateful {
                    "stateful entry has no data volume"
                } else {
                    "stateless entry carries a data volume"
                };
                return Err(DockyardError::validation("shared entry", entry.name, reason));
            }
            tracing::debug!(entry = %entry.name, consumer, "materialized shared entry");
            let _ = self.entries.insert(key.clone(), entry);
            let _ = self.configured.insert(key.clone(), request.overrides.clone());
        }
        Ok(Binding {
            consumer: consumer.to_owned(),
            target: key.name(),
            key,
            overrides: request.overrides.clone(),
            first_writer,
        })
    }

    /// Overrides of `binding` that differ from what its entry was configured with.
    ///
    /// A field counts as configured by the first writer's own override when
    /// it set one, and by the entry's stored value otherwise. Providers that
    /// ignore a field never store it, so identical overrides still match.
    #[must_use]
    pub fn divergences(&self, binding: &Binding) -> Vec<&'static str> {
        if binding.first_writer {
            return Vec::new();
        }
        let (Some(entry), Some(first)) = (
            self.entries.get(&binding.key),
            self.configured.get(&binding.key),
        ) else {
            return Vec::new();
        };
        let requested = &binding.overrides;
        let creds = &entry.credentials;
        let mut fields = Vec::new();
        if differs(requested.password.as_ref(), first.password.as_ref(), creds.password.as_ref()) {
            fields.push("password");
        }
        if differs(requested.username.as_ref(), first.username.as_ref(), creds.username.as_ref()) {
            fields.push("username");
        }
        if differs(requested.database.as_ref(), first.database.as_ref(), creds.database.as_ref()) {
            fields.push("database");
        }
        if differs(requested.memory.as_ref(), first.memory.as_ref(), entry.memory_limit.as_ref()) {
            fields.push("memory");
        }
        fields
    }

    /// Entry registered under `key`.
    #[must_use]
    pub fn get(&self, key: &CanonicalKey) -> Option<&SharedResourceEntry> {
        self.entries.get(key)
    }

    /// Number of distinct entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the deduplicator, yielding entries in first-seen order.
    #[must_use]
    pub fn into_entries(self) -> SharedEntries {
        self.entries
    }
}

fn differs<T: PartialEq>(requested: Option<&T>, first: Option<&T>, stored: Option<&T>) -> bool {
    requested.is_some_and(|value| Some(value) != first.or(stored))
}
