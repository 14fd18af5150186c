//! Auto-wiring and environment variable injection.
//!
//! For each service, the variables every provider derives for its
//! dependencies are merged in dependency-declaration order. When two
//! providers emit the same key, the one invoked later wins. The service's
//! own explicit environment is applied last and always wins.

use std::collections::BTreeMap;

use dockyard_common::config::ConflictPolicy;
use dockyard_common::error::{DockyardError, Result};

use crate::dedup::{Binding, SharedEntries};
use crate::model::ServiceSpec;
use crate::provider::ProviderRegistry;

/// A service with its merged environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnvironment {
    /// Service name.
    pub name: String,
    /// Injected variables overlaid with the explicit environment.
    pub env: BTreeMap<String, String>,
}

/// Computes the environment of `service` from its bindings.
///
/// # Errors
///
/// Returns [`DockyardError::MissingTarget`] if a binding points at an entry
/// that was never materialized, or [`DockyardError::UnsupportedKind`] if its
/// provider is not registered.
pub fn inject_environment(
    service: &ServiceSpec,
    bindings: &[Binding],
    entries: &SharedEntries,
    registry: &ProviderRegistry,
    policy: ConflictPolicy,
) -> Result<ResolvedEnvironment> {
    let mut env = BTreeMap::new();

    for binding in bindings {
        let entry = entries
            .get(&binding.key)
            .ok_or_else(|| DockyardError::MissingTarget {
                from: service.name.clone(),
                target: binding.target.clone(),
            })?;
        let provider = registry.provider_for(binding.kind(), &service.name)?;
        let credentials = match policy {
            ConflictPolicy::FirstWriter | ConflictPolicy::Strict => entry.credentials.clone(),
            ConflictPolicy::ConsumerOverride => entry.credentials.overlay(&binding.overrides),
        };
        for (key, value) in provider.environment_for(entry, &credentials) {
            if let Some(previous) = env.insert(key.clone(), value) {
                tracing::debug!(
                    service = %service.name,
                    key = %key,
                    replaced = %previous,
                    "later dependency overrides injected variable"
                );
            }
        }
    }

    for (key, value) in &service.environment {
        let _ = env.insert(key.clone(), value.clone());
    }

    Ok(ResolvedEnvironment {
        name: service.name.clone(),
        env,
    })
}
