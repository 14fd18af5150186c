//! The `generate` pipeline.

use std::collections::{BTreeSet, HashSet};

use dockyard_common::config::{ConflictPolicy, GlobalSettings};
use dockyard_common::constants::DATA_VOLUME_SUFFIX;
use dockyard_common::error::{Diagnostics, DockyardError};
use indexmap::IndexMap;

use crate::assembler::{AssemblyInput, assemble};
use crate::dedup::{Binding, Deduplicator, SharedEntries};
use crate::document::OrchestrationDocument;
use crate::graph::build_plan;
use crate::model::{ServiceSpec, VolumeRequest};
use crate::provider::{ProviderRegistry, ResolvedRequest};
use crate::resolver::inject_environment;
use crate::sidecar::ReverseProxy;

/// Runs the compose pipeline against a provider registry.
#[derive(Debug, Default)]
pub struct Engine {
    registry: ProviderRegistry,
    settings: GlobalSettings,
}

impl Engine {
    /// Creates an engine using the builtin providers.
    #[must_use]
    pub fn new(settings: GlobalSettings) -> Self {
        Self::with_registry(ProviderRegistry::builtin(), settings)
    }

    /// Creates an engine using a custom provider registry.
    #[must_use]
    pub const fn with_registry(registry: ProviderRegistry, settings: GlobalSettings) -> Self {
        Self { registry, settings }
    }

    /// Document-wide settings.
    #[must_use]
    pub const fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    /// Providers consulted for each request.
    #[must_use]
    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Generates the document for `specs`.
    ///
    /// Every validation problem is collected before anything is
    /// materialized, so one call reports all of them.
    ///
    /// # Errors
    ///
    /// Returns the non-empty list of problems found. No partial document is
    /// returned.
    pub fn generate(
        &self,
        specs: &[ServiceSpec],
    ) -> Result<OrchestrationDocument, Diagnostics> {
        tracing::info!(services = specs.len(), "generating document");

        let requests = self.validate(specs)?;
        let (entries, bindings) = self.deduplicate(specs, &requests)?;

        let proxy = ReverseProxy::required_by(
            specs,
            &self.settings.proxy,
            &self.settings.network.name,
        );
        let plan = build_plan(specs, &bindings, &entries, proxy.as_ref().map(ReverseProxy::name))?;

        let mut diagnostics = Diagnostics::new();
        let environments: Vec<_> = specs
            .iter()
            .filter_map(|service| {
                let service_bindings = bindings
                    .get(&service.name)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                diagnostics.capture(inject_environment(
                    service,
                    service_bindings,
                    &entries,
                    &self.registry,
                    self.settings.conflict_policy,
                ))
            })
            .collect();
        diagnostics.into_result(())?;

        let document = assemble(&AssemblyInput {
            services: specs,
            environments: &environments,
            entries: &entries,
            plan: &plan,
            proxy: proxy.as_ref(),
            network: &self.settings.network,
        })?;

        tracing::info!(
            services = specs.len(),
            shared = entries.len(),
            entries = document.services.len(),
            volumes = document.volumes.len(),
            "document generated"
        );
        Ok(document)
    }

    /// Checks settings, services and every request, resolving the requests
    /// of each service in declaration order.
    fn validate(&self, specs: &[ServiceSpec]) -> Result<Vec<Vec<ResolvedRequest>>, Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        diagnostics.extend(self.settings.validate());

        let mut seen = HashSet::new();
        for service in specs {
            if service.name.trim().is_empty() {
                diagnostics.push(DockyardError::validation(
                    "service name",
                    &service.name,
                    "must not be empty",
                ));
            } else if !seen.insert(service.name.as_str()) {
                diagnostics.push(DockyardError::validation(
                    "service name",
                    &service.name,
                    "declared more than once",
                ));
            }
            if service.image.is_none() && service.build.is_none() {
                diagnostics.push(DockyardError::validation(
                    "service",
                    &service.name,
                    "must declare an image or a build context",
                ));
            }
        }

        let mut requests = Vec::with_capacity(specs.len());
        for service in specs {
            let mut resolved = Vec::new();
            let mut kinds = HashSet::new();
            for (key, request) in service.resources.keys().zip(service.requests()) {
                let Some(request) = diagnostics.capture(request) else {
                    continue;
                };
                // Aliases and case variants spell the same kind.
                if !kinds.insert(request.kind) {
                    diagnostics.push(DockyardError::validation(
                        "resource kind",
                        key,
                        format!("requested more than once by \"{}\"", service.name),
                    ));
                    continue;
                }
                let Some(provider) =
                    diagnostics.capture(self.registry.provider_for(request.kind, &service.name))
                else {
                    continue;
                };
                if let Some(request) = diagnostics.capture(provider.validate(&request)) {
                    resolved.push(request);
                }
            }
            requests.push(resolved);
        }

        // Shared entries and sidecars are named after their key; a service
        // of the same name would shadow them.
        let mut reserved: BTreeSet<String> = requests
            .iter()
            .flatten()
            .map(|request| request.key().name())
            .collect();
        if specs.iter().any(|s| s.domain.is_some()) {
            let _ = reserved.insert(self.settings.proxy.name.clone());
        }
        let mut reported = HashSet::new();
        for service in specs {
            if reserved.contains(&service.name) && reported.insert(service.name.as_str()) {
                diagnostics.push(DockyardError::validation(
                    "service name",
                    &service.name,
                    "collides with a generated infrastructure container",
                ));
            }
        }

        let data_volumes: BTreeSet<String> = requests
            .iter()
            .flatten()
            .filter(|request| {
                self.registry
                    .get(request.kind)
                    .is_some_and(|provider| provider.is_stateful(&request.subtype))
            })
            .map(|request| format!("{}{DATA_VOLUME_SUFFIX}", request.key().name()))
            .collect();
        for service in specs {
            let shadowing = service.volumes.iter().filter_map(|volume| match volume {
                VolumeRequest::Named { named, .. } if data_volumes.contains(named) => Some(named),
                _ => None,
            });
            for named in shadowing {
                diagnostics.push(DockyardError::validation(
                    "volume",
                    named,
                    format!(
                        "declared by \"{}\" shadows a shared entry's data volume",
                        service.name
                    ),
                ));
            }
        }

        diagnostics.into_result(requests)
    }

    /// Materializes shared entries in first-seen order and binds every
    /// consumer to its entry.
    fn deduplicate(
        &self,
        specs: &[ServiceSpec],
        requests: &[Vec<ResolvedRequest>],
    ) -> Result<(SharedEntries, IndexMap<String, Vec<Binding>>), Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let mut dedup = Deduplicator::new();
        let mut bindings: IndexMap<String, Vec<Binding>> = IndexMap::new();

        for (service, resolved) in specs.iter().zip(requests) {
            let mut service_bindings = Vec::with_capacity(resolved.len());
            for request in resolved {
                let Some(provider) =
                    diagnostics.capture(self.registry.provider_for(request.kind, &service.name))
                else {
                    continue;
                };
                let Some(binding) =
                    diagnostics.capture(dedup.observe(provider, &service.name, request))
                else {
                    continue;
                };
                for field in dedup.divergences(&binding) {
                    if self.settings.conflict_policy == ConflictPolicy::Strict {
                        diagnostics.push(DockyardError::Conflict {
                            key: binding.target.clone(),
                            field,
                            consumer: service.name.clone(),
                        });
                    } else {
                        tracing::warn!(
                            consumer = %service.name,
                            entry = %binding.target,
                            field,
                            "override differs from the shared entry's configuration; first writer wins"
                        );
                    }
                }
                service_bindings.push(binding);
            }
            let _ = bindings.insert(service.name.clone(), service_bindings);
        }

        tracing::debug!(shared = dedup.len(), "deduplicated shared entries");
        diagnostics.into_result((dedup.into_entries(), bindings))
    }
}

/// Generates the document for `specs` with the builtin providers.
///
/// # Errors
///
/// Returns every validation problem found; see [`Engine::generate`].
pub fn generate(
    specs: &[ServiceSpec],
    settings: &GlobalSettings,
) -> Result<OrchestrationDocument, Diagnostics> {
    Engine::new(settings.clone()).generate(specs)
}
