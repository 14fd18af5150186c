//! Document assembly.
//!
//! Aggregates the outputs of the earlier stages into one
//! [`OrchestrationDocument`], in a fixed order: services, shared entries,
//! sidecars, the volumes section, and finally the network attachment.
//! Nothing produced upstream is modified.

use dockyard_common::config::NetworkSettings;
use dockyard_common::error::{DockyardError, Result};

use crate::dedup::SharedEntries;
use crate::document::{
    ContainerEntry, Mount, NetworkSection, OrchestrationDocument, VolumeDefinition,
};
use crate::entry::{EntryRole, SharedResourceEntry};
use crate::graph::DependencyPlan;
use crate::model::{ServiceSpec, VolumeRequest};
use crate::resolver::ResolvedEnvironment;
use crate::sidecar::ReverseProxy;

/// Everything the assembler aggregates.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    /// Declared services, in input order.
    pub services: &'a [ServiceSpec],
    /// Merged environments, one per service.
    pub environments: &'a [ResolvedEnvironment],
    /// Deduplicated entries in first-seen order.
    pub entries: &'a SharedEntries,
    /// Checked dependency structure.
    pub plan: &'a DependencyPlan,
    /// Reverse proxy, if some service needs one.
    pub proxy: Option<&'a ReverseProxy>,
    /// The single network.
    pub network: &'a NetworkSettings,
}

/// Builds the document.
///
/// # Errors
///
/// Returns a validation error if two entries share a container name.
pub fn assemble(input: &AssemblyInput<'_>) -> Result<OrchestrationDocument> {
    let mut document = OrchestrationDocument::new(NetworkSection::bridge(
        &input.network.name,
        &input.network.subnet,
    ));

    for (service, environment) in input.services.iter().zip(input.environments) {
        let entry = service_entry(service, environment, input.proxy);
        insert(&mut document, &service.name, entry, input.plan)?;
    }

    for entry in input.entries.values().filter(|e| e.role == EntryRole::Shared) {
        insert(&mut document, &entry.name, shared_entry(entry), input.plan)?;
    }

    for entry in input.entries.values().filter(|e| e.role == EntryRole::Sidecar) {
        insert(&mut document, &entry.name, shared_entry(entry), input.plan)?;
    }
    if let Some(proxy) = input.proxy {
        insert(&mut document, proxy.name(), proxy.container(), input.plan)?;
    }

    let volumes: Vec<String> = document
        .services
        .values()
        .flat_map(|entry| &entry.volumes)
        .filter(|mount| mount.named)
        .map(|mount| mount.source.clone())
        .collect();
    for volume in volumes {
        let _ = document.volumes.insert(volume, VolumeDefinition {});
    }

    for entry in document.services.values_mut() {
        entry.networks = vec![input.network.name.clone()];
    }

    tracing::debug!(
        entries = document.services.len(),
        volumes = document.volumes.len(),
        "assembled document"
    );
    Ok(document)
}

fn insert(
    document: &mut OrchestrationDocument,
    name: &str,
    mut entry: ContainerEntry,
    plan: &DependencyPlan,
) -> Result<()> {
    if document.services.contains_key(name) {
        return Err(DockyardError::validation(
            "container name",
            name,
            "used by more than one container",
        ));
    }
    entry.depends_on = plan.dependencies_of(name).to_vec();
    let _ = document.services.insert(name.to_owned(), entry);
    Ok(())
}

fn service_entry(
    service: &ServiceSpec,
    environment: &ResolvedEnvironment,
    proxy: Option<&ReverseProxy>,
) -> ContainerEntry {
    // Routed services are reached through the proxy only.
    let ports = match (service.port, &service.domain) {
        (Some(port), None) => vec![format!("{port}:{port}")],
        _ => Vec::new(),
    };
    let volumes = service
        .volumes
        .iter()
        .map(|volume| match volume {
            VolumeRequest::Named {
                named,
                target,
                read_only,
            } => Mount::named(named, target).read_only(*read_only),
            VolumeRequest::Bind {
                bind,
                target,
                read_only,
            } => Mount::bind(bind, target).read_only(*read_only),
        })
        .collect();

    ContainerEntry {
        image: service.image.clone(),
        build: service.build.clone(),
        command: service.command.clone().unwrap_or_default(),
        environment: environment.env.clone(),
        ports,
        volumes,
        labels: proxy.map(|p| p.labels_for(service)).unwrap_or_default(),
        healthcheck: service.healthcheck.clone(),
        ..ContainerEntry::default()
    }
}

fn shared_entry(entry: &SharedResourceEntry) -> ContainerEntry {
    ContainerEntry {
        image: Some(entry.image.clone()),
        command: entry.command.clone(),
        environment: entry.environment.clone(),
        volumes: entry
            .volume
            .iter()
            .map(|v| Mount::named(&v.name, &v.target))
            .collect(),
        healthcheck: entry.healthcheck.clone(),
        mem_limit: entry.memory_limit.map(|m| m.to_string()),
        ..ContainerEntry::default()
    }
}
