//! The serializable orchestration document.
//!
//! The shape follows the compose file format: a `services` mapping of
//! container entries, a `volumes` mapping of named volumes, and a
//! `networks` mapping holding the single shared network. Every entry
//! serializes its `depends_on` list, even when it is empty.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::model::{BuildSpec, HealthCheck};

/// The complete output of one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestrationDocument {
    /// Container entries: services first, then shared entries, then sidecars.
    pub services: IndexMap<String, ContainerEntry>,
    /// Named volumes referenced by some entry.
    pub volumes: BTreeMap<String, VolumeDefinition>,
    /// The single network every entry joins.
    pub networks: NetworkSection,
}

impl OrchestrationDocument {
    /// Creates a document with no entries attached to `network`.
    #[must_use]
    pub fn new(network: NetworkSection) -> Self {
        Self {
            services: IndexMap::new(),
            volumes: BTreeMap::new(),
            networks: network,
        }
    }

    /// Container entry called `name`.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ContainerEntry> {
        self.services.get(name)
    }

    /// Dependencies of the entry called `name`, empty if it has none.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.services
            .get(name)
            .map(|entry| entry.depends_on.as_slice())
            .unwrap_or_default()
    }

    /// Names of every container entry, in document order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

/// One container in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerEntry {
    /// Image reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Build context, for services built from source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    /// Startup command.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Container environment.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Published ports, `host:container`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Mounted volumes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Mount>,
    /// Container labels.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Health check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthCheck>,
    /// Memory limit, e.g. `256m`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<String>,
    /// Entries that must start first.
    pub depends_on: Vec<String>,
    /// Networks the entry joins.
    pub networks: Vec<String>,
}

/// A volume mount, serialized as `source:target[:ro]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Volume name or host path.
    pub source: String,
    /// Mount point inside the container.
    pub target: String,
    /// Mounted read-only.
    pub read_only: bool,
    /// `true` for named volumes, which must be declared in the document.
    pub named: bool,
}

impl Mount {
    /// A read-write named volume.
    #[must_use]
    pub fn named(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
            named: true,
        }
    }

    /// A host path.
    #[must_use]
    pub fn bind(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
            named: false,
        }
    }

    /// Marks the mount read-only.
    #[must_use]
    pub const fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.target)?;
        if self.read_only {
            f.write_str(":ro")?;
        }
        Ok(())
    }
}

impl Serialize for Mount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A named volume declaration. Serializes as an empty mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VolumeDefinition {}

/// The single network of a document, serialized as a one-key mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSection {
    /// Network name.
    pub name: String,
    /// Its definition.
    pub definition: NetworkDefinition,
}

impl NetworkSection {
    /// A bridge network called `name` on `subnet`.
    #[must_use]
    pub fn bridge(name: impl Into<String>, subnet: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: NetworkDefinition {
                driver: "bridge".into(),
                ipam: Ipam {
                    config: vec![IpamConfig {
                        subnet: subnet.into(),
                    }],
                },
            },
        }
    }
}

impl Serialize for NetworkSection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.definition)?;
        map.end()
    }
}

/// Network driver and addressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDefinition {
    /// Network driver.
    pub driver: String,
    /// Address management.
    pub ipam: Ipam,
}

/// IP address management block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ipam {
    /// Address pools.
    pub config: Vec<IpamConfig>,
}

/// One address pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpamConfig {
    /// Subnet in CIDR notation.
    pub subnet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_renders_compose_short_syntax() {
        assert_eq!(Mount::named("pg-data", "/var/lib/postgresql/data").to_string(), "pg-data:/var/lib/postgresql/data");
        assert_eq!(Mount::bind("./src", "/app").read_only(true).to_string(), "./src:/app:ro");
    }

    #[test]
    fn document_serializes_in_compose_shape() {
        let mut document = OrchestrationDocument::new(NetworkSection::bridge("dockyard", "172.28.0.0/16"));
        let _ = document.services.insert(
            "api".into(),
            ContainerEntry {
                image: Some("api:latest".into()),
                volumes: vec![Mount::named("uploads", "/data")],
                networks: vec!["dockyard".into()],
                ..ContainerEntry::default()
            },
        );
        let _ = document.volumes.insert("uploads".into(), VolumeDefinition {});

        let json = serde_json::to_value(&document).expect("serialize");
        assert_eq!(json["services"]["api"]["image"], "api:latest");
        assert_eq!(json["services"]["api"]["volumes"][0], "uploads:/data");
        assert_eq!(json["services"]["api"]["depends_on"], serde_json::json!([]));
        assert!(json["services"]["api"].get("environment").is_none());
        assert_eq!(json["volumes"]["uploads"], serde_json::json!({}));
        assert_eq!(json["networks"]["dockyard"]["driver"], "bridge");
        assert_eq!(
            json["networks"]["dockyard"]["ipam"]["config"][0]["subnet"],
            "172.28.0.0/16"
        );
    }

    #[test]
    fn dependencies_of_unknown_entry_is_empty() {
        let document = OrchestrationDocument::new(NetworkSection::bridge("n", "10.0.0.0/24"));
        assert!(document.dependencies_of("missing").is_empty());
        assert!(document.entry("missing").is_none());
    }

    #[test]
    fn yaml_output_keeps_entry_order() {
        let mut document = OrchestrationDocument::new(NetworkSection::bridge("n", "10.0.0.0/24"));
        for name in ["zeta", "alpha"] {
            let _ = document.services.insert(name.into(), ContainerEntry::default());
        }
        let yaml = serde_yaml::to_string(&document).expect("serialize");
        let zeta = yaml.find("zeta:").expect("zeta");
        let alpha = yaml.find("alpha:").expect("alpha");
        assert!(zeta < alpha, "got: {yaml}");
    }
}
