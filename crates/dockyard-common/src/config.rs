//! Global settings model for the compose engine.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::DockyardError;

/// Settings that apply to the whole generated document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// The single network every container joins.
    pub network: NetworkSettings,
    /// Reverse-proxy sidecar used by services that declare a domain.
    pub proxy: ProxySettings,
    /// How divergent overrides on a shared entry are handled.
    pub conflict_policy: ConflictPolicy,
}

impl GlobalSettings {
    /// Checks the settings and returns every problem found.
    #[must_use]
    pub fn validate(&self) -> Vec<DockyardError> {
        let mut errors = Vec::new();
        if self.network.name.trim().is_empty() {
            errors.push(DockyardError::validation(
                "network name",
                &self.network.name,
                "must not be empty",
            ));
        }
        if self.proxy.name.trim().is_empty() {
            errors.push(DockyardError::validation(
                "proxy name",
                &self.proxy.name,
                "must not be empty",
            ));
        }

        let subnet = match Ipv4Cidr::parse(&self.network.subnet) {
            Ok(cidr) => Some(cidr),
            Err(e) => {
                errors.push(e);
                None
            }
        };
        for reserved in &self.network.reserved {
            match Ipv4Cidr::parse(reserved) {
                Ok(block) => {
                    if subnet.is_some_and(|s| s.overlaps(block)) {
                        errors.push(DockyardError::validation(
                            "network subnet",
                            &self.network.subnet,
                            format!("overlaps reserved address block {reserved}"),
                        ));
                    }
                }
                Err(e) => errors.push(e),
            }
        }
        errors
    }
}

/// Definition of the shared network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Network name.
    pub name: String,
    /// IPv4 address block in CIDR notation.
    pub subnet: String,
    /// Address blocks owned by sibling infrastructure that the subnet must not overlap.
    pub reserved: Vec<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_NETWORK_NAME.into(),
            subnet: constants::DEFAULT_SUBNET.into(),
            reserved: vec![constants::DNS_RESERVED_SUBNET.into()],
        }
    }
}

/// Reverse-proxy sidecar configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Container name of the proxy.
    pub name: String,
    /// Proxy image.
    pub image: String,
    /// Host port published for HTTP traffic.
    pub http_port: u16,
    /// Host port published for the dashboard, if any.
    pub dashboard_port: Option<u16>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_PROXY_NAME.into(),
            image: constants::DEFAULT_PROXY_IMAGE.into(),
            http_port: constants::DEFAULT_PROXY_HTTP_PORT,
            dashboard_port: Some(constants::DEFAULT_PROXY_DASHBOARD_PORT),
        }
    }
}

/// Policy applied when consumers of one shared entry supply different overrides.
///
/// The first request observed for an entry always fixes the entry's own
/// configuration. The policy decides what the other consumers see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Every consumer's derived variables use the first writer's configuration.
    #[default]
    FirstWriter,
    /// A diverging override is reported as a conflict error.
    Strict,
    /// Each consumer's derived variables embed its own overrides, even when
    /// the entry does not actually use them.
    ConsumerOverride,
}

/// An IPv4 network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ipv4Cidr {
    network: u32,
    prefix: u8,
}

impl Ipv4Cidr {
    fn parse(input: &str) -> Result<Self, DockyardError> {
        let invalid = |reason: &str| DockyardError::validation("address block", input, reason);
        let (addr, prefix) = input
            .split_once('/')
            .ok_or_else(|| invalid("expected <address>/<prefix>"))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| invalid("not an IPv4 address"))?;
        let prefix: u8 = prefix
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| invalid("prefix must be between 0 and 32"))?;
        Ok(Self {
            network: u32::from(addr) & mask(prefix),
            prefix,
        })
    }

    const fn overlaps(self, other: Self) -> bool {
        let shortest = if self.prefix < other.prefix {
            self.prefix
        } else {
            other.prefix
        };
        self.network & mask(shortest) == other.network & mask(shortest)
    }
}

const fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    }
}
