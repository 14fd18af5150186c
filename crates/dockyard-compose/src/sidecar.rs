//! Reverse-proxy sidecar for services that declare a public domain.

use std::collections::BTreeMap;

use dockyard_common::config::ProxySettings;

use crate::document::{ContainerEntry, Mount};
use crate::model::ServiceSpec;

const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const HTTP_ENTRYPOINT_PORT: u16 = 80;
const DASHBOARD_PORT: u16 = 8080;
const DEFAULT_BACKEND_PORT: u16 = 80;

/// The traefik container routing domain traffic to services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseProxy {
    settings: ProxySettings,
    network: String,
}

impl ReverseProxy {
    /// Creates a proxy watching containers on `network`.
    #[must_use]
    pub fn new(settings: &ProxySettings, network: impl Into<String>) -> Self {
        Self {
            settings: settings.clone(),
            network: network.into(),
        }
    }

    /// Returns a proxy only if some service declares a domain.
    #[must_use]
    pub fn required_by(
        services: &[ServiceSpec],
        settings: &ProxySettings,
        network: &str,
    ) -> Option<Self> {
        services
            .iter()
            .any(|s| s.domain.is_some())
            .then(|| Self::new(settings, network))
    }

    /// Container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// The proxy's own container entry.
    #[must_use]
    pub fn container(&self) -> ContainerEntry {
        let mut command = vec![
            "--providers.docker=true".to_owned(),
            "--providers.docker.exposedbydefault=false".to_owned(),
            format!("--providers.docker.network={}", self.network),
            format!("--entrypoints.web.address=:{HTTP_ENTRYPOINT_PORT}"),
        ];
        let mut ports = vec![format!("{}:{HTTP_ENTRYPOINT_PORT}", self.settings.http_port)];
        if let Some(dashboard) = self.settings.dashboard_port {
            command.extend(["--api.dashboard=true".to_owned(), "--api.insecure=true".to_owned()]);
            ports.push(format!("{dashboard}:{DASHBOARD_PORT}"));
        }

        ContainerEntry {
            image: Some(self.settings.image.clone()),
            command,
            ports,
            volumes: vec![Mount::bind(DOCKER_SOCKET, DOCKER_SOCKET).read_only(true)],
            ..ContainerEntry::default()
        }
    }

    /// Routing labels placed on `service`, empty if it has no domain.
    #[must_use]
    pub fn labels_for(&self, service: &ServiceSpec) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        let Some(domain) = &service.domain else {
            return labels;
        };
        let name = &service.name;
        let port = service.port.unwrap_or(DEFAULT_BACKEND_PORT);
        for (key, value) in [
            ("traefik.enable".to_owned(), "true".to_owned()),
            (
                format!("traefik.http.routers.{name}.rule"),
                format!("Host(`{domain}`)"),
            ),
            (
                format!("traefik.http.routers.{name}.entrypoints"),
                "web".to_owned(),
            ),
            (
                format!("traefik.http.services.{name}.loadbalancer.server.port"),
                port.to_string(),
            ),
        ] {
            let _ = labels.insert(key, value);
        }
        labels
    }
}
