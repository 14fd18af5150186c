//! System-wide constants and documented defaults.

/// Project file read by the CLI when no path is given.
pub const DEFAULT_PROJECT_FILE: &str = "dockyard.yml";

/// Name of the single network every container joins.
pub const DEFAULT_NETWORK_NAME: &str = "dockyard";

/// Address block of the shared network.
pub const DEFAULT_SUBNET: &str = "172.28.0.0/16";

/// Address block reserved for the name-resolution sidecar managed outside the engine.
pub const DNS_RESERVED_SUBNET: &str = "172.29.0.0/16";

/// Container name of the reverse-proxy sidecar.
pub const DEFAULT_PROXY_NAME: &str = "traefik";

/// Image of the reverse-proxy sidecar.
pub const DEFAULT_PROXY_IMAGE: &str = "traefik:v3.1";

/// Host port the reverse proxy listens on for HTTP.
pub const DEFAULT_PROXY_HTTP_PORT: u16 = 80;

/// Host port of the reverse-proxy dashboard.
pub const DEFAULT_PROXY_DASHBOARD_PORT: u16 = 8080;

/// Suffix appended to a shared entry name to form its data volume.
pub const DATA_VOLUME_SUFFIX: &str = "-data";

/// Username given to stateful services when a request does not set one.
pub const DEFAULT_USERNAME: &str = "dockyard";

/// Password given to stateful services when a request does not set one.
pub const DEFAULT_PASSWORD: &str = "secret";

/// Database name created when a request does not set one.
pub const DEFAULT_DATABASE: &str = "dockyard";
