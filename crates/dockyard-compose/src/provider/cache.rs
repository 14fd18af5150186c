//! Cache provider: Redis and Memcached.

use dockyard_common::error::{DockyardError, Result};

use super::{Catalog, Provider, ResolvedRequest, VersionTable};
use crate::entry::{Credentials, SharedResourceEntry};
use crate::model::{HealthCheck, ResourceKind};

const REDIS_PORT: u16 = 6379;
const MEMCACHED_PORT: u16 = 11211;
const MEMCACHED_DEFAULT_MEGABYTES: u64 = 64;

/// Provider for the `cache` kind.
#[derive(Debug)]
pub struct CacheProvider {
    catalog: Catalog,
}

impl CacheProvider {
    /// Creates a provider serving the subtypes in `catalog`.
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    fn redis(request: &ResolvedRequest) -> SharedResourceEntry {
        let password = request.overrides.password.clone();
        let mut command = vec!["redis-server".to_owned(), "--appendonly".into(), "yes".into()];
        if let Some(pw) = &password {
            command.extend(["--requirepass".to_owned(), pw.clone()]);
        }
        if let Some(memory) = request.overrides.memory {
            command.extend([
                "--maxmemory".to_owned(),
                format!("{}mb", memory.megabytes()),
            ]);
        }

        let mut probe = vec!["CMD".to_owned(), "redis-cli".into()];
        if let Some(pw) = &password {
            probe.extend(["-a".to_owned(), pw.clone()]);
        }
        probe.push("ping".into());

        SharedResourceEntry::new(request, format!("redis:{}-alpine", request.version))
            .command(command)
            .port(REDIS_PORT)
            .data_volume("/data")
            .healthcheck(HealthCheck::probe(probe))
            .credentials(Credentials {
                password,
                ..Credentials::default()
            })
    }

    fn memcached(request: &ResolvedRequest) -> SharedResourceEntry {
        let megabytes = request
            .overrides
            .memory
            .map_or(MEMCACHED_DEFAULT_MEGABYTES, |m| m.megabytes());
        SharedResourceEntry::new(request, format!("memcached:{}-alpine", request.version))
            .command(["memcached".to_owned(), "-m".into(), megabytes.to_string()])
            .port(MEMCACHED_PORT)
    }
}

impl Default for CacheProvider {
    fn default() -> Self {
        Self::new(
            Catalog::new()
                .with("redis", VersionTable::new("7.2", &["6.2", "7.0", "7.2", "7.4"]))
                .with("memcached", VersionTable::new("1.6", &["1.6", "1.6.23"])),
        )
    }
}

impl Provider for CacheProvider {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Cache
    }

    fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn is_stateful(&self, subtype: &str) -> bool {
        subtype == "redis"
    }

    fn materialize(&self, request: &ResolvedRequest) -> Result<SharedResourceEntry> {
        match request.subtype.as_str() {
            "redis" => Ok(Self::redis(request)),
            "memcached" => Ok(Self::memcached(request)),
            other => Err(DockyardError::validation(
                "cache subtype",
                other,
                "no recipe available",
            )),
        }
    }

    fn environment_for(
        &self,
        entry: &SharedResourceEntry,
        credentials: &Credentials,
    ) -> Vec<(String, String)> {
        let host = entry.host();
        let port = entry.port_string();
        match entry.key.subtype() {
            "redis" => {
                let mut env = vec![
                    ("REDIS_HOST".to_owned(), host.to_owned()),
                    ("REDIS_PORT".to_owned(), port.clone()),
                ];
                let url = match &credentials.password {
                    Some(pw) => {
                        env.push(("REDIS_PASSWORD".into(), pw.clone()));
                        format!("redis://:{}@{host}:{port}", urlencoding::encode(pw))
                    }
                    None => format!("redis://{host}:{port}"),
                };
                env.extend([
                    ("REDIS_URL".to_owned(), url),
                    ("CACHE_DRIVER".to_owned(), "redis".to_owned()),
                    ("SESSION_DRIVER".to_owned(), "redis".to_owned()),
                    ("QUEUE_CONNECTION".to_owned(), "redis".to_owned()),
                ]);
                env
            }
            "memcached" => vec![
                ("MEMCACHED_HOST".into(), host.into()),
                ("MEMCACHED_PORT".into(), port.clone()),
                ("MEMCACHED_URL".into(), format!("memcached://{host}:{port}")),
                ("CACHE_DRIVER".into(), "memcached".into()),
                ("SESSION_DRIVER".into(), "memcached".into()),
            ],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DetailedRequest, RequestInput, ResourceRequest};

    fn materialize(input: RequestInput) -> (CacheProvider, SharedResourceEntry) {
        let provider = CacheProvider::default();
        let request = ResourceRequest::parse("cache", &input).expect("parse");
        let resolved = provider.validate(&request).expect("valid");
        let entry = provider.materialize(&resolved).expect("materialize");
        (provider, entry)
    }

    fn keys(env: &[(String, String)]) -> Vec<&str> {
        env.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn redis_without_password() {
        let (provider, entry) = materialize(RequestInput::Short("redis:7.2".into()));
        assert_eq!(entry.name, "redis-72");
        assert_eq!(entry.image, "redis:7.2-alpine");
        assert_eq!(entry.command, vec!["redis-server", "--appendonly", "yes"]);
        assert_eq!(
            entry.volume.as_ref().map(|v| v.name.as_str()),
            Some("redis-72-data")
        );

        let env = provider.environment_for(&entry, &entry.credentials);
        assert_eq!(
            keys(&env),
            vec![
                "REDIS_HOST",
                "REDIS_PORT",
                "REDIS_URL",
                "CACHE_DRIVER",
                "SESSION_DRIVER",
                "QUEUE_CONNECTION"
            ]
        );
        assert!(env.contains(&("REDIS_URL".into(), "redis://redis-72:6379".into())));
        assert!(env.contains(&("REDIS_PORT".into(), "6379".into())));
    }

    #[test]
    fn redis_with_password_and_memory() {
        let (provider, entry) = materialize(RequestInput::Detailed(DetailedRequest {
            using: Some("redis:7.0".into()),
            password: Some("pw".into()),
            memory: Some("256m".into()),
            ..DetailedRequest::default()
        }));
        assert_eq!(entry.name, "redis-70");
        assert!(entry.command.windows(2).any(|w| w == ["--requirepass", "pw"]));
        assert!(entry.command.windows(2).any(|w| w == ["--maxmemory", "256mb"]));
        let healthcheck = entry.healthcheck.as_ref().expect("healthcheck");
        assert_eq!(healthcheck.test, vec!["CMD", "redis-cli", "-a", "pw", "ping"]);

        let env = provider.environment_for(&entry, &entry.credentials);
        assert!(env.contains(&("REDIS_PASSWORD".into(), "pw".into())));
        assert!(env.contains(&("REDIS_URL".into(), "redis://:pw@redis-70:6379".into())));
    }

    #[test]
    fn redis_url_escapes_password() {
        let (provider, entry) = materialize(RequestInput::Detailed(DetailedRequest {
            using: Some("redis".into()),
            password: Some("p@ss:w/rd".into()),
            ..DetailedRequest::default()
        }));
        let env = provider.environment_for(&entry, &entry.credentials);
        assert!(env.contains(&("REDIS_PASSWORD".into(), "p@ss:w/rd".into())));
        assert!(env.contains(&(
            "REDIS_URL".into(),
            "redis://:p%40ss%3Aw%2Frd@redis-72:6379".into()
        )));
    }

    #[test]
    fn memcached_is_stateless() {
        let (provider, entry) = materialize(RequestInput::Short("memcached:1.6.23".into()));
        assert_eq!(entry.name, "memcached-1623");
        assert!(entry.volume.is_none());
        assert!(!provider.is_stateful("memcached"));
        assert_eq!(entry.command, vec!["memcached", "-m", "64"]);

        let env = provider.environment_for(&entry, &entry.credentials);
        assert_eq!(
            keys(&env),
            vec![
                "MEMCACHED_HOST",
                "MEMCACHED_PORT",
                "MEMCACHED_URL",
                "CACHE_DRIVER",
                "SESSION_DRIVER"
            ]
        );
        assert!(env.contains(&(
            "MEMCACHED_URL".into(),
            "memcached://memcached-1623:11211".into()
        )));
    }

    #[test]
    fn memcached_memory_override() {
        let (_, entry) = materialize(RequestInput::Detailed(DetailedRequest {
            using: Some("memcached".into()),
            memory: Some("1g".into()),
            ..DetailedRequest::default()
        }));
        assert_eq!(entry.command, vec!["memcached", "-m", "1024"]);
    }
}
