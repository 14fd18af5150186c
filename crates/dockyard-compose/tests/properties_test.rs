//! Property tests for sharing, version isolation, and output stability.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use dockyard_common::config::{ConflictPolicy, GlobalSettings};
use dockyard_compose::generate;
use dockyard_compose::model::{DetailedRequest, ServiceSpec};
use proptest::prelude::*;

const REDIS_VERSIONS: [&str; 4] = ["6.2", "7.0", "7.2", "7.4"];

fn redis_version() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(REDIS_VERSIONS.to_vec())
}

fn consumers(versions: &[&str]) -> Vec<ServiceSpec> {
    versions
        .iter()
        .enumerate()
        .map(|(i, version)| {
            ServiceSpec::new(format!("svc-{i}"), "app:latest")
                .resource("cache", format!("redis:{version}"))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: N consumers of one key yield one entry and N edges to it.
    #[test]
    fn property_same_key_is_shared(n in 1usize..12, version in redis_version()) {
        let specs = consumers(&vec![version; n]);
        let document = generate(&specs, &GlobalSettings::default()).expect("generate");
        let name = format!("redis-{}", version.replace('.', ""));

        prop_assert_eq!(document.services.len(), n + 1);
        prop_assert!(document.entry(&name).is_some());
        let edges = document
            .services
            .values()
            .flat_map(|entry| &entry.depends_on)
            .filter(|target| **target == name)
            .count();
        prop_assert_eq!(edges, n);
        prop_assert_eq!(document.volumes.len(), 1);
    }

    /// PROPERTY: each distinct version gets its own entry and volume.
    #[test]
    fn property_versions_are_isolated(
        versions in proptest::collection::vec(redis_version(), 1..10)
    ) {
        let specs = consumers(&versions);
        let document = generate(&specs, &GlobalSettings::default()).expect("generate");

        let mut distinct = versions.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(document.services.len(), specs.len() + distinct.len());
        prop_assert_eq!(document.volumes.len(), distinct.len());
        for (spec, version) in specs.iter().zip(&versions) {
            let expected = format!("redis-{}", version.replace('.', ""));
            prop_assert_eq!(document.dependencies_of(&spec.name), [expected]);
        }
    }

    /// PROPERTY: identical input produces byte-identical output.
    #[test]
    fn property_generation_is_idempotent(
        versions in proptest::collection::vec(redis_version(), 0..6),
        with_domain in any::<bool>(),
    ) {
        let mut specs = consumers(&versions);
        if with_domain {
            specs.push(ServiceSpec::new("web", "web:latest").domain("web.test").port(3000));
        }
        let settings = GlobalSettings::default();
        let first = serde_json::to_string(&generate(&specs, &settings).expect("generate"))
            .expect("serialize");
        let second = serde_json::to_string(&generate(&specs, &settings).expect("generate"))
            .expect("serialize");
        prop_assert_eq!(first, second);
    }

    /// PROPERTY: under the consumer-override policy a later consumer's
    /// derived password can differ from the one the entry listens with;
    /// under first-writer it never does.
    #[test]
    fn property_first_writer_keeps_passwords_consistent(
        first in "[a-z]{4,10}",
        second in "[a-z]{4,10}",
    ) {
        let request = |pw: &str| DetailedRequest {
            using: Some("redis".into()),
            password: Some(pw.to_owned()),
            ..DetailedRequest::default()
        };
        let specs = [
            ServiceSpec::new("api", "app:latest").detailed_resource("cache", request(&first)),
            ServiceSpec::new("worker", "app:latest").detailed_resource("cache", request(&second)),
        ];

        let consistent = generate(&specs, &GlobalSettings::default()).expect("generate");
        let worker = &consistent.entry("worker").expect("worker").environment;
        prop_assert_eq!(&worker["REDIS_PASSWORD"], &first);

        let settings = GlobalSettings {
            conflict_policy: ConflictPolicy::ConsumerOverride,
            ..GlobalSettings::default()
        };
        let mismatched = generate(&specs, &settings).expect("generate");
        let redis = mismatched.entry("redis-72").expect("redis");
        let worker = &mismatched.entry("worker").expect("worker").environment;
        prop_assert_eq!(&worker["REDIS_PASSWORD"], &second);
        prop_assert!(redis.command.contains(&first));
        prop_assert_eq!(redis.command.contains(&second), first == second);
    }
}
