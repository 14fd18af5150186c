//! # dockyard-compose
//!
//! Turns a list of declared services into one fully resolved
//! multi-container orchestration document.
//!
//! Handles:
//! - **Model**: Typed services and resource requests, parsed once at the boundary.
//! - **Provider**: One provider per infrastructure kind (validation, naming, materialization).
//! - **Dedup**: At most one shared entry per canonical `(kind, version)` key.
//! - **Graph**: Dependency edges between services, shared entries, and sidecars.
//! - **Resolver**: Connection environment injected into each consumer.
//! - **Assembler**: The final document with a single network and its named volumes.

pub mod assembler;
pub mod dedup;
pub mod document;
pub mod entry;
pub mod graph;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod sidecar;

mod engine;

pub use engine::{Engine, generate};
