//! Dependency graph management using `petgraph`.
//!
//! Wires every service to the shared entries and sidecars it needs, checks
//! that every edge target exists and that no cycle was introduced, and
//! resolves the start order used for deployment plans.

use std::collections::HashMap;

use dockyard_common::error::{DockyardError, Result};
use indexmap::IndexMap;
use petgraph::graph::NodeIndex;

use crate::dedup::{Binding, SharedEntries};
use crate::model::ServiceSpec;

/// A directed "depends on" relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    /// Consumer entry.
    pub from: String,
    /// Entry it depends on.
    pub to: String,
}

/// A dependency graph of container entries.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: petgraph::Graph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, returning the existing index if the name is already present.
    pub fn add_component(&mut self, name: impl Into<String>) -> NodeIndex {
        let name = name.into();
        if let Some(&idx) = self.index.get(&name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        let _ = self.index.insert(name, idx);
        idx
    }

    /// Index of the node called `name`.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Returns a topological ordering of entries, dependencies first.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Cycle`] naming a node on the cycle.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => Err(DockyardError::Cycle {
                node: self
                    .graph
                    .node_weight(cycle.node_id())
                    .cloned()
                    .unwrap_or_default(),
            }),
        }
    }
}

/// The checked dependency structure of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyPlan {
    edges: Vec<DependencyEdge>,
    dependencies: IndexMap<String, Vec<String>>,
    order: Vec<String>,
}

impl DependencyPlan {
    /// Every edge, in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Targets `name` depends on, in declaration order.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.dependencies
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Start order, dependencies first.
    #[must_use]
    pub fn start_order(&self) -> &[String] {
        &self.order
    }
}

/// Incrementally builds a [`DependencyPlan`], rejecting dangling edges.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DependencyGraph,
    edges: Vec<DependencyEdge>,
    dependencies: IndexMap<String, Vec<String>>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a container entry.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is already taken.
    pub fn add_node(&mut self, name: &str) -> Result<()> {
        if self.graph.node(name).is_some() {
            return Err(DockyardError::validation(
                "container name",
                name,
                "used by more than one container",
            ));
        }
        let _ = self.graph.add_component(name);
        let _ = self.dependencies.insert(name.to_owned(), Vec::new());
        Ok(())
    }

    /// Declares that `from` depends on `to`. Both must have been added.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::MissingTarget`] naming the endpoint that does not exist.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let missing = |target: &str| DockyardError::MissingTarget {
            from: from.to_owned(),
            target: target.to_owned(),
        };
        let dependency = self.graph.node(to).ok_or_else(|| missing(to))?;
        let dependent = self.graph.node(from).ok_or_else(|| missing(from))?;
        let targets = self.dependencies.entry(from.to_owned()).or_default();
        if targets.iter().any(|t| t == to) {
            return Ok(());
        }
        targets.push(to.to_owned());
        self.graph.add_dependency(dependent, dependency);
        tracing::debug!(from, to, "dependency edge");
        self.edges.push(DependencyEdge {
            from: from.to_owned(),
            to: to.to_owned(),
        });
        Ok(())
    }

    /// Checks the graph for cycles and returns the plan.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::Cycle`] if the edges form a cycle.
    pub fn build(self) -> Result<DependencyPlan> {
        let order = self.graph.resolve_order()?;
        Ok(DependencyPlan {
            edges: self.edges,
            dependencies: self.dependencies,
            order,
        })
    }
}

/// Builds the plan for a document: services, then shared entries and
/// sidecars in first-seen order, then the reverse proxy if one is needed.
///
/// # Errors
///
/// Returns an error on a name collision, a dangling edge, or a cycle.
pub fn build_plan(
    services: &[ServiceSpec],
    bindings: &IndexMap<String, Vec<Binding>>,
    entries: &SharedEntries,
    proxy: Option<&str>,
) -> Result<DependencyPlan> {
    let mut builder = GraphBuilder::new();
    for service in services {
        builder.add_node(&service.name)?;
    }
    for entry in entries.values() {
        builder.add_node(&entry.name)?;
    }
    if let Some(proxy) = proxy {
        builder.add_node(proxy)?;
    }

    for service in services {
        for binding in bindings.get(&service.name).into_iter().flatten() {
            builder.add_edge(&service.name, &binding.target)?;
        }
        if service.domain.is_some() {
            let proxy = proxy.ok_or_else(|| DockyardError::MissingTarget {
                from: service.name.clone(),
                target: "reverse proxy".into(),
            })?;
            builder.add_edge(&service.name, proxy)?;
        }
    }
    builder.build()
}
