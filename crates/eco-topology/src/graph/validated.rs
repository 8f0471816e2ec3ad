//! Validated Topology
//!
//! `ValidatedTopology` can only be produced by
//! `TopologyGraphBuilder::finalize`. It has no public constructor and no
//! mutating methods, so every graph reaching manifest emission is acyclic
//! and respects the stack reference rules.

use crate::types::{ReferenceKind, Resource, StackId};
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

/// Sealed, acyclic resource graph
#[derive(Debug, Clone)]
pub struct ValidatedTopology {
    graph: DiGraph<Resource, ReferenceKind>,
    names: HashMap<String, NodeIndex>,
    deploy_order: Vec<NodeIndex>,
    stacks: IndexMap<StackId, Vec<NodeIndex>>,
}

impl ValidatedTopology {
    /// Construct from a checked graph (finalisation only)
    pub(crate) fn seal(
        graph: DiGraph<Resource, ReferenceKind>,
        names: HashMap<String, NodeIndex>,
        deploy_order: Vec<NodeIndex>,
    ) -> Self {
        let mut stacks: IndexMap<StackId, Vec<NodeIndex>> = IndexMap::new();
        for index in graph.node_indices() {
            stacks
                .entry(graph[index].id.stack.clone())
                .or_default()
                .push(index);
        }
        Self {
            graph,
            names,
            deploy_order,
            stacks,
        }
    }

    /// Number of resources
    #[inline]
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of references
    #[inline]
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Resources in insertion order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> + '_ {
        self.graph.node_weights()
    }

    /// Resources with every dependency before its dependents
    pub fn deploy_order(&self) -> impl Iterator<Item = &Resource> + '_ {
        self.deploy_order.iter().map(|&index| &self.graph[index])
    }

    /// Resource by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.names.get(name).map(|&index| &self.graph[index])
    }

    /// Stacks in the order they were first populated (shared first)
    pub fn stacks(&self) -> impl Iterator<Item = &StackId> + '_ {
        self.stacks.keys()
    }

    /// Resources of one stack in deploy order
    pub fn resources_in<'a>(&'a self, stack: &'a StackId) -> impl Iterator<Item = &'a Resource> + 'a {
        self.deploy_order()
            .filter(move |resource| resource.id.stack == *stack)
    }

    /// Direct dependencies of a resource, ordered by insertion
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<(&Resource, ReferenceKind)> {
        let Some(&index) = self.names.get(name) else {
            return Vec::new();
        };
        let mut deps: Vec<(NodeIndex, ReferenceKind)> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (edge.target(), *edge.weight()))
            .collect();
        deps.sort_by_key(|(target, _)| *target);
        deps.into_iter()
            .map(|(target, kind)| (&self.graph[target], kind))
            .collect()
    }

    /// Resources that depend on `name`
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<&Resource> {
        let Some(&index) = self.names.get(name) else {
            return Vec::new();
        };
        let mut sources: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(index, Direction::Incoming)
            .collect();
        sources.sort();
        sources.dedup();
        sources.into_iter().map(|source| &self.graph[source]).collect()
    }

    /// Other stacks this stack references
    #[must_use]
    pub fn stack_dependencies(&self, stack: &StackId) -> Vec<StackId> {
        let mut deps = BTreeSet::new();
        for &index in self.stacks.get(stack).into_iter().flatten() {
            for target in self.graph.neighbors_directed(index, Direction::Outgoing) {
                let target_stack = &self.graph[target].id.stack;
                if target_stack != stack {
                    deps.insert(target_stack.clone());
                }
            }
        }
        deps.into_iter().collect()
    }

    /// Resources of `stack` referenced from any other stack, in insertion order
    #[must_use]
    pub fn cross_stack_exports(&self, stack: &StackId) -> Vec<&Resource> {
        let mut exported = BTreeSet::new();
        for edge in self.graph.edge_references() {
            let source_stack = &self.graph[edge.source()].id.stack;
            let target_stack = &self.graph[edge.target()].id.stack;
            if target_stack == stack && source_stack != stack {
                exported.insert(edge.target());
            }
        }
        exported.into_iter().map(|index| &self.graph[index]).collect()
    }
}
