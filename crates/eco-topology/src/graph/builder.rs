//! Graph Builder
//!
//! The single mutable entry point of the construction phase.

use crate::error::GraphError;
use crate::graph::validated::ValidatedTopology;
use crate::types::{ReferenceKind, Resource, ResourceRef, ResourceSpec, StackId};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Builder for the resource graph
///
/// Usage:
/// ```rust,ignore
/// let mut builder = TopologyGraphBuilder::new();
/// let vpc = builder.add(ResourceSpec::new(vpc_id, ResourceKind::Vpc))?;
/// let sg = builder.add(
///     ResourceSpec::new(sg_id, ResourceKind::SecurityGroup)
///         .reference("vpc", &vpc, ReferenceKind::InVpc),
/// )?;
/// let topology: ValidatedTopology = builder.finalize()?;
/// ```
#[derive(Debug, Default)]
pub struct TopologyGraphBuilder {
    graph: DiGraph<Resource, ReferenceKind>,
    names: HashMap<String, NodeIndex>,
    logical_ids: HashMap<String, NodeIndex>,
}

impl TopologyGraphBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources added so far
    #[inline]
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of references added so far
    #[inline]
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether a resource with this name exists
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Add a resource and its references
    ///
    /// Fails without touching the graph when the name or logical id is taken
    /// or when a dependency handle does not belong to this builder.
    pub fn add(&mut self, spec: ResourceSpec) -> Result<ResourceRef, GraphError> {
        let ResourceSpec {
            id,
            kind,
            properties,
            depends_on,
        } = spec;

        if let Some(&existing) = self.names.get(&id.name) {
            return Err(GraphError::DuplicateName {
                name: id.name.clone(),
                existing: self.graph[existing].id.path(),
                attempted: id.path(),
            });
        }

        let logical_id = id.logical_id();
        if self.logical_ids.contains_key(&logical_id) {
            return Err(GraphError::DuplicateLogicalId(logical_id));
        }

        for (target, _) in &depends_on {
            self.check_handle(target)?;
        }

        let index = self.graph.add_node(Resource {
            id: id.clone(),
            kind,
            logical_id: logical_id.clone(),
            properties,
        });
        for (target, reference) in depends_on {
            self.graph.update_edge(index, target.index, reference);
        }
        self.names.insert(id.name.clone(), index);
        self.logical_ids.insert(logical_id.clone(), index);

        tracing::debug!("Added {} ({})", id, kind.type_name());
        Ok(ResourceRef::new(index, id, logical_id))
    }

    /// Add a reference between two existing resources
    pub fn add_reference(
        &mut self,
        from: &ResourceRef,
        to: &ResourceRef,
        kind: ReferenceKind,
    ) -> Result<(), GraphError> {
        self.check_handle(from)?;
        self.check_handle(to)?;
        if from.index == to.index {
            return Err(GraphError::SelfReference(from.id().path()));
        }
        self.graph.update_edge(from.index, to.index, kind);
        Ok(())
    }

    /// Look up a resource by handle
    #[must_use]
    pub fn resource(&self, handle: &ResourceRef) -> Option<&Resource> {
        self.graph
            .node_weight(handle.index)
            .filter(|resource| resource.id == *handle.id())
    }

    /// Validate the graph and seal it
    ///
    /// Once finalised, the graph cannot be modified.
    pub fn finalize(self) -> Result<ValidatedTopology, GraphError> {
        for edge in self.graph.edge_references() {
            let from = &self.graph[edge.source()];
            let to = &self.graph[edge.target()];

            if edge.source() == edge.target() {
                return Err(GraphError::SelfReference(from.id.path()));
            }
            if !reference_allowed(&from.id.stack, &to.id.stack) {
                return Err(GraphError::CrossStackViolation {
                    from: from.id.path(),
                    to: to.id.path(),
                    from_stack: from.id.stack.name(),
                    to_stack: to.id.stack.name(),
                });
            }
        }

        let mut order = toposort(&self.graph, None)
            .map_err(|cycle| GraphError::CycleDetected(self.graph[cycle.node_id()].id.path()))?;
        // Edges point at dependencies, so the sort lists dependents first
        order.reverse();

        tracing::debug!(
            "Finalised graph: {} resources, {} references",
            self.graph.node_count(),
            self.graph.edge_count()
        );
        Ok(ValidatedTopology::seal(self.graph, self.names, order))
    }

    fn check_handle(&self, handle: &ResourceRef) -> Result<(), GraphError> {
        self.resource(handle)
            .map(|_| ())
            .ok_or_else(|| GraphError::UnknownResource(handle.id().path()))
    }
}

/// Same stack, or tenant into shared
fn reference_allowed(from: &StackId, to: &StackId) -> bool {
    from == to || (from.is_tenant() && *to == StackId::Shared)
}
