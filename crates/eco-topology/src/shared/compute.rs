//! Shared container cluster

use crate::error::TopologyError;
use crate::graph::TopologyGraphBuilder;
use crate::shared::networking::SharedNetworking;
use crate::types::{ReferenceKind, ResourceId, ResourceKind, ResourceRef, ResourceSpec, StackId};

/// Construct scope of the shared cluster
pub const COMPUTE_SCOPE: &str = "CommonCompute";

/// Handle to the shared cluster
#[derive(Debug, Clone)]
pub struct SharedCompute {
    pub cluster: ResourceRef,
}

pub(crate) fn build_compute(
    net: &SharedNetworking,
    graph: &mut TopologyGraphBuilder,
) -> Result<SharedCompute, TopologyError> {
    let cluster = graph.add(
        ResourceSpec::new(
            ResourceId::new(StackId::Shared, COMPUTE_SCOPE, "AppECSCluster"),
            ResourceKind::EcsCluster,
        )
        .reference("vpc", &net.vpc, ReferenceKind::InVpc)
        .property("enable_fargate_capacity_providers", true),
    )?;
    Ok(SharedCompute { cluster })
}
