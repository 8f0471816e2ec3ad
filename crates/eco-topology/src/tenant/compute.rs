//! Per-tenant Fargate service

use crate::error::TopologyError;
use crate::graph::TopologyGraphBuilder;
use crate::shared::{SharedTopologyHandle, SubnetTier};
use crate::tenant::tenant_id;
use crate::types::{ReferenceKind, ResourceKind, ResourceRef, ResourceSpec};
use eco_config::TenantConfig;
use serde_json::json;

const SCOPE: &str = "AppCompute";

/// Environment name under which the database secret is exposed
pub const DB_SECRET_ENV: &str = "DB_CREDS";

/// Handles to one tenant's task definition, container and service
#[derive(Debug, Clone)]
pub struct TenantCompute {
    pub task_definition: ResourceRef,
    pub container: ResourceRef,
    pub service: ResourceRef,
}

pub(crate) fn build_compute(
    tenant: &TenantConfig,
    shared: &SharedTopologyHandle,
    graph: &mut TopologyGraphBuilder,
) -> Result<TenantCompute, TopologyError> {
    let net = &shared.networking;

    let task_definition = graph.add(
        ResourceSpec::new(
            tenant_id(tenant, SCOPE, "ECSTaskDefinition"),
            ResourceKind::TaskDefinition,
        )
        .property("cpu", tenant.task_cpu())
        .property("memory_limit_mib", tenant.task_memory())
        .property("network_mode", "awsvpc")
        .property("requires_compatibilities", vec!["FARGATE"]),
    )?;

    // The secret travels as a reference; its value never enters the graph
    let container = graph.add(
        ResourceSpec::new(
            tenant_id(tenant, SCOPE, "ECSTaskContainer"),
            ResourceKind::ContainerDefinition,
        )
        .reference("task_definition", &task_definition, ReferenceKind::TaskDefinition)
        .property("image", tenant.container_image())
        .property(
            "port_mappings",
            json!([{ "container_port": net.task_port, "protocol": "tcp" }]),
        )
        .property(
            "logging",
            json!({ "driver": "awslogs", "stream_prefix": tenant.dns_label() }),
        )
        .property(
            "secrets",
            json!({ DB_SECRET_ENV: shared.storage.credentials.to_ref() }),
        )
        .depends_on(&shared.storage.credentials, ReferenceKind::Secret),
    )?;

    let service = graph.add(
        ResourceSpec::new(tenant_id(tenant, SCOPE, "ECSService"), ResourceKind::FargateService)
            .reference("cluster", &shared.compute.cluster, ReferenceKind::Cluster)
            .reference("task_definition", &task_definition, ReferenceKind::TaskDefinition)
            .depends_on(&container, ReferenceKind::TaskDefinition)
            .property("vpc_subnets", SubnetTier::Core.selection(&net.vpc))
            .depends_on(&net.vpc, ReferenceKind::InVpc)
            .property("security_groups", vec![net.ecs_security_group.to_ref()])
            .depends_on(&net.ecs_security_group, ReferenceKind::SecurityGroup)
            .property("assign_public_ip", false)
            .property("desired_count", 1)
            .property("min_healthy_percent", 0),
    )?;

    tracing::debug!(
        "Compute for '{}': {} CPU units, {} MiB",
        tenant.name(),
        tenant.task_cpu(),
        tenant.task_memory()
    );
    Ok(TenantCompute {
        task_definition,
        container,
        service,
    })
}
