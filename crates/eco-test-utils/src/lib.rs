//! Testing utilities for the app ecosystem workspace
//!
//! Shared fixtures: a network config, tenant configs and one-call assembly.

#![allow(missing_docs)]

use eco_config::{NetworkConfig, RawNetworkConfig, RawTenantConfig, TenantConfig};
use eco_topology::{AssemblyOptions, Topology, TopologyAssembler, TopologyError};

pub const TEST_DOMAIN: &str = "app-ecosystem.example.com";

pub fn raw_network_config() -> RawNetworkConfig {
    RawNetworkConfig {
        vpc_cidr: Some("10.0.0.0/16".to_string()),
        domain_name: Some(TEST_DOMAIN.to_string()),
        inbound_vpn_traffic_cidr: Some("172.16.0.0/12".to_string()),
        ecs_task_port: Some(8000),
        rds_port: Some(5432),
        s3_vpc_endpoint_ips: Some(vec!["10.0.1.10".to_string(), "10.0.2.10".to_string()]),
        s3_vpc_endpoint_id: None,
        internet_facing: None,
    }
}

pub fn network_config() -> NetworkConfig {
    NetworkConfig::try_from(raw_network_config()).unwrap()
}

pub fn network_config_with_endpoint(endpoint_id: &str) -> NetworkConfig {
    NetworkConfig::try_from(RawNetworkConfig {
        s3_vpc_endpoint_id: Some(endpoint_id.to_string()),
        ..raw_network_config()
    })
    .unwrap()
}

pub fn raw_tenant(name: &str, band: i64) -> RawTenantConfig {
    RawTenantConfig {
        name: Some(name.to_string()),
        container_image: Some(format!("ghcr.io/example/{}:1.0", name.to_ascii_lowercase())),
        total_task_cpu: Some(512),
        total_task_memory: Some(1024),
        alb_priority_band: Some(band),
    }
}

pub fn tenant(name: &str, band: i64) -> TenantConfig {
    TenantConfig::from_raw(raw_tenant(name, band), 0).unwrap()
}

/// Tenants named by the first element, banded by the second
pub fn tenants(specs: &[(&str, i64)]) -> Vec<TenantConfig> {
    specs.iter().map(|&(name, band)| tenant(name, band)).collect()
}

pub fn try_assemble(tenants: &[TenantConfig]) -> Result<Topology, TopologyError> {
    TopologyAssembler::default().assemble(&network_config(), tenants)
}

pub fn try_assemble_with(
    options: AssemblyOptions,
    tenants: &[TenantConfig],
) -> Result<Topology, TopologyError> {
    TopologyAssembler::new(options)?.assemble(&network_config(), tenants)
}

pub fn assemble(specs: &[(&str, i64)]) -> Topology {
    try_assemble(&tenants(specs)).unwrap()
}

/// `(api, static)` priorities of one tenant
pub fn priorities_of(topology: &Topology, name: &str) -> (u32, u32) {
    let tenant = topology.tenant(name).unwrap();
    (
        tenant.routing.api_rule.priority,
        tenant.routing.static_rule.priority,
    )
}
