//! Shared Topology
//!
//! Built exactly once per run. The handle it returns is read-only: tenant
//! builders reference shared resources through it but never modify them.

pub mod compute;
pub mod networking;
pub mod storage;

pub use compute::SharedCompute;
pub use networking::{
    plan_security_rules, verify_db_isolation, Direction, Peer, SecurityGroupRole, SecurityRule,
    SharedNetworking, SubnetTier,
};
pub use storage::SharedStorage;

use crate::error::TopologyError;
use crate::graph::TopologyGraphBuilder;
use eco_config::NetworkConfig;

/// Everything tenants bind against
#[derive(Debug, Clone)]
pub struct SharedTopologyHandle {
    pub networking: SharedNetworking,
    pub storage: SharedStorage,
    pub compute: SharedCompute,
}

impl SharedTopologyHandle {
    /// Hosted zone name
    #[inline]
    #[must_use]
    pub fn zone_name(&self) -> &str {
        &self.networking.zone_name
    }
}

/// Builds the network, database and cluster shared by all tenants
#[derive(Debug, Clone, Copy)]
pub struct SharedTopologyBuilder<'a> {
    network: &'a NetworkConfig,
}

impl<'a> SharedTopologyBuilder<'a> {
    #[must_use]
    pub fn new(network: &'a NetworkConfig) -> Self {
        Self { network }
    }

    /// Add the shared resources to `graph`
    pub fn build(
        &self,
        graph: &mut TopologyGraphBuilder,
    ) -> Result<SharedTopologyHandle, TopologyError> {
        let networking = networking::build_networking(self.network, graph)?;
        let storage = storage::build_storage(self.network, &networking, graph)?;
        let compute = compute::build_compute(&networking, graph)?;

        tracing::info!(
            "Shared topology built: {} resources",
            graph.resource_count()
        );
        Ok(SharedTopologyHandle {
            networking,
            storage,
            compute,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StackId;
    use eco_config::RawNetworkConfig;

    fn network(endpoint_id: Option<&str>) -> NetworkConfig {
        NetworkConfig::try_from(RawNetworkConfig {
            vpc_cidr: Some("10.0.0.0/16".into()),
            domain_name: Some("apps.example.com".into()),
            inbound_vpn_traffic_cidr: Some("172.16.0.0/12".into()),
            rds_port: Some(5432),
            s3_vpc_endpoint_ips: Some(vec!["10.0.1.10".into()]),
            s3_vpc_endpoint_id: endpoint_id.map(str::to_string),
            ..RawNetworkConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn shared_build_is_self_contained() {
        let config = network(None);
        let mut graph = TopologyGraphBuilder::new();
        let shared = SharedTopologyBuilder::new(&config).build(&mut graph).unwrap();

        assert_eq!(shared.zone_name(), "apps.example.com");
        assert_eq!(shared.networking.task_port, 8000);
        assert!(shared.networking.s3_vpc_endpoint_id.is_none());

        let topology = graph.finalize().unwrap();
        assert!(topology
            .resources()
            .all(|resource| resource.id.stack == StackId::Shared));
        for name in [
            "Vpc",
            "HostedZone",
            "AcmCertificate",
            "InternalALB",
            "HttpListener",
            "HttpsListener",
            "S3VPCEndpointTargetGroup",
            "AppDatabaseCredentials",
            "AppDatabaseCluster",
            "AppDatabaseWriter",
            "AppECSCluster",
        ] {
            assert!(topology.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn database_sits_in_isolated_tier() {
        let config = network(Some("vpce-0abc"));
        let mut graph = TopologyGraphBuilder::new();
        let shared = SharedTopologyBuilder::new(&config).build(&mut graph).unwrap();

        let cluster = graph.resource(&shared.storage.cluster).unwrap();
        assert_eq!(cluster.properties["vpc_subnets"]["subnet_group"], "DB");
        assert_eq!(cluster.properties["port"], 5432);
        assert_eq!(
            cluster.properties["credentials"],
            shared.storage.credentials.to_ref()
        );
        assert_eq!(
            shared.networking.s3_vpc_endpoint_id.as_deref(),
            Some("vpce-0abc")
        );
    }
}
