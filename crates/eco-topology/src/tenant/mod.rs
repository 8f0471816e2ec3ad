//! Per-Tenant Topology
//!
//! Each tenant gets its own stack holding an identity provider, a static
//! asset bucket, a Fargate service and its routing. Tenant resources read
//! the shared handle and never reference another tenant.

pub mod auth;
pub mod compute;
pub mod router;
pub mod storage;

pub use auth::TenantAuth;
pub use compute::TenantCompute;
pub use router::{RouteEntry, RoutingRule, RuleKind, TenantRouter, TenantRouting};
pub use storage::{validate_bucket_name, TenantStorage};

use crate::error::TopologyError;
use crate::graph::TopologyGraphBuilder;
use crate::shared::SharedTopologyHandle;
use crate::types::{ResourceId, StackId};
use eco_config::TenantConfig;

/// Identity of a tenant resource: `{P}Stack / {P}{scope} / {P}{name}`
pub(crate) fn tenant_id(tenant: &TenantConfig, scope: &str, name: &str) -> ResourceId {
    let prefix = tenant.resource_prefix();
    ResourceId::new(
        StackId::Tenant(prefix.to_string()),
        format!("{prefix}{scope}"),
        format!("{prefix}{name}"),
    )
}

/// Auth, storage and compute of one tenant
#[derive(Debug, Clone)]
pub struct TenantResources {
    pub auth: TenantAuth,
    pub storage: TenantStorage,
    pub compute: TenantCompute,
}

/// Builds one tenant's resources against the shared handle
#[derive(Debug, Clone, Copy)]
pub struct TenantResourceBuilder<'a> {
    tenant: &'a TenantConfig,
    shared: &'a SharedTopologyHandle,
}

impl<'a> TenantResourceBuilder<'a> {
    #[must_use]
    pub fn new(tenant: &'a TenantConfig, shared: &'a SharedTopologyHandle) -> Self {
        Self { tenant, shared }
    }

    /// Add the tenant's resources to `graph`
    ///
    /// Fails before adding anything when the host name cannot be a bucket
    /// name.
    pub fn build(&self, graph: &mut TopologyGraphBuilder) -> Result<TenantResources, TopologyError> {
        let host = self.tenant.host_name(self.shared.zone_name());
        validate_bucket_name(self.tenant, &host)?;

        let auth = auth::build_auth(self.tenant, &host, graph)?;
        let storage = storage::build_storage(self.tenant, &host, self.shared, graph)?;
        let compute = compute::build_compute(self.tenant, self.shared, graph)?;

        tracing::debug!(
            "Built resources for '{}' in {}",
            self.tenant.name(),
            StackId::Tenant(self.tenant.resource_prefix().to_string())
        );
        Ok(TenantResources {
            auth,
            storage,
            compute,
        })
    }
}

/// Everything built for one tenant
#[derive(Debug, Clone)]
pub struct TenantTopology {
    pub name: String,
    pub dns_label: String,
    pub host: String,
    pub stack: StackId,
    pub resources: TenantResources,
    pub routing: TenantRouting,
}

impl TenantTopology {
    /// Routing table rows, API rule first
    #[must_use]
    pub fn routes(&self) -> Vec<RouteEntry> {
        self.routing
            .rules()
            .into_iter()
            .map(|rule| RouteEntry::from_rule(&self.name, rule))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::PriorityBandAllocator;
    use crate::listener::ListenerAction;
    use crate::shared::SharedTopologyBuilder;
    use eco_config::{NetworkConfig, RawNetworkConfig, RawTenantConfig};

    fn network() -> NetworkConfig {
        NetworkConfig::try_from(RawNetworkConfig {
            vpc_cidr: Some("10.0.0.0/16".into()),
            domain_name: Some("apps.example.com".into()),
            inbound_vpn_traffic_cidr: Some("172.16.0.0/12".into()),
            rds_port: Some(5432),
            s3_vpc_endpoint_ips: Some(vec!["10.0.1.10".into()]),
            ..RawNetworkConfig::default()
        })
        .unwrap()
    }

    fn tenant(name: &str, band: i64) -> TenantConfig {
        TenantConfig::from_raw(
            RawTenantConfig {
                name: Some(name.into()),
                container_image: Some(format!("ghcr.io/example/{name}:1.0")),
                total_task_cpu: Some(512),
                total_task_memory: Some(1024),
                alb_priority_band: Some(band),
            },
            0,
        )
        .unwrap()
    }

    #[test]
    fn tenant_ids_follow_prefix_convention() {
        let id = tenant_id(&tenant("my-app", 100), "AppAuth", "UserPool");
        assert_eq!(id.path(), "My-AppStack/My-AppAppAuth/My-AppUserPool");
    }

    #[test]
    fn build_and_route_one_tenant() {
        let config = network();
        let alpha = tenant("alpha", 100);
        let mut graph = TopologyGraphBuilder::new();
        let mut allocator = PriorityBandAllocator::default();

        let shared = SharedTopologyBuilder::new(&config).build(&mut graph).unwrap();
        let resources = TenantResourceBuilder::new(&alpha, &shared)
            .build(&mut graph)
            .unwrap();
        let routing = TenantRouter::new(&shared)
            .route(&alpha, &resources, &mut allocator, &mut graph)
            .unwrap();

        assert_eq!(resources.storage.bucket_name, "alpha.apps.example.com");
        assert_eq!(resources.auth.domain_prefix, "alpha-auth");
        assert_eq!(routing.api_rule.priority, 100);
        assert_eq!(routing.static_rule.priority, 101);
        assert_eq!(routing.api_rule.path(), Some("/api/*"));
        assert_eq!(routing.static_rule.path(), None);
        assert_eq!(routing.static_rule.host(), Some("alpha.apps.example.com"));

        match &routing.api_rule.action {
            ListenerAction::AuthenticateCognito {
                user_pool,
                session_cookie_name,
                next,
                ..
            } => {
                assert_eq!(user_pool, &resources.auth.user_pool);
                assert_eq!(session_cookie_name, "AlphaAWSELBAuthSessionCookie");
                assert_eq!(next.forward_target(), Some(&routing.target_group));
            }
            other => panic!("expected authenticate action, got {other:?}"),
        }
        assert_eq!(
            routing.static_rule.action.forward_target(),
            Some(&shared.networking.static_target_group)
        );

        let container = graph.resource(&resources.compute.container).unwrap();
        assert_eq!(
            container.properties["secrets"]["DB_CREDS"],
            shared.storage.credentials.to_ref()
        );
        graph.finalize().unwrap();
    }

    #[test]
    fn oversized_host_fails_before_any_resource() {
        let config = NetworkConfig::try_from(RawNetworkConfig {
            vpc_cidr: Some("10.0.0.0/16".into()),
            domain_name: Some(format!("{}.example.com", "z".repeat(50))),
            inbound_vpn_traffic_cidr: Some("172.16.0.0/12".into()),
            rds_port: Some(5432),
            s3_vpc_endpoint_ips: Some(vec!["10.0.1.10".into()]),
            ..RawNetworkConfig::default()
        })
        .unwrap();
        let mut graph = TopologyGraphBuilder::new();
        let shared = SharedTopologyBuilder::new(&config).build(&mut graph).unwrap();
        let before = graph.resource_count();

        let err = TenantResourceBuilder::new(&tenant("alpha", 100), &shared)
            .build(&mut graph)
            .unwrap_err();
        assert_eq!(err.kind(), "config_validation");
        assert_eq!(graph.resource_count(), before);
    }
}
