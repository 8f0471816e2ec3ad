//! Per-Tenant Router
//!
//! Attaches one tenant to the shared HTTPS listener: a DNS record aliasing
//! the tenant host to the load balancer, a target group for the tenant
//! service, and two rules in the tenant's priority band.
//!
//! | Rule   | Conditions             | Action                          |
//! |--------|------------------------|---------------------------------|
//! | API    | host + path `/api/*`   | authenticate, forward to service |
//! | Static | host                   | authenticate, forward to bucket endpoint |
//!
//! The API rule is allocated first so it lands one priority ahead of the
//! catch-all static rule; the listener evaluates rules in ascending order.

use crate::allocator::PriorityBandAllocator;
use crate::error::TopologyError;
use crate::graph::TopologyGraphBuilder;
use crate::listener::{ListenerAction, RuleCondition, SESSION_TIMEOUT_SECS};
use crate::shared::SharedTopologyHandle;
use crate::tenant::{tenant_id, TenantResources};
use crate::types::{ReferenceKind, ResourceKind, ResourceRef, ResourceSpec};
use eco_config::TenantConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const SCOPE: &str = "AppNetworking";

/// Path served by the tenant service
pub const API_PATH_PATTERN: &str = "/api/*";

/// Which of the two tenant rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Api,
    Static,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Static => write!(f, "static"),
        }
    }
}

/// One prioritised listener rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub resource: ResourceRef,
    pub kind: RuleKind,
    pub priority: u32,
    pub conditions: Vec<RuleCondition>,
    pub action: ListenerAction,
}

impl RoutingRule {
    /// Host header this rule matches
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.conditions.iter().find_map(|condition| match condition {
            RuleCondition::HostHeader(host) => Some(host.as_str()),
            RuleCondition::PathPattern(_) => None,
        })
    }

    /// Path pattern this rule matches, if restricted
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.conditions.iter().find_map(|condition| match condition {
            RuleCondition::PathPattern(path) => Some(path.as_str()),
            RuleCondition::HostHeader(_) => None,
        })
    }
}

/// Routing resources of one tenant
#[derive(Debug, Clone)]
pub struct TenantRouting {
    pub record: ResourceRef,
    pub target_group: ResourceRef,
    pub api_rule: RoutingRule,
    pub static_rule: RoutingRule,
}

impl TenantRouting {
    /// Both rules, API first
    #[must_use]
    pub fn rules(&self) -> [&RoutingRule; 2] {
        [&self.api_rule, &self.static_rule]
    }
}

/// Wires tenants into the shared listener
#[derive(Debug, Clone, Copy)]
pub struct TenantRouter<'a> {
    shared: &'a SharedTopologyHandle,
}

impl<'a> TenantRouter<'a> {
    #[must_use]
    pub fn new(shared: &'a SharedTopologyHandle) -> Self {
        Self { shared }
    }

    /// Route one tenant
    ///
    /// Calls `allocator.next_priority` exactly twice, API rule first.
    pub fn route(
        &self,
        tenant: &TenantConfig,
        resources: &TenantResources,
        allocator: &mut PriorityBandAllocator,
        graph: &mut TopologyGraphBuilder,
    ) -> Result<TenantRouting, TopologyError> {
        let net = &self.shared.networking;
        let prefix = tenant.resource_prefix();
        let host = tenant.host_name(self.shared.zone_name());

        let record = graph.add(
            ResourceSpec::new(tenant_id(tenant, SCOPE, "Record"), ResourceKind::DnsRecord)
                .reference("zone", &net.hosted_zone, ReferenceKind::Zone)
                .property("record_name", host.as_str())
                .property("record_type", "A")
                .property("alias_target", net.load_balancer.to_ref())
                .depends_on(&net.load_balancer, ReferenceKind::LoadBalancer),
        )?;

        let target_group = graph.add(
            ResourceSpec::new(
                tenant_id(tenant, SCOPE, "ECSTargetGroup"),
                ResourceKind::TargetGroup,
            )
            .reference("vpc", &net.vpc, ReferenceKind::InVpc)
            .property("port", net.task_port)
            .property("protocol", "HTTP")
            .property("target_type", "ip")
            .property("targets", vec![resources.compute.service.to_ref()])
            .depends_on(&resources.compute.service, ReferenceKind::Target),
        )?;

        let authenticate = |next: ListenerAction| ListenerAction::AuthenticateCognito {
            user_pool: resources.auth.user_pool.clone(),
            user_pool_client: resources.auth.client.clone(),
            user_pool_domain: resources.auth.domain.clone(),
            session_cookie_name: format!("{prefix}AWSELBAuthSessionCookie"),
            session_timeout_secs: SESSION_TIMEOUT_SECS,
            next: Box::new(next),
        };

        let api_priority = allocator.next_priority(tenant.priority_band())?;
        let api_rule = self.add_rule(
            graph,
            tenant,
            resources,
            "ECSListenerRule",
            RuleKind::Api,
            api_priority,
            vec![
                RuleCondition::HostHeader(host.clone()),
                RuleCondition::PathPattern(API_PATH_PATTERN.to_string()),
            ],
            authenticate(ListenerAction::Forward {
                target_group: target_group.clone(),
            }),
        )?;

        let static_priority = allocator.next_priority(tenant.priority_band())?;
        let static_rule = self.add_rule(
            graph,
            tenant,
            resources,
            "S3ListenerRule",
            RuleKind::Static,
            static_priority,
            vec![RuleCondition::HostHeader(host.clone())],
            authenticate(ListenerAction::Forward {
                target_group: net.static_target_group.clone(),
            }),
        )?;

        tracing::info!(
            "Routed '{}' at {}: api={} static={}",
            tenant.name(),
            host,
            api_priority,
            static_priority
        );
        Ok(TenantRouting {
            record,
            target_group,
            api_rule,
            static_rule,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn add_rule(
        &self,
        graph: &mut TopologyGraphBuilder,
        tenant: &TenantConfig,
        resources: &TenantResources,
        name: &str,
        kind: RuleKind,
        priority: u32,
        conditions: Vec<RuleCondition>,
        action: ListenerAction,
    ) -> Result<RoutingRule, TopologyError> {
        let mut spec = ResourceSpec::new(tenant_id(tenant, SCOPE, name), ResourceKind::ListenerRule)
            .reference(
                "listener",
                &self.shared.networking.https_listener,
                ReferenceKind::Listener,
            )
            .property("priority", priority)
            .property(
                "conditions",
                conditions.iter().map(RuleCondition::to_value).collect::<Vec<Value>>(),
            )
            .property("actions", action.to_actions())
            .depends_on(&resources.auth.user_pool, ReferenceKind::AuthUserPool)
            .depends_on(&resources.auth.client, ReferenceKind::AuthClient)
            .depends_on(&resources.auth.domain, ReferenceKind::AuthDomain);
        if let Some(target) = action.forward_target() {
            spec = spec.depends_on(target, ReferenceKind::TargetGroup);
        }
        if kind == RuleKind::Static {
            spec = spec.depends_on(&resources.storage.bucket, ReferenceKind::Bucket);
        }
        let resource = graph.add(spec)?;

        tracing::debug!(
            "Rule {} for '{}': priority {} [{}]",
            kind,
            tenant.name(),
            priority,
            conditions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(RoutingRule {
            resource,
            kind,
            priority,
            conditions,
            action,
        })
    }
}

/// Row of the routing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub tenant: String,
    pub rule: RuleKind,
    pub priority: u32,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub authenticated: bool,
}

impl RouteEntry {
    pub(crate) fn from_rule(tenant: &str, rule: &RoutingRule) -> Self {
        Self {
            tenant: tenant.to_string(),
            rule: rule.kind,
            priority: rule.priority,
            host: rule.host().unwrap_or_default().to_string(),
            path: rule.path().map(str::to_string),
            authenticated: rule.action.is_authenticated(),
        }
    }
}
