//! Shared network: VPC, security groups, DNS zone, certificate, load balancer

use crate::error::{GraphError, TopologyError};
use crate::graph::TopologyGraphBuilder;
use crate::listener::ListenerAction;
use crate::types::{ReferenceKind, ResourceId, ResourceKind, ResourceRef, ResourceSpec, StackId};
use eco_config::{Ipv4Network, NetworkConfig};
use serde_json::{json, Value};
use std::fmt;

/// Construct scope of the shared network
pub const NETWORKING_SCOPE: &str = "CommonNetworking";

/// Availability zones the VPC spans
pub const AVAILABILITY_ZONES: u8 = 2;

const HTTPS_PORT: u16 = 443;
const HTTP_PORT: u16 = 80;

/// Subnet tier of the shared VPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubnetTier {
    /// Public, hosts the load balancer
    Web,
    /// Private with egress, hosts tenant services
    Core,
    /// Isolated, hosts the database
    Db,
}

impl SubnetTier {
    /// All tiers in declaration order
    pub const ALL: [SubnetTier; 3] = [Self::Web, Self::Core, Self::Db];

    /// Subnet group name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Web => "Web",
            Self::Core => "Core",
            Self::Db => "DB",
        }
    }

    #[must_use]
    pub fn subnet_type(self) -> &'static str {
        match self {
            Self::Web => "PUBLIC",
            Self::Core => "PRIVATE_WITH_EGRESS",
            Self::Db => "PRIVATE_ISOLATED",
        }
    }

    #[must_use]
    pub fn cidr_mask(self) -> u8 {
        match self {
            Self::Web | Self::Core => 24,
            Self::Db => 28,
        }
    }

    /// Subnet selection property for a resource placed in this tier
    #[must_use]
    pub fn selection(self, vpc: &ResourceRef) -> Value {
        json!({ "vpc": vpc.to_ref(), "subnet_group": self.name() })
    }
}

/// One of the three shared security groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityGroupRole {
    Alb,
    Ecs,
    Db,
}

impl SecurityGroupRole {
    /// Resource name of the group
    #[must_use]
    pub fn resource_name(self) -> &'static str {
        match self {
            Self::Alb => "ALBSecurityGroup",
            Self::Ecs => "ECSSecurityGroup",
            Self::Db => "DatabaseSecurityGroup",
        }
    }

    fn short_name(self) -> &'static str {
        match self {
            Self::Alb => "ALB",
            Self::Ecs => "ECS",
            Self::Db => "Database",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Alb => "Security group for the shared load balancer",
            Self::Ecs => "Security group for tenant ECS tasks",
            Self::Db => "Security group for the shared database",
        }
    }
}

impl fmt::Display for SecurityGroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Rule direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ingress,
    Egress,
}

/// Other side of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Peer {
    Cidr(Ipv4Network),
    Group(SecurityGroupRole),
}

/// A unidirectional, single-port allow rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRule {
    pub name: String,
    pub group: SecurityGroupRole,
    pub direction: Direction,
    pub peer: Peer,
    pub port: u16,
    pub description: String,
}

/// Allow-list between the load balancer, tenant tasks and the database
#[must_use]
pub fn plan_security_rules(network: &NetworkConfig) -> Vec<SecurityRule> {
    use Direction::{Egress, Ingress};
    use SecurityGroupRole::{Alb, Db, Ecs};

    let inbound = network.inbound_cidr();
    let task_port = network.ecs_task_port();
    let db_port = network.db_port();

    let rule = |name: String, group, direction, peer, port, description: &str| SecurityRule {
        name,
        group,
        direction,
        peer,
        port,
        description: description.to_string(),
    };

    let mut rules = vec![
        rule(
            "ALBIngressHttps".into(),
            Alb,
            Ingress,
            Peer::Cidr(inbound),
            HTTPS_PORT,
            "HTTPS from the inbound VPN range",
        ),
        rule(
            "ALBIngressHttp".into(),
            Alb,
            Ingress,
            Peer::Cidr(inbound),
            HTTP_PORT,
            "HTTP from the inbound VPN range",
        ),
    ];
    for (i, ip) in network.endpoint_ips().iter().enumerate() {
        rules.push(rule(
            format!("ALBEgressS3Endpoint{}", i + 1),
            Alb,
            Egress,
            Peer::Cidr(Ipv4Network::from(*ip)),
            HTTPS_PORT,
            "HTTPS to the S3 VPC endpoint",
        ));
    }
    rules.extend([
        rule(
            "ALBEgressECS".into(),
            Alb,
            Egress,
            Peer::Group(Ecs),
            task_port,
            "Load balancer to ECS tasks",
        ),
        rule(
            "ECSIngressALB".into(),
            Ecs,
            Ingress,
            Peer::Group(Alb),
            task_port,
            "ECS tasks from the load balancer",
        ),
        rule(
            "ECSEgressDatabase".into(),
            Ecs,
            Egress,
            Peer::Group(Db),
            db_port,
            "ECS tasks to the database",
        ),
        rule(
            "DatabaseIngressECS".into(),
            Db,
            Ingress,
            Peer::Group(Ecs),
            db_port,
            "Database from ECS tasks",
        ),
    ]);
    rules
}

/// Check that only the ECS group can reach the database
///
/// The database group may have no CIDR ingress and no group ingress other
/// than from ECS, and the load balancer may not send to it.
pub fn verify_db_isolation(rules: &[SecurityRule]) -> Result<(), GraphError> {
    for rule in rules {
        let breach = match (rule.group, rule.direction, rule.peer) {
            (SecurityGroupRole::Db, Direction::Ingress, Peer::Cidr(cidr)) => {
                Some(format!("database accepts traffic from {cidr} ({})", rule.name))
            }
            (SecurityGroupRole::Db, Direction::Ingress, Peer::Group(peer))
                if peer != SecurityGroupRole::Ecs =>
            {
                Some(format!("database accepts traffic from {peer} ({})", rule.name))
            }
            (SecurityGroupRole::Alb, Direction::Egress, Peer::Group(SecurityGroupRole::Db)) => {
                Some(format!("load balancer may reach the database ({})", rule.name))
            }
            _ => None,
        };
        if let Some(reason) = breach {
            return Err(GraphError::IsolationBreach(reason));
        }
    }
    Ok(())
}

/// Handles to the shared network
#[derive(Debug, Clone)]
pub struct SharedNetworking {
    pub vpc: ResourceRef,
    pub alb_security_group: ResourceRef,
    pub ecs_security_group: ResourceRef,
    pub db_security_group: ResourceRef,
    pub hosted_zone: ResourceRef,
    pub certificate: ResourceRef,
    pub load_balancer: ResourceRef,
    pub http_listener: ResourceRef,
    pub https_listener: ResourceRef,
    pub static_target_group: ResourceRef,
    pub security_rules: Vec<SecurityRule>,
    pub zone_name: String,
    pub task_port: u16,
    pub s3_vpc_endpoint_id: Option<String>,
}

impl SharedNetworking {
    /// Handle of one of the shared security groups
    #[must_use]
    pub fn security_group(&self, role: SecurityGroupRole) -> &ResourceRef {
        match role {
            SecurityGroupRole::Alb => &self.alb_security_group,
            SecurityGroupRole::Ecs => &self.ecs_security_group,
            SecurityGroupRole::Db => &self.db_security_group,
        }
    }
}

fn id(name: &str) -> ResourceId {
    ResourceId::new(StackId::Shared, NETWORKING_SCOPE, name)
}

pub(crate) fn build_networking(
    network: &NetworkConfig,
    graph: &mut TopologyGraphBuilder,
) -> Result<SharedNetworking, TopologyError> {
    let rules = plan_security_rules(network);
    verify_db_isolation(&rules)?;

    let subnets: Vec<Value> = SubnetTier::ALL
        .iter()
        .map(|tier| {
            json!({
                "name": tier.name(),
                "subnet_type": tier.subnet_type(),
                "cidr_mask": tier.cidr_mask(),
            })
        })
        .collect();
    let vpc = graph.add(
        ResourceSpec::new(id("Vpc"), ResourceKind::Vpc)
            .property("cidr_block", network.vpc_cidr().to_string())
            .property("max_azs", AVAILABILITY_ZONES)
            .property("nat_gateways", 1)
            .property("restrict_default_security_group", true)
            .property("subnet_configuration", subnets),
    )?;

    let mut group = |role: SecurityGroupRole| {
        graph.add(
            ResourceSpec::new(id(role.resource_name()), ResourceKind::SecurityGroup)
                .reference("vpc", &vpc, ReferenceKind::InVpc)
                .property("description", role.description())
                .property("allow_all_outbound", false),
        )
    };
    let alb_sg = group(SecurityGroupRole::Alb)?;
    let ecs_sg = group(SecurityGroupRole::Ecs)?;
    let db_sg = group(SecurityGroupRole::Db)?;

    for rule in &rules {
        let own = match rule.group {
            SecurityGroupRole::Alb => &alb_sg,
            SecurityGroupRole::Ecs => &ecs_sg,
            SecurityGroupRole::Db => &db_sg,
        };
        let kind = match rule.direction {
            Direction::Ingress => ResourceKind::SecurityGroupIngress,
            Direction::Egress => ResourceKind::SecurityGroupEgress,
        };
        let mut spec = ResourceSpec::new(id(&rule.name), kind)
            .reference("group_id", own, ReferenceKind::SecurityGroup)
            .property("ip_protocol", "tcp")
            .property("from_port", rule.port)
            .property("to_port", rule.port)
            .property("description", rule.description.as_str());
        spec = match (rule.peer, rule.direction) {
            (Peer::Cidr(cidr), _) => spec.property("cidr_ip", cidr.to_string()),
            (Peer::Group(role), direction) => {
                let peer = match role {
                    SecurityGroupRole::Alb => &alb_sg,
                    SecurityGroupRole::Ecs => &ecs_sg,
                    SecurityGroupRole::Db => &db_sg,
                };
                let key = match direction {
                    Direction::Ingress => "source_security_group_id",
                    Direction::Egress => "destination_security_group_id",
                };
                spec.reference(key, peer, ReferenceKind::Peer)
            }
        };
        graph.add(spec)?;
    }

    let zone_name = network.domain_name().to_string();
    let hosted_zone = graph.add(
        ResourceSpec::new(id("HostedZone"), ResourceKind::HostedZone)
            .property("zone_name", zone_name.as_str())
            .property("private", true)
            .reference("vpc", &vpc, ReferenceKind::InVpc),
    )?;
    let certificate = graph.add(
        ResourceSpec::new(id("AcmCertificate"), ResourceKind::Certificate)
            .property("domain_name", zone_name.as_str())
            .property("subject_alternative_names", vec![format!("*.{zone_name}")])
            .property("validation", "DNS")
            .reference("hosted_zone", &hosted_zone, ReferenceKind::Zone),
    )?;

    let internet_facing = network.internet_facing();
    let load_balancer = graph.add(
        ResourceSpec::new(id("InternalALB"), ResourceKind::LoadBalancer)
            .reference("vpc", &vpc, ReferenceKind::InVpc)
            .property("vpc_subnets", SubnetTier::Web.selection(&vpc))
            .property("internet_facing", internet_facing)
            .property(
                "scheme",
                if internet_facing { "internet-facing" } else { "internal" },
            )
            .reference("security_group", &alb_sg, ReferenceKind::SecurityGroup),
    )?;

    let http_listener = graph.add(
        ResourceSpec::new(id("HttpListener"), ResourceKind::Listener)
            .reference("load_balancer", &load_balancer, ReferenceKind::LoadBalancer)
            .property("port", HTTP_PORT)
            .property("protocol", "HTTP")
            .property(
                "default_actions",
                ListenerAction::redirect_to_https(HTTPS_PORT).to_actions(),
            ),
    )?;
    let https_listener = graph.add(
        ResourceSpec::new(id("HttpsListener"), ResourceKind::Listener)
            .reference("load_balancer", &load_balancer, ReferenceKind::LoadBalancer)
            .property("port", HTTPS_PORT)
            .property("protocol", "HTTPS")
            .property("certificates", vec![certificate.to_ref()])
            .depends_on(&certificate, ReferenceKind::Certificate)
            .property(
                "default_actions",
                ListenerAction::fixed_text(503, "Service Unavailable").to_actions(),
            ),
    )?;

    let targets: Vec<Value> = network
        .endpoint_ips()
        .iter()
        .map(|ip| json!({ "id": ip.to_string(), "port": HTTPS_PORT }))
        .collect();
    let static_target_group = graph.add(
        ResourceSpec::new(id("S3VPCEndpointTargetGroup"), ResourceKind::TargetGroup)
            .reference("vpc", &vpc, ReferenceKind::InVpc)
            .property("port", HTTPS_PORT)
            .property("protocol", "HTTPS")
            .property("target_type", "ip")
            .property("targets", targets)
            .property(
                "health_check",
                json!({ "protocol": "HTTPS", "path": "/", "healthy_http_codes": "200,307,405" }),
            ),
    )?;

    tracing::info!(
        "Shared network ready: zone {}, {} security rules, load balancer {}",
        zone_name,
        rules.len(),
        if internet_facing { "internet-facing" } else { "internal" }
    );

    Ok(SharedNetworking {
        vpc,
        alb_security_group: alb_sg,
        ecs_security_group: ecs_sg,
        db_security_group: db_sg,
        hosted_zone,
        certificate,
        load_balancer,
        http_listener,
        https_listener,
        static_target_group,
        security_rules: rules,
        zone_name,
        task_port: network.ecs_task_port(),
        s3_vpc_endpoint_id: network.s3_vpc_endpoint_id().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_config::RawNetworkConfig;

    fn network() -> NetworkConfig {
        NetworkConfig::try_from(RawNetworkConfig {
            vpc_cidr: Some("10.0.0.0/16".into()),
            domain_name: Some("apps.example.com".into()),
            inbound_vpn_traffic_cidr: Some("172.16.0.0/12".into()),
            ecs_task_port: Some(8000),
            rds_port: Some(5432),
            s3_vpc_endpoint_ips: Some(vec!["10.0.1.10".into(), "10.0.2.10".into()]),
            ..RawNetworkConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn subnet_layout_fits_smallest_vpc() {
        let needed: u64 = SubnetTier::ALL
            .iter()
            .map(|tier| u64::from(AVAILABILITY_ZONES) * eco_config::net::block_size(tier.cidr_mask()))
            .sum();
        assert!(needed <= eco_config::net::block_size(eco_config::network::MAX_VPC_PREFIX));
        assert!(needed > eco_config::net::block_size(eco_config::network::MAX_VPC_PREFIX + 1));
    }

    #[test]
    fn planned_rules_keep_database_isolated() {
        let rules = plan_security_rules(&network());
        assert!(verify_db_isolation(&rules).is_ok());

        let db_ingress: Vec<_> = rules
            .iter()
            .filter(|r| r.group == SecurityGroupRole::Db && r.direction == Direction::Ingress)
            .collect();
        assert_eq!(db_ingress.len(), 1);
        assert_eq!(db_ingress[0].peer, Peer::Group(SecurityGroupRole::Ecs));
        assert_eq!(db_ingress[0].port, 5432);
    }

    #[test]
    fn one_egress_rule_per_endpoint_ip() {
        let rules = plan_security_rules(&network());
        let endpoint_rules = rules
            .iter()
            .filter(|r| r.group == SecurityGroupRole::Alb && matches!(r.peer, Peer::Cidr(c) if c.prefix() == 32))
            .count();
        assert_eq!(endpoint_rules, 2);
    }

    #[test]
    fn cidr_ingress_to_database_is_a_breach() {
        let mut rules = plan_security_rules(&network());
        rules.push(SecurityRule {
            name: "DatabaseIngressVpn".into(),
            group: SecurityGroupRole::Db,
            direction: Direction::Ingress,
            peer: Peer::Cidr("172.16.0.0/12".parse().unwrap()),
            port: 5432,
            description: String::new(),
        });
        assert!(matches!(
            verify_db_isolation(&rules),
            Err(GraphError::IsolationBreach(_))
        ));
    }

    #[test]
    fn alb_to_database_is_a_breach() {
        let rules = vec![SecurityRule {
            name: "DatabaseIngressALB".into(),
            group: SecurityGroupRole::Db,
            direction: Direction::Ingress,
            peer: Peer::Group(SecurityGroupRole::Alb),
            port: 5432,
            description: String::new(),
        }];
        let err = verify_db_isolation(&rules).unwrap_err();
        assert!(err.to_string().contains("ALB"));
    }

    #[test]
    fn builds_listeners_with_terminal_defaults() {
        let mut graph = TopologyGraphBuilder::new();
        let net = build_networking(&network(), &mut graph).unwrap();

        let https = graph.resource(&net.https_listener).unwrap();
        assert_eq!(https.properties["default_actions"][0]["status_code"], "503");
        let http = graph.resource(&net.http_listener).unwrap();
        assert_eq!(http.properties["default_actions"][0]["type"], "redirect");

        let lb = graph.resource(&net.load_balancer).unwrap();
        assert_eq!(lb.properties["scheme"], "internal");
        assert_eq!(net.zone_name, "apps.example.com");
        assert_eq!(net.task_port, 8000);
    }
}
