//! Network configuration
//!
//! Supplied once at build time and read-only thereafter.

use crate::error::{ConfigSubject, ConfigValidationError};
use crate::naming::is_valid_domain_name;
use crate::net::{block_size, parse_ipv4_cidr, Ipv4Network};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Task port used when the document does not name one
pub const DEFAULT_ECS_TASK_PORT: u16 = 8000;

/// Shortest VPC prefix (largest VPC) the provider accepts
pub const MIN_VPC_PREFIX: u8 = 16;

/// Longest VPC prefix (smallest VPC) that still holds the subnet layout:
/// two availability zones of a /24 web, a /24 core and a /28 database subnet
pub const MAX_VPC_PREFIX: u8 = 21;

/// Network document as it appears on disk
///
/// Every field is optional here so that a missing field is reported by
/// name during validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawNetworkConfig {
    /// VPC address range, e.g. `10.0.0.0/16`
    pub vpc_cidr: Option<String>,
    /// Hosted zone name; tenants live at `{tenant}.{domain_name}`
    pub domain_name: Option<String>,
    /// Client range allowed to reach the load balancer
    #[serde(alias = "inbound_cidr")]
    pub inbound_vpn_traffic_cidr: Option<String>,
    /// Port the tenant containers listen on (default 8000)
    pub ecs_task_port: Option<i64>,
    /// Port of the shared database
    #[serde(alias = "db_port")]
    pub rds_port: Option<i64>,
    /// Interface addresses of the object-storage VPC endpoint
    #[serde(alias = "endpoint_ip_list")]
    pub s3_vpc_endpoint_ips: Option<Vec<String>>,
    /// Identifier of the object-storage VPC endpoint, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_vpc_endpoint_id: Option<String>,
    /// Expose the load balancer outside the VPC (default false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internet_facing: Option<bool>,
}

/// Validated, immutable network configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    vpc_cidr: Ipv4Network,
    domain_name: String,
    inbound_cidr: Ipv4Network,
    ecs_task_port: u16,
    db_port: u16,
    endpoint_ips: Vec<Ipv4Addr>,
    s3_vpc_endpoint_id: Option<String>,
    internet_facing: bool,
}

impl NetworkConfig {
    /// VPC address range
    #[inline]
    #[must_use]
    pub fn vpc_cidr(&self) -> Ipv4Network {
        self.vpc_cidr
    }

    /// Hosted zone name (lower-case)
    #[inline]
    #[must_use]
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    /// Client range allowed to reach the load balancer
    #[inline]
    #[must_use]
    pub fn inbound_cidr(&self) -> Ipv4Network {
        self.inbound_cidr
    }

    /// Container port
    #[inline]
    #[must_use]
    pub fn ecs_task_port(&self) -> u16 {
        self.ecs_task_port
    }

    /// Database port
    #[inline]
    #[must_use]
    pub fn db_port(&self) -> u16 {
        self.db_port
    }

    /// Object-storage endpoint addresses, deduplicated, in document order
    #[inline]
    #[must_use]
    pub fn endpoint_ips(&self) -> &[Ipv4Addr] {
        &self.endpoint_ips
    }

    /// Object-storage endpoint identifier
    #[inline]
    #[must_use]
    pub fn s3_vpc_endpoint_id(&self) -> Option<&str> {
        self.s3_vpc_endpoint_id.as_deref()
    }

    /// Whether the load balancer is internet facing
    #[inline]
    #[must_use]
    pub fn internet_facing(&self) -> bool {
        self.internet_facing
    }
}

impl TryFrom<RawNetworkConfig> for NetworkConfig {
    type Error = ConfigValidationError;

    fn try_from(raw: RawNetworkConfig) -> Result<Self, Self::Error> {
        let vpc_cidr = parse_cidr(required(raw.vpc_cidr, "vpc_cidr")?, "vpc_cidr")?;
        if !(MIN_VPC_PREFIX..=MAX_VPC_PREFIX).contains(&vpc_cidr.prefix()) {
            return Err(ConfigValidationError::network(
                "vpc_cidr",
                format!(
                    "prefix /{} ({} addresses) must be between /{MIN_VPC_PREFIX} and /{MAX_VPC_PREFIX}",
                    vpc_cidr.prefix(),
                    block_size(vpc_cidr.prefix())
                ),
            ));
        }

        let domain_name = required(raw.domain_name, "domain_name")?
            .trim()
            .to_ascii_lowercase();
        if !is_valid_domain_name(&domain_name) {
            return Err(ConfigValidationError::network(
                "domain_name",
                format!("'{domain_name}' is not a valid domain name"),
            ));
        }

        let inbound_cidr = parse_cidr(
            required(raw.inbound_vpn_traffic_cidr, "inbound_vpn_traffic_cidr")?,
            "inbound_vpn_traffic_cidr",
        )?;

        let ecs_task_port = match raw.ecs_task_port {
            Some(port) => parse_port(port, "ecs_task_port")?,
            None => DEFAULT_ECS_TASK_PORT,
        };
        let db_port = parse_port(required(raw.rds_port, "rds_port")?, "rds_port")?;
        if ecs_task_port == db_port {
            return Err(ConfigValidationError::network(
                "rds_port",
                format!("must differ from ecs_task_port ({ecs_task_port})"),
            ));
        }

        let raw_ips = required(raw.s3_vpc_endpoint_ips, "s3_vpc_endpoint_ips")?;
        if raw_ips.is_empty() {
            return Err(ConfigValidationError::network(
                "s3_vpc_endpoint_ips",
                "must list at least one address",
            ));
        }
        let mut seen = BTreeSet::new();
        let mut endpoint_ips = Vec::with_capacity(raw_ips.len());
        for ip in &raw_ips {
            let addr: Ipv4Addr = ip.trim().parse().map_err(|_| {
                ConfigValidationError::network(
                    "s3_vpc_endpoint_ips",
                    format!("'{ip}' is not an IPv4 address"),
                )
            })?;
            if !vpc_cidr.contains(addr) {
                return Err(ConfigValidationError::network(
                    "s3_vpc_endpoint_ips",
                    format!("{addr} is outside {vpc_cidr}"),
                ));
            }
            if seen.insert(addr) {
                endpoint_ips.push(addr);
            } else {
                tracing::warn!("Duplicate endpoint address {} collapsed", addr);
            }
        }

        let s3_vpc_endpoint_id = match raw.s3_vpc_endpoint_id {
            Some(id) if id.trim().is_empty() => {
                return Err(ConfigValidationError::network(
                    "s3_vpc_endpoint_id",
                    "must not be blank",
                ))
            }
            other => other.map(|id| id.trim().to_string()),
        };

        Ok(Self {
            vpc_cidr,
            domain_name,
            inbound_cidr,
            ecs_task_port,
            db_port,
            endpoint_ips,
            s3_vpc_endpoint_id,
            internet_facing: raw.internet_facing.unwrap_or(false),
        })
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ConfigValidationError> {
    value.ok_or_else(|| ConfigValidationError::missing(ConfigSubject::Network, field))
}

fn parse_cidr(value: String, field: &'static str) -> Result<Ipv4Network, ConfigValidationError> {
    parse_ipv4_cidr(&value).map_err(|e| ConfigValidationError::network(field, e.to_string()))
}

fn parse_port(value: i64, field: &'static str) -> Result<u16, ConfigValidationError> {
    match u16::try_from(value) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigValidationError::network(
            field,
            format!("{value} is not a port in 1..=65535"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawNetworkConfig {
        RawNetworkConfig {
            vpc_cidr: Some("10.0.0.0/16".into()),
            domain_name: Some("App-Ecosystem.Example.com".into()),
            inbound_vpn_traffic_cidr: Some("172.16.0.0/12".into()),
            ecs_task_port: None,
            rds_port: Some(5432),
            s3_vpc_endpoint_ips: Some(vec!["10.0.1.10".into(), "10.0.2.10".into()]),
            s3_vpc_endpoint_id: None,
            internet_facing: None,
        }
    }

    #[test]
    fn defaults_and_normalization() {
        let cfg = NetworkConfig::try_from(raw()).unwrap();
        assert_eq!(cfg.ecs_task_port(), DEFAULT_ECS_TASK_PORT);
        assert_eq!(cfg.db_port(), 5432);
        assert_eq!(cfg.domain_name(), "app-ecosystem.example.com");
        assert!(!cfg.internet_facing());
        assert_eq!(cfg.endpoint_ips().len(), 2);
    }

    #[test]
    fn missing_field_is_named() {
        let mut r = raw();
        r.rds_port = None;
        let err = NetworkConfig::try_from(r).unwrap_err();
        assert_eq!(err.field, "rds_port");
        assert_eq!(err.subject, ConfigSubject::Network);
    }

    #[test]
    fn rejects_out_of_range_port() {
        let mut r = raw();
        r.ecs_task_port = Some(70_000);
        assert_eq!(NetworkConfig::try_from(r).unwrap_err().field, "ecs_task_port");

        let mut r = raw();
        r.rds_port = Some(0);
        assert_eq!(NetworkConfig::try_from(r).unwrap_err().field, "rds_port");
    }

    #[test]
    fn rejects_port_clash() {
        let mut r = raw();
        r.ecs_task_port = Some(5432);
        assert_eq!(NetworkConfig::try_from(r).unwrap_err().field, "rds_port");
    }

    #[test]
    fn rejects_tiny_vpc() {
        let mut r = raw();
        r.vpc_cidr = Some("10.0.0.0/30".into());
        assert_eq!(NetworkConfig::try_from(r).unwrap_err().field, "vpc_cidr");
    }

    #[test]
    fn vpc_must_hold_the_subnet_layout() {
        let mut r = raw();
        r.vpc_cidr = Some("10.0.0.0/28".into());
        r.s3_vpc_endpoint_ips = Some(vec!["10.0.0.10".into()]);
        assert_eq!(NetworkConfig::try_from(r).unwrap_err().field, "vpc_cidr");

        let mut r = raw();
        r.vpc_cidr = Some("10.0.0.0/22".into());
        r.s3_vpc_endpoint_ips = Some(vec!["10.0.1.10".into()]);
        let err = NetworkConfig::try_from(r).unwrap_err();
        assert_eq!(err.field, "vpc_cidr");
        assert!(err.reason.contains("1024 addresses"));

        let mut r = raw();
        r.vpc_cidr = Some("10.0.0.0/21".into());
        r.s3_vpc_endpoint_ips = Some(vec!["10.0.1.10".into()]);
        assert_eq!(NetworkConfig::try_from(r).unwrap().vpc_cidr().prefix(), MAX_VPC_PREFIX);
    }

    #[test]
    fn rejects_host_bits_in_cidr() {
        let mut r = raw();
        r.inbound_vpn_traffic_cidr = Some("172.16.0.1/12".into());
        let err = NetworkConfig::try_from(r).unwrap_err();
        assert_eq!(err.field, "inbound_vpn_traffic_cidr");
        assert!(err.reason.contains("host bits"));
    }

    #[test]
    fn rejects_empty_or_bad_endpoints() {
        let mut r = raw();
        r.s3_vpc_endpoint_ips = Some(vec![]);
        assert_eq!(NetworkConfig::try_from(r).unwrap_err().field, "s3_vpc_endpoint_ips");

        let mut r = raw();
        r.s3_vpc_endpoint_ips = Some(vec!["10.0.1.300".into()]);
        assert_eq!(NetworkConfig::try_from(r).unwrap_err().field, "s3_vpc_endpoint_ips");

        let mut r = raw();
        r.s3_vpc_endpoint_ips = Some(vec!["192.168.1.10".into()]);
        let err = NetworkConfig::try_from(r).unwrap_err();
        assert_eq!(err.field, "s3_vpc_endpoint_ips");
        assert!(err.to_string().contains("outside 10.0.0.0/16"));
    }

    #[test]
    fn collapses_duplicate_endpoints() {
        let mut r = raw();
        r.s3_vpc_endpoint_ips = Some(vec!["10.0.1.10".into(), "10.0.1.10".into()]);
        let cfg = NetworkConfig::try_from(r).unwrap();
        assert_eq!(cfg.endpoint_ips(), &[Ipv4Addr::new(10, 0, 1, 10)]);
    }

    #[test]
    fn rejects_bad_domain() {
        let mut r = raw();
        r.domain_name = Some("not_a_domain".into());
        assert_eq!(NetworkConfig::try_from(r).unwrap_err().field, "domain_name");
    }
}
