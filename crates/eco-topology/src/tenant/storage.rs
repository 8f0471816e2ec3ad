//! Per-tenant static asset bucket
//!
//! The bucket name must equal the tenant host name: the load balancer
//! forwards static traffic to the object-storage endpoint with the original
//! `Host` header, and the endpoint resolves the bucket from it.

use crate::error::TopologyError;
use crate::graph::TopologyGraphBuilder;
use crate::shared::SharedTopologyHandle;
use crate::tenant::tenant_id;
use crate::types::{ReferenceKind, ResourceKind, ResourceRef, ResourceSpec};
use eco_config::naming::{is_valid_bucket_name, MAX_BUCKET_NAME_LEN, MIN_BUCKET_NAME_LEN};
use eco_config::{ConfigValidationError, TenantConfig};
use serde_json::{json, Value};

const SCOPE: &str = "AppStorage";

/// Handles to one tenant's bucket and its access policy
#[derive(Debug, Clone)]
pub struct TenantStorage {
    pub bucket: ResourceRef,
    pub policy: ResourceRef,
    pub bucket_name: String,
}

/// Check a host name can be used verbatim as a bucket name
pub fn validate_bucket_name(tenant: &TenantConfig, name: &str) -> Result<(), ConfigValidationError> {
    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&name.len()) {
        return Err(ConfigValidationError::tenant(
            tenant.name(),
            "name",
            format!(
                "bucket name '{name}' must be {MIN_BUCKET_NAME_LEN} to {MAX_BUCKET_NAME_LEN} characters, got {}",
                name.len()
            ),
        ));
    }
    if !is_valid_bucket_name(name) {
        return Err(ConfigValidationError::tenant(
            tenant.name(),
            "name",
            format!("bucket name '{name}' is not a valid bucket name"),
        ));
    }
    Ok(())
}

fn access_condition(shared: &SharedTopologyHandle) -> Value {
    match &shared.networking.s3_vpc_endpoint_id {
        Some(endpoint) => json!({ "StringEquals": { "aws:SourceVpce": endpoint } }),
        None => json!({ "StringEquals": { "aws:SourceVpc": shared.networking.vpc.to_ref() } }),
    }
}

pub(crate) fn build_storage(
    tenant: &TenantConfig,
    host: &str,
    shared: &SharedTopologyHandle,
    graph: &mut TopologyGraphBuilder,
) -> Result<TenantStorage, TopologyError> {
    let bucket_name = host.to_string();

    let bucket = graph.add(
        ResourceSpec::new(
            tenant_id(tenant, SCOPE, "StaticAssetsBucket"),
            ResourceKind::Bucket,
        )
        .property("bucket_name", bucket_name.as_str())
        .property("block_public_access", "BLOCK_ALL")
        .property("encryption", "S3_MANAGED")
        .property("removal_policy", "DESTROY")
        .property("auto_delete_objects", true),
    )?;

    let arn = format!("arn:aws:s3:::{bucket_name}");
    let mut policy_spec = ResourceSpec::new(
        tenant_id(tenant, SCOPE, "StaticAssetsBucketPolicy"),
        ResourceKind::BucketPolicy,
    )
    .reference("bucket", &bucket, ReferenceKind::Bucket)
    .property(
        "policy_document",
        json!({
            "version": "2012-10-17",
            "statement": [{
                "effect": "Allow",
                "principal": "*",
                "action": "s3:GetObject",
                "resource": [arn.clone(), format!("{arn}/*")],
                "condition": access_condition(shared),
            }],
        }),
    );
    if shared.networking.s3_vpc_endpoint_id.is_none() {
        policy_spec = policy_spec.depends_on(&shared.networking.vpc, ReferenceKind::InVpc);
    }
    let policy = graph.add(policy_spec)?;

    Ok(TenantStorage {
        bucket,
        policy,
        bucket_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_config::RawTenantConfig;

    fn tenant(name: &str) -> TenantConfig {
        TenantConfig::from_raw(
            RawTenantConfig {
                name: Some(name.into()),
                container_image: Some("nginx:latest".into()),
                total_task_cpu: Some(256),
                total_task_memory: Some(512),
                alb_priority_band: Some(100),
            },
            0,
        )
        .unwrap()
    }

    #[test]
    fn host_names_within_limits_are_accepted() {
        let t = tenant("alpha");
        assert!(validate_bucket_name(&t, "alpha.apps.example.com").is_ok());
    }

    #[test]
    fn long_host_names_are_rejected() {
        let t = tenant("alpha");
        let host = format!("alpha.{}.example.com", "x".repeat(60));
        let err = validate_bucket_name(&t, &host).unwrap_err();
        assert_eq!(err.field, "name");
        assert!(err.reason.contains("must be 3 to 63 characters"));
    }

    #[test]
    fn malformed_names_are_rejected() {
        let t = tenant("alpha");
        assert!(validate_bucket_name(&t, "alpha..example.com").is_err());
        assert!(validate_bucket_name(&t, "Alpha.example.com").is_err());
        assert!(validate_bucket_name(&t, "alpha.example.com-").is_err());
    }
}
