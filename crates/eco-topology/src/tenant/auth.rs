//! Per-tenant identity provider

use crate::error::TopologyError;
use crate::graph::TopologyGraphBuilder;
use crate::tenant::tenant_id;
use crate::types::{ReferenceKind, ResourceKind, ResourceRef, ResourceSpec};
use eco_config::TenantConfig;
use serde_json::json;

const SCOPE: &str = "AppAuth";

/// Handles to one tenant's user pool, client and hosted login domain
#[derive(Debug, Clone)]
pub struct TenantAuth {
    pub user_pool: ResourceRef,
    pub client: ResourceRef,
    pub domain: ResourceRef,
    pub domain_prefix: String,
}

pub(crate) fn build_auth(
    tenant: &TenantConfig,
    host: &str,
    graph: &mut TopologyGraphBuilder,
) -> Result<TenantAuth, TopologyError> {
    let prefix = tenant.resource_prefix();

    let user_pool = graph.add(
        ResourceSpec::new(tenant_id(tenant, SCOPE, "UserPool"), ResourceKind::UserPool)
            .property("user_pool_name", format!("{prefix}UserPool"))
            .property("self_sign_up_enabled", true)
            .property("sign_in_aliases", json!({ "email": true }))
            .property("auto_verify", json!({ "email": true }))
            .property("removal_policy", "DESTROY"),
    )?;

    let client = graph.add(
        ResourceSpec::new(
            tenant_id(tenant, SCOPE, "UserPoolClient"),
            ResourceKind::UserPoolClient,
        )
        .reference("user_pool", &user_pool, ReferenceKind::AuthUserPool)
        .property("generate_secret", true)
        .property(
            "auth_flows",
            json!({ "user_password": true, "user_srp": true, "admin_user_password": true }),
        )
        .property(
            "o_auth",
            json!({
                "flows": { "authorization_code_grant": true },
                "scopes": ["openid", "email", "profile"],
                "callback_urls": [format!("https://{host}/oauth2/idpresponse")],
            }),
        ),
    )?;

    let domain_prefix = tenant.auth_domain_prefix();
    let domain = graph.add(
        ResourceSpec::new(
            tenant_id(tenant, SCOPE, "UserPoolDomain"),
            ResourceKind::UserPoolDomain,
        )
        .reference("user_pool", &user_pool, ReferenceKind::AuthUserPool)
        .property("cognito_domain_prefix", domain_prefix.as_str()),
    )?;

    tracing::debug!("Auth domain for '{}': {}", tenant.name(), domain_prefix);
    Ok(TenantAuth {
        user_pool,
        client,
        domain,
        domain_prefix,
    })
}
