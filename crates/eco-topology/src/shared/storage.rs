//! Shared relational database and its credentials

use crate::error::TopologyError;
use crate::graph::TopologyGraphBuilder;
use crate::shared::networking::{SharedNetworking, SubnetTier};
use crate::types::{ReferenceKind, ResourceId, ResourceKind, ResourceRef, ResourceSpec, StackId};
use eco_config::NetworkConfig;
use serde_json::json;

/// Construct scope of the shared database
pub const STORAGE_SCOPE: &str = "CommonStorage";

/// Database user created in the credential secret
pub const DATABASE_USER: &str = "appuser";

/// Default database name
pub const DATABASE_NAME: &str = "appdb";

const ENGINE: &str = "aurora-postgresql";
const ENGINE_VERSION: &str = "17.5";

/// Handles to the shared database
#[derive(Debug, Clone)]
pub struct SharedStorage {
    pub credentials: ResourceRef,
    pub cluster: ResourceRef,
    pub writer: ResourceRef,
}

fn id(name: &str) -> ResourceId {
    ResourceId::new(StackId::Shared, STORAGE_SCOPE, name)
}

pub(crate) fn build_storage(
    network: &NetworkConfig,
    net: &SharedNetworking,
    graph: &mut TopologyGraphBuilder,
) -> Result<SharedStorage, TopologyError> {
    let credentials = graph.add(
        ResourceSpec::new(id("AppDatabaseCredentials"), ResourceKind::DatabaseSecret)
            .property("description", "Credentials for the shared application database")
            .property(
                "generate_secret_string",
                json!({
                    "secret_string_template": { "username": DATABASE_USER },
                    "generate_string_key": "password",
                    "exclude_punctuation": true,
                }),
            ),
    )?;

    let cluster = graph.add(
        ResourceSpec::new(id("AppDatabaseCluster"), ResourceKind::DatabaseCluster)
            .property("engine", ENGINE)
            .property("engine_version", ENGINE_VERSION)
            .property("default_database_name", DATABASE_NAME)
            .property("port", network.db_port())
            .reference("credentials", &credentials, ReferenceKind::Secret)
            .reference("vpc", &net.vpc, ReferenceKind::InVpc)
            .property("vpc_subnets", SubnetTier::Db.selection(&net.vpc))
            .property("security_groups", vec![net.db_security_group.to_ref()])
            .depends_on(&net.db_security_group, ReferenceKind::SecurityGroup)
            .property("serverless_v2_min_capacity", 0)
            .property("serverless_v2_max_capacity", 2)
            .property("serverless_v2_auto_pause_seconds", 300)
            .property("storage_encrypted", true),
    )?;

    let writer = graph.add(
        ResourceSpec::new(id("AppDatabaseWriter"), ResourceKind::DatabaseInstance)
            .reference("cluster", &cluster, ReferenceKind::Cluster)
            .property("instance_class", "db.serverless")
            .property("publicly_accessible", false),
    )?;

    tracing::info!(
        "Shared database ready: {} {} on port {}",
        ENGINE,
        ENGINE_VERSION,
        network.db_port()
    );

    Ok(SharedStorage {
        credentials,
        cluster,
        writer,
    })
}
