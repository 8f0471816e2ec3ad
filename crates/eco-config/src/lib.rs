//! App Ecosystem Configuration
//!
//! The trusted boundary between configuration documents and the topology
//! builders.
//!
//! # Core Operations
//!
//! - **Load**: Read a JSON/YAML/TOML document into its raw form
//! - **Validate**: Turn the raw form into an immutable `NetworkConfig` or
//!   `TenantConfig`, failing with `ConfigValidationError`
//! - **Name**: Derive DNS labels, host names and resource prefixes
//!
//! # Example
//!
//! ```rust
//! use eco_config::{ConfigFormat, parse_tenant_configs};
//! use std::path::Path;
//!
//! let doc = r#"{"apps": [{"name": "Alpha", "container_image": "nginx",
//!     "total_task_cpu": 256, "total_task_memory": 512, "alb_priority_band": 100}]}"#;
//! let tenants = parse_tenant_configs(doc, ConfigFormat::Json, Path::new("apps.json")).unwrap();
//!
//! assert_eq!(tenants[0].dns_label(), "alpha");
//! assert_eq!(tenants[0].resource_prefix(), "Alpha");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod loader;
pub mod naming;
pub mod net;
pub mod network;
pub mod tenant;

pub use error::{ConfigSubject, ConfigValidationError, LoadError};
pub use loader::{
    load_network_config, load_tenant_configs, parse_network_config, parse_tenant_configs,
    ConfigFormat,
};
pub use net::{parse_ipv4_cidr, CidrError, Ipv4Network};
pub use network::{NetworkConfig, RawNetworkConfig, DEFAULT_ECS_TASK_PORT};
pub use tenant::{
    is_valid_fargate_size, validate_tenants, RawTenantConfig, RawTenantList, TenantConfig,
    MAX_RULE_PRIORITY,
};

/// JSON Schema of the network document
#[must_use]
pub fn network_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(RawNetworkConfig)
}

/// JSON Schema of the tenant list document
#[must_use]
pub fn tenants_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(RawTenantList)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with configuration
    pub use crate::error::{ConfigValidationError, LoadError};
    pub use crate::loader::{load_network_config, load_tenant_configs, ConfigFormat};
    pub use crate::network::NetworkConfig;
    pub use crate::tenant::TenantConfig;
}

#[cfg(test)]
mod schema_tests {
    use super::*;

    #[test]
    fn schemas_name_document_fields() {
        let network = serde_json::to_value(network_schema()).unwrap();
        let props = &network["properties"];
        assert!(props.get("vpc_cidr").is_some());
        assert!(props.get("rds_port").is_some());

        let tenants = serde_json::to_string(&tenants_schema()).unwrap();
        assert!(tenants.contains("alb_priority_band"));
    }
}
