//! App Ecosystem Topology (eco-topology)
//!
//! Declares one shared network/compute/database stack and one stack per
//! tenant, wired to a single load balancer with collision-free routing
//! priorities.
//!
//! # Components
//!
//! 1. **Priority Band Allocator**: monotonic per-band rule priorities
//! 2. **Shared Topology Builder**: VPC, security groups, zone, certificate,
//!    load balancer, database, cluster
//! 3. **Per-Tenant Resource Builder**: user pool, bucket, Fargate service
//! 4. **Per-Tenant Router**: DNS record, target group, API and static rules
//! 5. **Topology Assembler**: runs the above in order and seals the graph
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use eco_topology::prelude::*;
//!
//! let network = load_network_config("network.yaml")?;
//! let tenants = load_tenant_configs("apps.yaml")?;
//!
//! let topology = TopologyAssembler::default().assemble(&network, &tenants)?;
//! println!("{}", topology.manifest().to_json()?);
//! ```

// Core modules
pub mod allocator;
pub mod error;
pub mod listener;
pub mod types;

// Construction
pub mod assembler;
pub mod graph;
pub mod shared;
pub mod tenant;

// Output
pub mod manifest;

// Re-exports
pub use allocator::{AllocationError, PriorityBandAllocator, PriorityBandState};
pub use assembler::{AssemblyOptions, Topology, TopologyAssembler};
pub use error::{CollisionKind, GraphError, TopologyError};
pub use manifest::Manifest;
pub use types::*;

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::allocator::{AllocationError, PriorityBandAllocator};
    pub use crate::assembler::{AssemblyOptions, Topology, TopologyAssembler};
    pub use crate::error::{CollisionKind, GraphError, TopologyError};
    pub use crate::graph::{TopologyGraphBuilder, ValidatedTopology};
    pub use crate::manifest::Manifest;
    pub use crate::shared::{SharedTopologyBuilder, SharedTopologyHandle};
    pub use crate::tenant::{
        RouteEntry, RuleKind, TenantResourceBuilder, TenantRouter, TenantTopology,
    };
    pub use eco_config::prelude::*;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
