//! Topology Graph
//!
//! Resources are nodes, references are edges pointing from the dependent
//! resource to its dependency.
//!
//! # Two Phases
//!
//! 1. **Construction** (`TopologyGraphBuilder`):
//!    - Register resources and their references
//!    - Reject duplicate names and logical ids as they are added
//!
//! 2. **Finalisation** (`TopologyGraphBuilder::finalize`):
//!    - Reject self references and cycles
//!    - Reject references from the shared stack into a tenant stack, and
//!      between tenant stacks
//!    - Produce the sealed `ValidatedTopology`
//!
//! Nothing downstream (manifest emission, routing table) accepts an
//! unvalidated graph.

pub mod builder;
pub mod validated;

pub use builder::TopologyGraphBuilder;
pub use validated::ValidatedTopology;
