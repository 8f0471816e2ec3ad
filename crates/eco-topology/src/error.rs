//! Error types for topology construction
//!
//! Every error aborts the whole build: nothing is committed partially and
//! nothing is retried, since configuration errors are not transient.

use crate::allocator::AllocationError;
use eco_config::ConfigValidationError;
use std::fmt;

/// Structural errors raised by the graph builder
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Two resources claim the same name
    #[error("resource name '{name}' used by both {existing} and {attempted}")]
    DuplicateName {
        name: String,
        existing: String,
        attempted: String,
    },

    /// Two resource paths hash to the same logical id
    #[error("logical id '{0}' is not unique")]
    DuplicateLogicalId(String),

    /// Handle does not belong to this graph
    #[error("unknown resource {0}")]
    UnknownResource(String),

    /// Resource references itself
    #[error("resource {0} references itself")]
    SelfReference(String),

    /// References form a cycle
    #[error("reference cycle through {0}")]
    CycleDetected(String),

    /// Reference crosses stacks in a forbidden direction
    #[error("{from} may not reference {to} (stack {from_stack} → {to_stack})")]
    CrossStackViolation {
        from: String,
        to: String,
        from_stack: String,
        to_stack: String,
    },

    /// Network isolation guarantee does not hold
    #[error("isolation breach: {0}")]
    IsolationBreach(String),
}

/// What kind of name two tenants collided on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    DnsLabel,
    ResourceName,
}

impl fmt::Display for CollisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DnsLabel => write!(f, "DNS label"),
            Self::ResourceName => write!(f, "resource name"),
        }
    }
}

/// Main topology error type
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// Malformed or missing configuration field
    #[error("configuration error: {0}")]
    ConfigValidation(#[from] ConfigValidationError),

    /// Two tenants (or resources) resolve to the same name
    #[error("name collision: {kind} '{name}' claimed by both '{first}' and '{second}'")]
    NameCollision {
        kind: CollisionKind,
        name: String,
        first: String,
        second: String,
    },

    /// A band ran out of priorities
    #[error("priority allocation failed: {0}")]
    PriorityExhausted(#[from] AllocationError),

    /// Two tenants reserved overlapping priority ranges
    #[error(
        "priority bands overlap: '{first}' reserves {first_band}..{first_end}, '{second}' starts at {second_band}"
    )]
    BandOverlap {
        first: String,
        first_band: u32,
        first_end: u32,
        second: String,
        second_band: u32,
    },

    /// A band's last rule would land above the priority ceiling
    #[error("priority band of '{tenant}' runs {band}..={last}, above the ceiling {max_priority}")]
    BandOutOfRange {
        tenant: String,
        band: u32,
        last: u32,
        max_priority: u32,
    },

    /// Assembly options are unusable
    #[error("invalid assembly options: {0}")]
    InvalidOptions(String),

    /// Graph structure error
    #[error("graph error: {0}")]
    Graph(GraphError),
}

impl TopologyError {
    /// Short stable name of the error class, for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigValidation(_) => "config_validation",
            Self::NameCollision { .. } => "name_collision",
            Self::PriorityExhausted(_) => "priority_exhausted",
            Self::BandOverlap { .. } => "band_overlap",
            Self::BandOutOfRange { .. } => "band_out_of_range",
            Self::InvalidOptions(_) => "invalid_options",
            Self::Graph(_) => "graph",
        }
    }

    /// Whether fixing the input documents resolves the error
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::Graph(_))
    }
}

impl From<GraphError> for TopologyError {
    fn from(value: GraphError) -> Self {
        match value {
            GraphError::DuplicateName {
                name,
                existing,
                attempted,
            } => TopologyError::NameCollision {
                kind: CollisionKind::ResourceName,
                name,
                first: existing,
                second: attempted,
            },
            other => TopologyError::Graph(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_name_becomes_collision() {
        let err = TopologyError::from(GraphError::DuplicateName {
            name: "AlphaUserPool".into(),
            existing: "AlphaStack/AlphaAppAuth/AlphaUserPool".into(),
            attempted: "AlphaStack/AlphaAppAuth/AlphaUserPool".into(),
        });
        assert_eq!(err.kind(), "name_collision");
        assert!(err.is_config_error());
    }

    #[test]
    fn structural_errors_stay_graph_errors() {
        let err = TopologyError::from(GraphError::CycleDetected("X".into()));
        assert!(matches!(err, TopologyError::Graph(GraphError::CycleDetected(_))));
        assert!(!err.is_config_error());
    }

    #[test]
    fn collision_message() {
        let err = TopologyError::NameCollision {
            kind: CollisionKind::DnsLabel,
            name: "alpha".into(),
            first: "Alpha".into(),
            second: "alpha".into(),
        };
        assert_eq!(
            err.to_string(),
            "name collision: DNS label 'alpha' claimed by both 'Alpha' and 'alpha'"
        );
    }

    #[test]
    fn out_of_range_band_names_tenant() {
        let err = TopologyError::BandOutOfRange {
            tenant: "beta".into(),
            band: 50_000,
            last: 50_001,
            max_priority: 50_000,
        };
        assert_eq!(err.kind(), "band_out_of_range");
        assert!(err.is_config_error());
        assert!(err.to_string().contains("'beta'"));
    }
}
