//! Topology Assembler
//!
//! Top-level entry point: checks the tenant list as a whole, builds the
//! shared topology once, then builds and routes every tenant in list order.
//! The first error aborts the run and nothing is returned.
//!
//! # Pipeline
//!
//! ```text
//! preflight (labels, band ceiling, band overlap)
//!   → SharedTopologyBuilder
//!   → for each tenant: TenantResourceBuilder → TenantRouter
//!   → TopologyGraphBuilder::finalize
//! ```

use crate::allocator::{PriorityBandAllocator, PriorityBandState};
use crate::error::{CollisionKind, TopologyError};
use crate::graph::{TopologyGraphBuilder, ValidatedTopology};
use crate::manifest::Manifest;
use crate::shared::{SharedTopologyBuilder, SharedTopologyHandle};
use crate::tenant::{RouteEntry, TenantResourceBuilder, TenantRouter, TenantTopology};
use crate::types::StackId;
use eco_config::{NetworkConfig, TenantConfig, MAX_RULE_PRIORITY};
use std::collections::HashMap;

/// Routing rules each tenant registers
pub const RULES_PER_TENANT: u32 = 2;

/// Default width of a tenant's priority band
pub const DEFAULT_BAND_WIDTH: u32 = 100;

/// Assembly knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// Priorities each tenant reserves, starting at its band
    pub band_width: u32,
    /// Highest priority the listener accepts
    pub max_priority: u32,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            band_width: DEFAULT_BAND_WIDTH,
            max_priority: MAX_RULE_PRIORITY,
        }
    }
}

impl AssemblyOptions {
    /// Options with a custom band width
    #[must_use]
    pub fn with_band_width(band_width: u32) -> Self {
        Self {
            band_width,
            ..Self::default()
        }
    }

    /// Check the options are usable
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.band_width < RULES_PER_TENANT {
            return Err(TopologyError::InvalidOptions(format!(
                "band width {} cannot hold {RULES_PER_TENANT} rules",
                self.band_width
            )));
        }
        if self.max_priority == 0 || self.max_priority > MAX_RULE_PRIORITY {
            return Err(TopologyError::InvalidOptions(format!(
                "max priority {} outside 1..={MAX_RULE_PRIORITY}",
                self.max_priority
            )));
        }
        if self.band_width > self.max_priority {
            return Err(TopologyError::InvalidOptions(format!(
                "band width {} exceeds max priority {}",
                self.band_width, self.max_priority
            )));
        }
        Ok(())
    }
}

/// Builds the complete topology from validated configs
#[derive(Debug, Clone, Default)]
pub struct TopologyAssembler {
    options: AssemblyOptions,
}

impl TopologyAssembler {
    /// Create an assembler, rejecting unusable options
    pub fn new(options: AssemblyOptions) -> Result<Self, TopologyError> {
        options.validate()?;
        Ok(Self { options })
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> AssemblyOptions {
        self.options
    }

    /// Build the shared stack and every tenant stack, in list order
    pub fn assemble(
        &self,
        network: &NetworkConfig,
        tenants: &[TenantConfig],
    ) -> Result<Topology, TopologyError> {
        tracing::info!(
            "Assembling topology for {} tenant(s) in zone {}",
            tenants.len(),
            network.domain_name()
        );
        self.preflight(tenants)?;

        let mut graph = TopologyGraphBuilder::new();
        let mut allocator =
            PriorityBandAllocator::new(self.options.band_width, self.options.max_priority);

        let shared = SharedTopologyBuilder::new(network).build(&mut graph)?;
        let router = TenantRouter::new(&shared);

        let mut built = Vec::with_capacity(tenants.len());
        for tenant in tenants {
            let resources = TenantResourceBuilder::new(tenant, &shared).build(&mut graph)?;
            let routing = router.route(tenant, &resources, &mut allocator, &mut graph)?;
            built.push(TenantTopology {
                name: tenant.name().to_string(),
                dns_label: tenant.dns_label().to_string(),
                host: tenant.host_name(shared.zone_name()),
                stack: StackId::Tenant(tenant.resource_prefix().to_string()),
                resources,
                routing,
            });
        }

        let graph = graph.finalize()?;
        tracing::info!(
            "Topology assembled: {} stacks, {} resources, {} references",
            graph.stacks().count(),
            graph.resource_count(),
            graph.reference_count()
        );

        Ok(Topology {
            graph,
            shared,
            tenants: built,
            priorities: allocator.state().clone(),
        })
    }

    /// Whole-list checks that must pass before anything is built
    fn preflight(&self, tenants: &[TenantConfig]) -> Result<(), TopologyError> {
        let mut labels: HashMap<&str, &str> = HashMap::new();
        for tenant in tenants {
            if let Some(first) = labels.insert(tenant.dns_label(), tenant.name()) {
                return Err(TopologyError::NameCollision {
                    kind: CollisionKind::DnsLabel,
                    name: tenant.dns_label().to_string(),
                    first: first.to_string(),
                    second: tenant.name().to_string(),
                });
            }
            let band = tenant.priority_band();
            let last = band.saturating_add(RULES_PER_TENANT - 1);
            if last > self.options.max_priority {
                return Err(TopologyError::BandOutOfRange {
                    tenant: tenant.name().to_string(),
                    band,
                    last,
                    max_priority: self.options.max_priority,
                });
            }
        }

        let mut bands: Vec<&TenantConfig> = tenants.iter().collect();
        bands.sort_by_key(|tenant| tenant.priority_band());
        for pair in bands.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            let first_end = first.priority_band().saturating_add(self.options.band_width);
            if second.priority_band() < first_end {
                return Err(TopologyError::BandOverlap {
                    first: first.name().to_string(),
                    first_band: first.priority_band(),
                    first_end,
                    second: second.name().to_string(),
                    second_band: second.priority_band(),
                });
            }
        }
        Ok(())
    }
}

/// Result of one assembly run
#[derive(Debug, Clone)]
pub struct Topology {
    graph: ValidatedTopology,
    shared: SharedTopologyHandle,
    tenants: Vec<TenantTopology>,
    priorities: PriorityBandState,
}

impl Topology {
    /// The validated resource graph
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &ValidatedTopology {
        &self.graph
    }

    /// Handles to the shared stack
    #[inline]
    #[must_use]
    pub fn shared(&self) -> &SharedTopologyHandle {
        &self.shared
    }

    /// Tenants in assembly order
    #[inline]
    #[must_use]
    pub fn tenants(&self) -> &[TenantTopology] {
        &self.tenants
    }

    /// Tenant by original or normalised name
    #[must_use]
    pub fn tenant(&self, name: &str) -> Option<&TenantTopology> {
        let label = eco_config::naming::normalize_label(name);
        self.tenants.iter().find(|tenant| tenant.dns_label == label)
    }

    /// Final counter of every band
    #[inline]
    #[must_use]
    pub fn priorities(&self) -> &PriorityBandState {
        &self.priorities
    }

    /// Every rule in assembly order, API before static per tenant
    #[must_use]
    pub fn routing_table(&self) -> Vec<RouteEntry> {
        self.tenants.iter().flat_map(TenantTopology::routes).collect()
    }

    /// Host headers of all tenants
    #[must_use]
    pub fn hosts(&self) -> Vec<&str> {
        self.tenants.iter().map(|tenant| tenant.host.as_str()).collect()
    }

    /// Emitted manifest
    #[must_use]
    pub fn manifest(&self) -> Manifest {
        Manifest::build(&self.graph, self.routing_table())
    }

    /// Fingerprint of the emitted manifest
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.manifest().fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        assert!(AssemblyOptions::default().validate().is_ok());
        assert_eq!(AssemblyOptions::default().band_width, 100);
    }

    #[test]
    fn narrow_band_rejected() {
        let err = TopologyAssembler::new(AssemblyOptions::with_band_width(1)).unwrap_err();
        assert_eq!(err.kind(), "invalid_options");
    }

    #[test]
    fn ceiling_above_listener_limit_rejected() {
        let options = AssemblyOptions {
            band_width: 10,
            max_priority: MAX_RULE_PRIORITY + 1,
        };
        assert!(options.validate().is_err());
        let options = AssemblyOptions {
            band_width: 10,
            max_priority: 5,
        };
        assert!(options.validate().is_err());
    }
}
