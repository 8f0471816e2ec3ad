//! Emitted graph
//!
//! The manifest is what the deployment tooling consumes. It is a pure
//! function of the validated graph and the routing table: identical inputs
//! give byte-identical output, and the fingerprint is the SHA-256 of the
//! canonical JSON form with an empty fingerprint field.

use crate::graph::ValidatedTopology;
use crate::tenant::RouteEntry;
use crate::types::Resource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Manifest format version
pub const MANIFEST_VERSION: &str = "1";

/// One resource as emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceManifest {
    pub name: String,
    pub logical_id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub properties: Map<String, Value>,
    /// Logical ids of direct dependencies
    pub depends_on: Vec<String>,
}

/// One deployable stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackManifest {
    pub name: String,
    /// Names of stacks that must be deployed first
    pub depends_on: Vec<String>,
    /// Resources in deploy order
    pub resources: Vec<ResourceManifest>,
    /// Logical ids other stacks import from this one
    pub exports: Vec<String>,
}

/// The whole emitted topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub fingerprint: String,
    pub stacks: Vec<StackManifest>,
    pub routing: Vec<RouteEntry>,
}

impl Manifest {
    /// Build from a validated graph and its routing table
    #[must_use]
    pub fn build(topology: &ValidatedTopology, routing: Vec<RouteEntry>) -> Self {
        let stacks = topology
            .stacks()
            .map(|stack| StackManifest {
                name: stack.name(),
                depends_on: topology
                    .stack_dependencies(stack)
                    .iter()
                    .map(|dep| dep.name())
                    .collect(),
                resources: topology
                    .resources_in(stack)
                    .map(|resource| resource_manifest(topology, resource))
                    .collect(),
                exports: topology
                    .cross_stack_exports(stack)
                    .into_iter()
                    .map(|resource| resource.logical_id.clone())
                    .collect(),
            })
            .collect();

        let mut manifest = Self {
            version: MANIFEST_VERSION.to_string(),
            fingerprint: String::new(),
            stacks,
            routing,
        };
        manifest.fingerprint = manifest.compute_fingerprint();
        manifest
    }

    /// SHA-256 over the canonical JSON with the fingerprint blanked
    #[must_use]
    pub fn compute_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.as_bytes());
        for stack in &self.stacks {
            hasher.update(canonical(stack).as_bytes());
        }
        for route in &self.routing {
            hasher.update(canonical(route).as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Whether the stored fingerprint matches the content
    #[must_use]
    pub fn verify_fingerprint(&self) -> bool {
        self.fingerprint == self.compute_fingerprint()
    }

    /// Stack by name
    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&StackManifest> {
        self.stacks.iter().find(|stack| stack.name == name)
    }

    /// Total number of resources
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.stacks.iter().map(|stack| stack.resources.len()).sum()
    }

    /// Pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

impl StackManifest {
    /// Resource by name
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResourceManifest> {
        self.resources.iter().find(|resource| resource.name == name)
    }
}

fn resource_manifest(topology: &ValidatedTopology, resource: &Resource) -> ResourceManifest {
    ResourceManifest {
        name: resource.id.name.clone(),
        logical_id: resource.logical_id.clone(),
        type_name: resource.kind.type_name().to_string(),
        properties: resource.properties.clone(),
        depends_on: topology
            .dependencies(&resource.id.name)
            .into_iter()
            .map(|(dep, _)| dep.logical_id.clone())
            .collect(),
    }
}

// serde_json maps are ordered, so the compact form is canonical
fn canonical<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
