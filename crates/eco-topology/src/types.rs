//! Core graph vocabulary: stacks, resource identities, kinds and references

use petgraph::graph::NodeIndex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Name of the shared stack
pub const SHARED_STACK_NAME: &str = "CommonInfraStack";

/// Deployment unit a resource belongs to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StackId {
    /// The one shared stack
    Shared,
    /// A tenant stack, keyed by the tenant's resource prefix
    Tenant(String),
}

impl StackId {
    /// Stack name as emitted
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Shared => SHARED_STACK_NAME.to_string(),
            Self::Tenant(prefix) => format!("{prefix}Stack"),
        }
    }

    /// Whether this is a tenant stack
    #[inline]
    #[must_use]
    pub fn is_tenant(&self) -> bool {
        matches!(self, Self::Tenant(_))
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Identity of a resource: stack, construct scope and name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    pub stack: StackId,
    pub scope: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(stack: StackId, scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            stack,
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// `Stack/Scope/Name`
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.stack, self.scope, self.name)
    }

    /// Stable logical id: alphanumeric scope + name, then 8 hex digits of the path hash
    #[must_use]
    pub fn logical_id(&self) -> String {
        let mut id: String = self
            .scope
            .chars()
            .chain(self.name.chars())
            .filter(char::is_ascii_alphanumeric)
            .collect();
        let digest = Sha256::digest(self.path().as_bytes());
        id.push_str(&hex::encode_upper(&digest[..4]));
        id
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Kind of infrastructure object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    Vpc,
    SecurityGroup,
    SecurityGroupIngress,
    SecurityGroupEgress,
    HostedZone,
    Certificate,
    LoadBalancer,
    Listener,
    ListenerRule,
    TargetGroup,
    EcsCluster,
    TaskDefinition,
    ContainerDefinition,
    FargateService,
    DatabaseSecret,
    DatabaseCluster,
    DatabaseInstance,
    UserPool,
    UserPoolClient,
    UserPoolDomain,
    Bucket,
    BucketPolicy,
    DnsRecord,
}

impl ResourceKind {
    /// Provider type name
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Vpc => "AWS::EC2::VPC",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            Self::SecurityGroupEgress => "AWS::EC2::SecurityGroupEgress",
            Self::HostedZone => "AWS::Route53::HostedZone",
            Self::Certificate => "AWS::CertificateManager::Certificate",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::ListenerRule => "AWS::ElasticLoadBalancingV2::ListenerRule",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::EcsCluster => "AWS::ECS::Cluster",
            Self::TaskDefinition => "AWS::ECS::TaskDefinition",
            Self::ContainerDefinition => "AWS::ECS::TaskDefinition::ContainerDefinition",
            Self::FargateService => "AWS::ECS::Service",
            Self::DatabaseSecret => "AWS::SecretsManager::Secret",
            Self::DatabaseCluster => "AWS::RDS::DBCluster",
            Self::DatabaseInstance => "AWS::RDS::DBInstance",
            Self::UserPool => "AWS::Cognito::UserPool",
            Self::UserPoolClient => "AWS::Cognito::UserPoolClient",
            Self::UserPoolDomain => "AWS::Cognito::UserPoolDomain",
            Self::Bucket => "AWS::S3::Bucket",
            Self::BucketPolicy => "AWS::S3::BucketPolicy",
            Self::DnsRecord => "AWS::Route53::RecordSet",
        }
    }
}

/// Why one resource depends on another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    InVpc,
    SecurityGroup,
    Peer,
    Zone,
    Certificate,
    LoadBalancer,
    Listener,
    TargetGroup,
    Target,
    Cluster,
    TaskDefinition,
    Secret,
    AuthUserPool,
    AuthClient,
    AuthDomain,
    Bucket,
    Instance,
}

/// A resource node
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub logical_id: String,
    pub properties: Map<String, Value>,
}

/// Read-only handle to a resource already in the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub(crate) index: NodeIndex,
    id: ResourceId,
    logical_id: String,
}

impl ResourceRef {
    pub(crate) fn new(index: NodeIndex, id: ResourceId, logical_id: String) -> Self {
        Self {
            index,
            id,
            logical_id,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.name
    }

    #[inline]
    #[must_use]
    pub fn stack(&self) -> &StackId {
        &self.id.stack
    }

    #[inline]
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Property value pointing at this resource
    #[must_use]
    pub fn to_ref(&self) -> Value {
        json!({ "Ref": self.logical_id })
    }
}

/// Everything needed to add a resource: identity, properties, dependencies
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    pub(crate) id: ResourceId,
    pub(crate) kind: ResourceKind,
    pub(crate) properties: Map<String, Value>,
    pub(crate) depends_on: Vec<(ResourceRef, ReferenceKind)>,
}

impl ResourceSpec {
    pub fn new(id: ResourceId, kind: ResourceKind) -> Self {
        Self {
            id,
            kind,
            properties: Map::new(),
            depends_on: Vec::new(),
        }
    }

    #[must_use]
    pub fn property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Record a dependency and expose it as a `Ref` property under `key`
    #[must_use]
    pub fn reference(mut self, key: &str, target: &ResourceRef, kind: ReferenceKind) -> Self {
        self.properties.insert(key.to_string(), target.to_ref());
        self.depends_on.push((target.clone(), kind));
        self
    }

    /// Record a dependency without a property
    #[must_use]
    pub fn depends_on(mut self, target: &ResourceRef, kind: ReferenceKind) -> Self {
        self.depends_on.push((target.clone(), kind));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_names() {
        assert_eq!(StackId::Shared.name(), "CommonInfraStack");
        assert_eq!(StackId::Tenant("Alpha".into()).name(), "AlphaStack");
        assert!(StackId::Shared < StackId::Tenant("A".into()));
    }

    #[test]
    fn logical_id_is_stable_and_sanitized() {
        let id = ResourceId::new(StackId::Tenant("My-App".into()), "My-AppAppAuth", "My-AppUserPool");
        let a = id.logical_id();
        let b = id.clone().logical_id();
        assert_eq!(a, b);
        assert!(a.starts_with("MyAppAppAuthMyAppUserPool"));
        assert_eq!(a.len(), "MyAppAppAuthMyAppUserPool".len() + 8);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn logical_id_depends_on_stack() {
        let a = ResourceId::new(StackId::Tenant("Alpha".into()), "S", "N").logical_id();
        let b = ResourceId::new(StackId::Tenant("Beta".into()), "S", "N").logical_id();
        assert_ne!(a, b);
    }

    #[test]
    fn spec_reference_records_dependency() {
        let target = ResourceRef::new(
            NodeIndex::new(0),
            ResourceId::new(StackId::Shared, "CommonNetworking", "Vpc"),
            "CommonNetworkingVpcDEADBEEF".into(),
        );
        let spec = ResourceSpec::new(
            ResourceId::new(StackId::Shared, "CommonCompute", "AppECSCluster"),
            ResourceKind::EcsCluster,
        )
        .reference("vpc", &target, ReferenceKind::InVpc);

        assert_eq!(spec.properties["vpc"], json!({"Ref": "CommonNetworkingVpcDEADBEEF"}));
        assert_eq!(spec.depends_on.len(), 1);
    }
}
