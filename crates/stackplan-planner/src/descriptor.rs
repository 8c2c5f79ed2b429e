//! Plan descriptor
//!
//! The serialized output of synthesis, consumed by the apply-time
//! collaborator. JSON is the canonical encoding; YAML is offered as an
//! alternative rendering of the same document.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stackplan_model::{
    Cluster, Container, ExecutionGrants, LaunchType, LoadBalancer, LogChannel, Network,
    PlanWarning, ResourceId, ResourceKind, SecretRef, ServiceTopology,
};

/// Version of the descriptor document layout
pub const DESCRIPTOR_FORMAT_VERSION: &str = "1";

/// Errors while encoding or decoding a descriptor
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML encoding failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("resource {id} is in the creation order but has no entity")]
    MissingEntity { id: ResourceId },

    #[error("unsupported descriptor format version {found:?}")]
    UnsupportedVersion { found: String },
}

/// Serialized resource graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PlanDescriptor {
    pub format_version: String,
    pub stack: String,
    pub launch_type: LaunchType,
    /// SHA-256 of the canonical JSON of `resources` and `edges`
    pub fingerprint: String,
    /// Resources in creation order
    pub resources: Vec<ResourceDescriptor>,
    pub edges: Vec<DependencyEdge>,
    pub warnings: Vec<PlanWarning>,
}

/// One resource with its direct dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    pub depends_on: Vec<ResourceId>,
    #[serde(flatten)]
    pub spec: ResourceSpec,
}

/// Kind-tagged resource attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "properties", rename_all = "snake_case")]
pub enum ResourceSpec {
    Network(Network),
    LogChannel(LogChannel),
    Secret(SecretRef),
    Container(Container),
    TaskDefinition(TaskDefinitionProperties),
    Cluster(Cluster),
    LoadBalancer(LoadBalancer),
    Service(ServiceTopology),
}

impl ResourceSpec {
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Network(_) => ResourceKind::Network,
            Self::LogChannel(_) => ResourceKind::LogChannel,
            Self::Secret(_) => ResourceKind::Secret,
            Self::Container(_) => ResourceKind::Container,
            Self::TaskDefinition(_) => ResourceKind::TaskDefinition,
            Self::Cluster(_) => ResourceKind::Cluster,
            Self::LoadBalancer(_) => ResourceKind::LoadBalancer,
            Self::Service(_) => ResourceKind::Service,
        }
    }
}

/// Task definition attributes; containers are emitted as their own
/// resources and referenced here by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskDefinitionProperties {
    pub cpu_units: u32,
    pub memory_mib: u32,
    pub containers: Vec<ResourceId>,
    pub primary_container: Option<ResourceId>,
    pub execution_grants: ExecutionGrants,
}

/// `to` is created after `from`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DependencyEdge {
    pub from: ResourceId,
    pub to: ResourceId,
}

impl PlanDescriptor {
    /// Parse a JSON descriptor
    ///
    /// # Errors
    /// Malformed JSON or an unknown `format_version`.
    pub fn from_json(json: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = serde_json::from_str(json)?;
        if descriptor.format_version != DESCRIPTOR_FORMAT_VERSION {
            return Err(DescriptorError::UnsupportedVersion {
                found: descriptor.format_version,
            });
        }
        Ok(descriptor)
    }

    /// Pretty-printed JSON, terminated by a newline
    ///
    /// # Errors
    /// Only if serialization itself fails.
    pub fn to_json_pretty(&self) -> Result<String, DescriptorError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// # Errors
    /// Only if serialization itself fails.
    pub fn to_yaml(&self) -> Result<String, DescriptorError> {
        let mut out = Vec::new();
        let mut serializer = serde_yaml::Serializer::new(&mut out);
        serde_yaml::with::singleton_map_recursive::serialize(self, &mut serializer)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    pub fn resource(&self, id: &ResourceId) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|r| &r.id == id)
    }

    /// Resources of one kind, in creation order
    pub fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.iter().filter(move |r| r.spec.kind() == kind)
    }

    #[must_use]
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.resources_of(kind).count()
    }

    #[must_use]
    pub fn has_edge(&self, from: &ResourceId, to: &ResourceId) -> bool {
        self.edges.iter().any(|e| &e.from == from && &e.to == to)
    }

    /// Recompute the fingerprint and compare it with the recorded one
    ///
    /// # Errors
    /// Only if serialization itself fails.
    pub fn verify_fingerprint(&self) -> Result<bool, DescriptorError> {
        Ok(fingerprint(&self.resources, &self.edges)? == self.fingerprint)
    }
}

/// SHA-256 over the canonical JSON of the resource and edge sections
pub(crate) fn fingerprint(
    resources: &[ResourceDescriptor],
    edges: &[DependencyEdge],
) -> Result<String, DescriptorError> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(resources)?);
    hasher.update(serde_json::to_vec(edges)?);
    Ok(hex::encode(hasher.finalize()))
}
