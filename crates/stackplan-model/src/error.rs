//! Error types for plan construction and apply
//!
//! Plan construction fails with exactly one of three kinds:
//! - [`ConfigError`]: malformed or contradictory declarative input
//! - [`ConflictError`]: two declarations about the same named resource disagree
//! - [`CapacityError`]: resource limits violated
//!
//! All three are detected before synthesis and abort the whole plan; none is
//! ever corrected silently. [`ApplyError`] belongs to the apply-time
//! collaborator and is deliberately not convertible into [`PlanError`].

use std::fmt;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;
use crate::image::ImageReferenceError;
use crate::types::SubnetKind;

/// Main plan construction error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Malformed or contradictory input
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Disagreeing declarations of one named resource
    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// Resource limits violated
    #[error("capacity error: {0}")]
    Capacity(#[from] CapacityError),
}

impl PlanError {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> PlanErrorKind {
        match self {
            Self::Config(_) => PlanErrorKind::Config,
            Self::Conflict(_) => PlanErrorKind::Conflict,
            Self::Capacity(_) => PlanErrorKind::Capacity,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    #[inline]
    #[must_use]
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity(_))
    }
}

/// Coarse classification of a [`PlanError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanErrorKind {
    Config,
    Conflict,
    Capacity,
}

/// Malformed or contradictory declarative input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid resource id {id:?}")]
    InvalidResourceId { id: String },

    #[error("resource id {id} is declared more than once")]
    DuplicateResourceId { id: ResourceId },

    #[error("malformed CIDR {value:?}: {reason}")]
    MalformedCidr { value: String, reason: String },

    #[error("CIDR {cidr} is too small: {reason}")]
    CidrTooSmall { cidr: String, reason: String },

    #[error("network {network}: availability zone count {count} is outside 1..=6")]
    InvalidAvailabilityZoneCount { network: String, count: u8 },

    #[error("network {network}: exactly one of cidr or lookup_key must be set")]
    AmbiguousNetworkSource { network: String },

    #[error("network {network}: at least one subnet group is required")]
    EmptySubnetLayout { network: String },

    #[error("network {network}: subnet group {group} is declared more than once")]
    DuplicateSubnetGroup { network: String, group: String },

    #[error("container {container}: invalid image reference {reference:?}: {source}")]
    InvalidImageReference {
        container: String,
        reference: String,
        #[source]
        source: ImageReferenceError,
    },

    #[error("container {container}: build context {} has no build recipe", path.display())]
    MissingBuildContext { container: String, path: PathBuf },

    #[error("container {container}: invalid environment variable name {name:?}")]
    InvalidEnvironmentVariable { container: String, name: String },

    #[error("container {container}: environment variable {name} is set more than once")]
    DuplicateEnvironmentVariable { container: String, name: String },

    #[error("container {container}: secret binding {env_var} is declared more than once")]
    DuplicateSecretBinding { container: String, env_var: String },

    #[error("secret {secret}: secret name must not be empty")]
    EmptySecretName { secret: String },

    #[error("{owner}: port {port} is outside 1..=65535")]
    PortOutOfRange { owner: String, port: u32 },

    #[error(
        "container {container}: load-balanced port needs host port {host_port} equal to container port {container_port}"
    )]
    LoadBalancedPortMismatch {
        container: String,
        container_port: u16,
        host_port: u16,
    },

    #[error("container {container}: primary container exposes no port for the load balancer")]
    PrimaryWithoutPort { container: String },

    #[error("task definition {task_definition}: container name {container} is used more than once")]
    DuplicateContainerName {
        task_definition: String,
        container: String,
    },

    #[error("task definition {task_definition} has no containers")]
    EmptyTaskDefinition { task_definition: String },

    #[error("task definition {task_definition} has no primary container")]
    NoPrimaryContainer { task_definition: String },

    #[error("task definition {task_definition} has more than one primary container: {containers:?}")]
    MultiplePrimaryContainers {
        task_definition: String,
        containers: Vec<String>,
    },

    #[error("log channel {channel}: unsupported retention of {days} days")]
    InvalidRetention { channel: String, days: u32 },

    #[error("log channel name must not be empty")]
    EmptyLogChannelName,

    #[error("service {service}: desired count {count} must be between 0 and {}", u32::MAX)]
    InvalidDesiredCount { service: String, count: i64 },

    #[error("service {service}: no {kind} subnet in availability zone {az_index}")]
    MissingSubnets {
        service: String,
        kind: SubnetKind,
        az_index: u8,
    },

    #[error("service {service}: invalid health check: {reason}")]
    InvalidHealthCheck { service: String, reason: String },

    #[error("{from} references unknown resource {to}")]
    UnknownReference { from: String, to: String },

    #[error("dependency cycle between {path:?}")]
    CycleDetected { path: Vec<ResourceId> },
}

/// Two declarations about the same named resource disagree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("log channel {name} already declared with {existing}, requested {requested}")]
    LogChannelPolicy {
        name: String,
        existing: String,
        requested: String,
    },
}

/// Resource limits violated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapacityError {
    #[error(
        "task definition {task_definition}: container {container} limit of {container_mib} MiB exceeds task memory of {task_mib} MiB"
    )]
    ContainerMemoryExceedsTask {
        task_definition: String,
        container: String,
        container_mib: u32,
        task_mib: u32,
    },

    #[error(
        "task definition {task_definition}: container memory limits total {total_mib} MiB, task memory is {task_mib} MiB"
    )]
    MemorySumExceedsTask {
        task_definition: String,
        total_mib: u64,
        task_mib: u32,
    },

    #[error(
        "task definition {task_definition}: container CPU units total {total_units}, task has {task_units}"
    )]
    CpuExceedsTask {
        task_definition: String,
        total_units: u64,
        task_units: u32,
    },

    #[error(
        "task definition {task_definition}: {cpu_units} CPU units with {memory_mib} MiB is not a supported task size"
    )]
    UnsupportedTaskSize {
        task_definition: String,
        cpu_units: u32,
        memory_mib: u32,
    },
}

/// Errors surfaced by the apply-time collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// A referenced external resource does not exist
    #[error("{resource}: unresolved reference {key:?}")]
    UnresolvedReference { resource: ResourceId, key: String },

    /// A resource could not be created or updated
    #[error("{resource}: {reason}")]
    ResourceFailed { resource: ResourceId, reason: String },
}

impl ApplyError {
    /// The resource the failure is attributed to
    #[must_use]
    pub fn resource(&self) -> &ResourceId {
        match self {
            Self::UnresolvedReference { resource, .. } | Self::ResourceFailed { resource, .. } => {
                resource
            }
        }
    }
}

/// Non-fatal finding recorded on a validated plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum PlanWarning {
    /// Rollback is enabled on a first deployment; there is no earlier
    /// revision to revert to.
    RollbackWithoutStableRevision { service: ResourceId },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RollbackWithoutStableRevision { service } => write!(
                f,
                "service {service}: rollback enabled but no stable revision exists yet"
            ),
        }
    }
}
