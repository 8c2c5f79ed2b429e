use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;
use crate::types::container::{Container, ContainerRequest};

/// Capacity model of the cluster the task runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LaunchType {
    /// Serverless tasks: fixed task sizes, `awsvpc` networking
    #[default]
    Fargate,
    /// Self-managed instances
    Ec2,
}

impl LaunchType {
    /// Whether `(cpu_units, memory_mib)` is a task size this launch type
    /// can schedule
    #[must_use]
    pub fn supports_task_size(self, cpu_units: u32, memory_mib: u32) -> bool {
        match self {
            Self::Ec2 => cpu_units > 0 && memory_mib > 0,
            Self::Fargate => {
                let stepped = |lo: u32, hi: u32, step: u32| {
                    (lo..=hi).contains(&memory_mib) && memory_mib % step == 0
                };
                match cpu_units {
                    256 => matches!(memory_mib, 512 | 1024 | 2048),
                    512 => stepped(1024, 4096, 1024),
                    1024 => stepped(2048, 8192, 1024),
                    2048 => stepped(4096, 16384, 1024),
                    4096 => stepped(8192, 30720, 1024),
                    8192 => stepped(16384, 61440, 4096),
                    16384 => stepped(32768, 122_880, 8192),
                    _ => false,
                }
            }
        }
    }

    /// Host port must equal container port on load-balanced mappings
    #[inline]
    #[must_use]
    pub fn requires_port_equality(self) -> bool {
        matches!(self, Self::Fargate)
    }
}

/// Declarative task definition input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TaskDefinitionRequest {
    pub id: String,
    pub cpu: u32,
    pub memory_mib: u32,
    pub containers: Vec<ContainerRequest>,
}

impl TaskDefinitionRequest {
    pub fn new(id: impl Into<String>, cpu: u32, memory_mib: u32) -> Self {
        Self {
            id: id.into(),
            cpu,
            memory_mib,
            containers: Vec::new(),
        }
    }

    #[must_use]
    pub fn container(mut self, container: ContainerRequest) -> Self {
        self.containers.push(container);
        self
    }
}

/// Resources the task's execution role must be allowed to read or write
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionGrants {
    pub secrets: Vec<ResourceId>,
    pub log_channels: Vec<ResourceId>,
}

/// Containers sharing one CPU/memory quota, deployed as a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct TaskDefinition {
    pub id: ResourceId,
    pub cpu_units: u32,
    pub memory_mib: u32,
    pub containers: Vec<Container>,
    pub execution_grants: ExecutionGrants,
}

impl TaskDefinition {
    /// The single container that receives load-balanced traffic
    #[must_use]
    pub fn primary_container(&self) -> Option<&Container> {
        self.containers.iter().find(|c| c.primary)
    }

    #[must_use]
    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// Memory left for containers without an explicit limit
    #[must_use]
    pub fn unreserved_memory_mib(&self) -> u32 {
        let reserved: u32 = self
            .containers
            .iter()
            .filter_map(|c| c.memory_mib)
            .fold(0, u32::saturating_add);
        self.memory_mib.saturating_sub(reserved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fargate_sizes() {
        let fargate = LaunchType::Fargate;
        assert!(fargate.supports_task_size(256, 512));
        assert!(fargate.supports_task_size(1024, 3072));
        assert!(!fargate.supports_task_size(256, 4096));
        assert!(!fargate.supports_task_size(512, 1536));
        assert!(!fargate.supports_task_size(300, 512));
    }

    #[test]
    fn ec2_accepts_any_positive_size() {
        assert!(LaunchType::Ec2.supports_task_size(300, 700));
        assert!(!LaunchType::Ec2.supports_task_size(0, 700));
    }
}
