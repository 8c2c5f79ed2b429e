//! Task Definition Builder
//!
//! Accumulates assembled containers and enforces the task-level invariants:
//! unique container names, exactly one primary container, and memory / CPU
//! limits that fit the task quota.

use std::collections::BTreeSet;

use stackplan_model::{
    CapacityError, ConfigError, Container, ExecutionGrants, LaunchType, PlanError, ResourceId,
    TaskDefinition,
};

/// Builder for a single [`TaskDefinition`]
///
/// Usage:
/// ```rust,ignore
/// let mut builder = TaskDefinitionBuilder::new(id, 256, 512);
/// builder.add_container(web)?;
/// builder.add_container(sidecar)?;
/// let task: TaskDefinition = builder.build(LaunchType::Fargate)?;
/// ```
#[derive(Debug, Clone)]
pub struct TaskDefinitionBuilder {
    id: ResourceId,
    cpu_units: u32,
    memory_mib: u32,
    containers: Vec<Container>,
}

impl TaskDefinitionBuilder {
    pub fn new(id: ResourceId, cpu_units: u32, memory_mib: u32) -> Self {
        Self {
            id,
            cpu_units,
            memory_mib,
            containers: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Check whether a container named `name` was already added
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.containers.iter().any(|c| c.name == name)
    }

    /// Append a container, keeping declaration order
    ///
    /// # Errors
    /// [`ConfigError::DuplicateContainerName`] if the name is taken.
    pub fn add_container(&mut self, container: Container) -> Result<(), ConfigError> {
        if self.contains(&container.name) {
            return Err(ConfigError::DuplicateContainerName {
                task_definition: self.id.to_string(),
                container: container.name,
            });
        }
        self.containers.push(container);
        Ok(())
    }

    /// Validate and seal the task definition
    ///
    /// Containers without an explicit memory or CPU limit share the
    /// remainder and are left out of the sum checks.
    ///
    /// # Errors
    /// - [`ConfigError::EmptyTaskDefinition`], [`ConfigError::NoPrimaryContainer`],
    ///   [`ConfigError::MultiplePrimaryContainers`]
    /// - [`CapacityError`] when limits exceed the task quota or the task
    ///   size is not schedulable on `launch_type`
    pub fn build(self, launch_type: LaunchType) -> Result<TaskDefinition, PlanError> {
        let task_definition = self.id.to_string();

        if self.containers.is_empty() {
            return Err(ConfigError::EmptyTaskDefinition { task_definition }.into());
        }

        let primaries: Vec<String> = self
            .containers
            .iter()
            .filter(|c| c.primary)
            .map(|c| c.name.clone())
            .collect();
        match primaries.len() {
            0 => return Err(ConfigError::NoPrimaryContainer { task_definition }.into()),
            1 => {}
            _ => {
                return Err(ConfigError::MultiplePrimaryContainers {
                    task_definition,
                    containers: primaries,
                }
                .into())
            }
        }

        if let Some(container) = self
            .containers
            .iter()
            .find(|c| c.memory_mib.is_some_and(|mib| mib > self.memory_mib))
        {
            return Err(CapacityError::ContainerMemoryExceedsTask {
                task_definition,
                container: container.name.clone(),
                container_mib: container.memory_mib.unwrap_or_default(),
                task_mib: self.memory_mib,
            }
            .into());
        }

        let total_mib: u64 = self
            .containers
            .iter()
            .filter_map(|c| c.memory_mib)
            .map(u64::from)
            .sum();
        if total_mib > u64::from(self.memory_mib) {
            return Err(CapacityError::MemorySumExceedsTask {
                task_definition,
                total_mib,
                task_mib: self.memory_mib,
            }
            .into());
        }

        let total_units: u64 = self
            .containers
            .iter()
            .filter_map(|c| c.cpu)
            .map(u64::from)
            .sum();
        if total_units > u64::from(self.cpu_units) {
            return Err(CapacityError::CpuExceedsTask {
                task_definition,
                total_units,
                task_units: self.cpu_units,
            }
            .into());
        }

        if !launch_type.supports_task_size(self.cpu_units, self.memory_mib) {
            return Err(CapacityError::UnsupportedTaskSize {
                task_definition,
                cpu_units: self.cpu_units,
                memory_mib: self.memory_mib,
            }
            .into());
        }

        let execution_grants = grants(&self.containers);

        tracing::debug!(
            task_definition = %self.id,
            containers = self.containers.len(),
            cpu = self.cpu_units,
            memory_mib = self.memory_mib,
            "task definition built"
        );

        Ok(TaskDefinition {
            id: self.id,
            cpu_units: self.cpu_units,
            memory_mib: self.memory_mib,
            containers: self.containers,
            execution_grants,
        })
    }
}

fn grants(containers: &[Container]) -> ExecutionGrants {
    let secrets: BTreeSet<&ResourceId> = containers
        .iter()
        .flat_map(|c| c.secrets.iter().map(|s| &s.secret))
        .collect();
    let log_channels: BTreeSet<&ResourceId> = containers.iter().map(|c| &c.log.channel).collect();

    ExecutionGrants {
        secrets: secrets.into_iter().cloned().collect(),
        log_channels: log_channels.into_iter().cloned().collect(),
    }
}
