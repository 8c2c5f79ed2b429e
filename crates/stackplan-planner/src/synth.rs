//! Plan Synthesizer
//!
//! Walks a [`ValidatedPlan`] in creation order and emits a
//! [`PlanDescriptor`]. Synthesis is pure: no I/O, no reference resolution,
//! and identical plans produce byte-identical descriptors.

use stackplan_model::{ResourceId, ResourceKind};

use crate::construction::ValidatedPlan;
use crate::descriptor::{
    fingerprint, DependencyEdge, DescriptorError, PlanDescriptor, ResourceDescriptor,
    ResourceSpec, TaskDefinitionProperties, DESCRIPTOR_FORMAT_VERSION,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Synthesizer;

impl Synthesizer {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Emit the descriptor for `plan`
    ///
    /// # Errors
    /// [`DescriptorError`] only if the plan is internally inconsistent or
    /// the fingerprint cannot be encoded.
    pub fn synthesize(&self, plan: &ValidatedPlan) -> Result<PlanDescriptor, DescriptorError> {
        let resources = plan
            .creation_order()
            .iter()
            .map(|id| {
                Ok(ResourceDescriptor {
                    id: id.clone(),
                    depends_on: plan.dependencies(id),
                    spec: spec(plan, id)?,
                })
            })
            .collect::<Result<Vec<_>, DescriptorError>>()?;

        let edges: Vec<DependencyEdge> = plan
            .edges()
            .into_iter()
            .map(|(from, to)| DependencyEdge { from, to })
            .collect();

        let fingerprint = fingerprint(&resources, &edges)?;

        tracing::info!(
            stack = plan.stack_name(),
            resources = resources.len(),
            edges = edges.len(),
            fingerprint = %fingerprint,
            "descriptor synthesized"
        );

        Ok(PlanDescriptor {
            format_version: DESCRIPTOR_FORMAT_VERSION.to_string(),
            stack: plan.stack_name().to_string(),
            launch_type: plan.launch_type(),
            fingerprint,
            resources,
            edges,
            warnings: plan.warnings().to_vec(),
        })
    }
}

fn spec(plan: &ValidatedPlan, id: &ResourceId) -> Result<ResourceSpec, DescriptorError> {
    let missing = || DescriptorError::MissingEntity { id: id.clone() };
    let kind = plan.kind(id).ok_or_else(missing)?;

    let spec = match kind {
        ResourceKind::Network => ResourceSpec::Network(plan.network(id).ok_or_else(missing)?.clone()),
        ResourceKind::LogChannel => {
            ResourceSpec::LogChannel(plan.log_channel(id).ok_or_else(missing)?.clone())
        }
        ResourceKind::Secret => ResourceSpec::Secret(plan.secret(id).ok_or_else(missing)?.clone()),
        ResourceKind::Container => {
            ResourceSpec::Container(plan.container(id).ok_or_else(missing)?.clone())
        }
        ResourceKind::TaskDefinition => {
            let task = plan.task_definition(id).ok_or_else(missing)?;
            ResourceSpec::TaskDefinition(TaskDefinitionProperties {
                cpu_units: task.cpu_units,
                memory_mib: task.memory_mib,
                containers: task.containers.iter().map(|c| c.id.clone()).collect(),
                primary_container: task.primary_container().map(|c| c.id.clone()),
                execution_grants: task.execution_grants.clone(),
            })
        }
        ResourceKind::Cluster => ResourceSpec::Cluster(plan.cluster(id).ok_or_else(missing)?.clone()),
        ResourceKind::LoadBalancer => {
            ResourceSpec::LoadBalancer(plan.load_balancer(id).ok_or_else(missing)?.clone())
        }
        ResourceKind::Service => ResourceSpec::Service(plan.service(id).ok_or_else(missing)?.clone()),
    };
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::PlanBuilder;
    use stackplan_model::{
        ClusterRequest, ContainerRequest, NetworkRequest, PortMappingRequest, ServiceRequest,
        TaskDefinitionRequest,
    };

    fn plan() -> ValidatedPlan {
        let mut builder = PlanBuilder::new("demo");
        builder
            .add_network(NetworkRequest::with_cidr("Vpc", "10.0.0.0/24"))
            .add_cluster(ClusterRequest::new("Cluster", "Vpc"))
            .add_task_definition(
                TaskDefinitionRequest::new("TaskDef", 256, 512).container(
                    ContainerRequest::registry("web", "httpd:2.4")
                        .primary()
                        .port(PortMappingRequest::tcp(80)),
                ),
            )
            .add_service(ServiceRequest::new("Service", "Cluster", "TaskDef"));
        builder.validate().unwrap()
    }

    #[test]
    fn resources_follow_creation_order() {
        let plan = plan();
        let descriptor = Synthesizer::new().synthesize(&plan).unwrap();
        let ids: Vec<&ResourceId> = descriptor.resources.iter().map(|r| &r.id).collect();
        let order: Vec<&ResourceId> = plan.creation_order().iter().collect();
        assert_eq!(ids, order);
        assert_eq!(descriptor.format_version, DESCRIPTOR_FORMAT_VERSION);
    }

    #[test]
    fn fingerprint_verifies_and_detects_edits() {
        let mut descriptor = Synthesizer::new().synthesize(&plan()).unwrap();
        assert!(descriptor.verify_fingerprint().unwrap());

        descriptor.edges.pop();
        assert!(!descriptor.verify_fingerprint().unwrap());
    }

    #[test]
    fn json_round_trips() {
        let descriptor = Synthesizer::new().synthesize(&plan()).unwrap();
        let json = descriptor.to_json_pretty().unwrap();
        assert_eq!(PlanDescriptor::from_json(&json).unwrap(), descriptor);
        assert!(json.contains(r#""kind": "task_definition""#));
    }

    #[test]
    fn yaml_writes_enums_as_maps() {
        let yaml = Synthesizer::new().synthesize(&plan()).unwrap().to_yaml().unwrap();
        assert!(yaml.contains("days: 180"), "{yaml}");
        assert!(!yaml.contains('!'), "{yaml}");
    }

    #[test]
    fn rejects_unknown_format_version() {
        let mut descriptor = Synthesizer::new().synthesize(&plan()).unwrap();
        descriptor.format_version = "0".into();
        let json = descriptor.to_json_pretty().unwrap();
        assert!(matches!(
            PlanDescriptor::from_json(&json),
            Err(DescriptorError::UnsupportedVersion { .. })
        ));
    }
}
