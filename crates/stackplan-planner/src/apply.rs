//! Apply-time collaborator contract
//!
//! The planner never talks to a control plane. [`ApplyCollaborator`] is the
//! seam where a descriptor is handed to something that does: it resolves
//! external references, creates resources respecting the declared edges,
//! and names the resource that failed.
//!
//! [`CatalogCollaborator`] is an in-memory implementation backed by a fixed
//! catalog of existing networks and secrets.

use std::collections::{BTreeMap, BTreeSet};

use stackplan_model::{ApplyError, NetworkSource, Reference, ResourceId};

use crate::descriptor::{PlanDescriptor, ResourceSpec};

/// Consumes plan descriptors
pub trait ApplyCollaborator {
    /// Create or update every resource in `descriptor`
    ///
    /// # Errors
    /// [`ApplyError`] naming the first resource that could not be applied.
    fn apply(&mut self, descriptor: &PlanDescriptor) -> Result<ApplyReport, ApplyError>;
}

/// Outcome of a successful apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Resources in the order they were created
    pub created: Vec<ResourceId>,
    /// Lookup keys resolved, per resource
    pub resolved: BTreeMap<ResourceId, String>,
}

/// In-memory collaborator resolving lookups against a known catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogCollaborator {
    networks: BTreeSet<String>,
    secrets: BTreeSet<String>,
    created: BTreeSet<ResourceId>,
}

impl CatalogCollaborator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing network under its lookup key
    #[must_use]
    pub fn with_network(mut self, key: impl Into<String>) -> Self {
        self.networks.insert(key.into());
        self
    }

    /// Register an existing secret under its store name
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>) -> Self {
        self.secrets.insert(name.into());
        self
    }

    /// Resources created by earlier applies
    pub fn created(&self) -> impl Iterator<Item = &ResourceId> {
        self.created.iter()
    }

    fn resolve(
        catalog: &BTreeSet<String>,
        resource: &ResourceId,
        reference: &Reference,
    ) -> Result<Option<String>, ApplyError> {
        match reference {
            Reference::Literal(_) => Ok(None),
            Reference::ExternalLookup(key) if catalog.contains(key) => Ok(Some(key.clone())),
            Reference::ExternalLookup(key) => Err(ApplyError::UnresolvedReference {
                resource: resource.clone(),
                key: key.clone(),
            }),
        }
    }
}

impl ApplyCollaborator for CatalogCollaborator {
    fn apply(&mut self, descriptor: &PlanDescriptor) -> Result<ApplyReport, ApplyError> {
        let mut report = ApplyReport::default();

        for resource in &descriptor.resources {
            if let Some(missing) = resource
                .depends_on
                .iter()
                .find(|dependency| !self.created.contains(*dependency))
            {
                return Err(ApplyError::ResourceFailed {
                    resource: resource.id.clone(),
                    reason: format!("dependency {missing} has not been created"),
                });
            }

            let resolved = match &resource.spec {
                ResourceSpec::Network(network) => match &network.source {
                    NetworkSource::Lookup { reference } => {
                        Self::resolve(&self.networks, &resource.id, reference)?
                    }
                    NetworkSource::Explicit { .. } => None,
                },
                ResourceSpec::Secret(secret) => Self::resolve(&self.secrets, &resource.id, &secret.name)?,
                _ => None,
            };

            if let Some(key) = resolved {
                tracing::debug!(resource = %resource.id, key = %key, "reference resolved");
                report.resolved.insert(resource.id.clone(), key);
            }

            tracing::debug!(resource = %resource.id, kind = %resource.spec.kind(), "resource applied");
            self.created.insert(resource.id.clone());
            report.created.push(resource.id.clone());
        }

        tracing::info!(
            stack = %descriptor.stack,
            created = report.created.len(),
            resolved = report.resolved.len(),
            "descriptor applied"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::PlanBuilder;
    use crate::synth::Synthesizer;
    use stackplan_model::{
        ClusterRequest, ContainerRequest, NetworkRequest, PortMappingRequest, SecretRequest,
        ServiceRequest, TaskDefinitionRequest,
    };

    fn descriptor(network: NetworkRequest) -> PlanDescriptor {
        let mut builder = PlanBuilder::new("demo");
        builder
            .add_network(network)
            .add_secret(SecretRequest::new("ApiKey", "demo/api-key"))
            .add_cluster(ClusterRequest::new("Cluster", "Vpc"))
            .add_task_definition(
                TaskDefinitionRequest::new("TaskDef", 256, 512).container(
                    ContainerRequest::registry("web", "httpd:2.4")
                        .primary()
                        .port(PortMappingRequest::tcp(80))
                        .secret("API_KEY", "ApiKey"),
                ),
            )
            .add_service(ServiceRequest::new("Service", "Cluster", "TaskDef"));
        Synthesizer::new().synthesize(&builder.validate().unwrap()).unwrap()
    }

    #[test]
    fn applies_in_dependency_order() {
        let descriptor = descriptor(NetworkRequest::with_lookup("Vpc", "vpc-shared"));
        let mut collaborator = CatalogCollaborator::new()
            .with_network("vpc-shared")
            .with_secret("demo/api-key");

        let report = collaborator.apply(&descriptor).unwrap();
        assert_eq!(report.created.len(), descriptor.resources.len());
        assert_eq!(report.resolved.len(), 2);
        assert_eq!(collaborator.created().count(), descriptor.resources.len());
    }

    #[test]
    fn missing_network_names_the_network() {
        let descriptor = descriptor(NetworkRequest::with_lookup("Vpc", "vpc-gone"));
        let mut collaborator = CatalogCollaborator::new().with_secret("demo/api-key");

        let err = collaborator.apply(&descriptor).unwrap_err();
        assert_eq!(
            err,
            ApplyError::UnresolvedReference {
                resource: ResourceId::parse("Vpc").unwrap(),
                key: "vpc-gone".into(),
            }
        );
    }

    #[test]
    fn missing_secret_names_the_secret() {
        let descriptor = descriptor(NetworkRequest::with_cidr("Vpc", "10.0.0.0/24"));
        let err = CatalogCollaborator::new().apply(&descriptor).unwrap_err();
        assert_eq!(err.resource().as_str(), "ApiKey");
    }

    #[test]
    fn out_of_order_descriptor_fails() {
        let mut descriptor = descriptor(NetworkRequest::with_cidr("Vpc", "10.0.0.0/24"));
        descriptor.resources.reverse();
        let err = CatalogCollaborator::new()
            .with_secret("demo/api-key")
            .apply(&descriptor)
            .unwrap_err();
        assert!(matches!(err, ApplyError::ResourceFailed { .. }));
    }
}
