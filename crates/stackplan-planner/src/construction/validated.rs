//! Validated Plan
//!
//! [`ValidatedPlan`] has no public constructor. The only way to obtain one
//! is [`crate::PlanBuilder::validate`], so every plan reaching synthesis has
//! passed every construction-time check.

use std::collections::BTreeMap;

use serde::Serialize;
use stackplan_model::{
    Cluster, ConfigError, Container, LaunchType, LoadBalancer, LogChannel, Network, PlanWarning,
    ResourceId, ResourceKind, SecretRef, ServiceTopology, TaskDefinition,
};

use crate::graph::ResourceGraph;

/// Entities accepted during construction, keyed by id
#[derive(Debug, Clone, Default)]
pub(crate) struct PlanEntities {
    pub(crate) networks: BTreeMap<ResourceId, Network>,
    pub(crate) clusters: BTreeMap<ResourceId, Cluster>,
    pub(crate) log_channels: BTreeMap<ResourceId, LogChannel>,
    pub(crate) secrets: BTreeMap<ResourceId, SecretRef>,
    pub(crate) task_definitions: BTreeMap<ResourceId, TaskDefinition>,
    pub(crate) load_balancers: BTreeMap<ResourceId, LoadBalancer>,
    pub(crate) services: BTreeMap<ResourceId, ServiceTopology>,
}

/// Sealed constructor for [`ValidatedPlan`]
pub(crate) struct ValidatedPlanConstructor;

impl ValidatedPlanConstructor {
    /// Seal a plan once every entity has been accepted
    pub(crate) fn construct(
        stack_name: String,
        launch_type: LaunchType,
        entities: PlanEntities,
        graph: ResourceGraph,
        warnings: Vec<PlanWarning>,
    ) -> Result<ValidatedPlan, ConfigError> {
        let creation_order = graph.creation_order()?;
        Ok(ValidatedPlan {
            stack_name,
            launch_type,
            entities,
            graph,
            creation_order,
            warnings,
        })
    }
}

/// A plan that passed construction; immutable
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    stack_name: String,
    launch_type: LaunchType,
    entities: PlanEntities,
    graph: ResourceGraph,
    creation_order: Vec<ResourceId>,
    warnings: Vec<PlanWarning>,
}

impl ValidatedPlan {
    #[inline]
    #[must_use]
    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    #[inline]
    #[must_use]
    pub fn launch_type(&self) -> LaunchType {
        self.launch_type
    }

    /// Non-fatal findings, in the order they were raised
    #[inline]
    #[must_use]
    pub fn warnings(&self) -> &[PlanWarning] {
        &self.warnings
    }

    /// Every resource id, dependencies before dependents
    #[inline]
    #[must_use]
    pub fn creation_order(&self) -> &[ResourceId] {
        &self.creation_order
    }

    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// `(dependency, dependent)` pairs, sorted
    #[must_use]
    pub fn edges(&self) -> Vec<(ResourceId, ResourceId)> {
        self.graph.edges()
    }

    #[must_use]
    pub fn dependencies(&self, id: &ResourceId) -> Vec<ResourceId> {
        self.graph.dependencies(id)
    }

    #[must_use]
    pub fn kind(&self, id: &ResourceId) -> Option<ResourceKind> {
        self.graph.kind(id)
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.entities.networks.values()
    }

    pub fn network(&self, id: &ResourceId) -> Option<&Network> {
        self.entities.networks.get(id)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.entities.clusters.values()
    }

    pub fn cluster(&self, id: &ResourceId) -> Option<&Cluster> {
        self.entities.clusters.get(id)
    }

    pub fn log_channels(&self) -> impl Iterator<Item = &LogChannel> {
        self.entities.log_channels.values()
    }

    pub fn log_channel(&self, id: &ResourceId) -> Option<&LogChannel> {
        self.entities.log_channels.get(id)
    }

    pub fn secrets(&self) -> impl Iterator<Item = &SecretRef> {
        self.entities.secrets.values()
    }

    pub fn secret(&self, id: &ResourceId) -> Option<&SecretRef> {
        self.entities.secrets.get(id)
    }

    pub fn task_definitions(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.entities.task_definitions.values()
    }

    pub fn task_definition(&self, id: &ResourceId) -> Option<&TaskDefinition> {
        self.entities.task_definitions.get(id)
    }

    /// Containers of every task definition
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.entities
            .task_definitions
            .values()
            .flat_map(|task| task.containers.iter())
    }

    pub fn container(&self, id: &ResourceId) -> Option<&Container> {
        self.containers().find(|c| &c.id == id)
    }

    pub fn load_balancers(&self) -> impl Iterator<Item = &LoadBalancer> {
        self.entities.load_balancers.values()
    }

    pub fn load_balancer(&self, id: &ResourceId) -> Option<&LoadBalancer> {
        self.entities.load_balancers.get(id)
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceTopology> {
        self.entities.services.values()
    }

    pub fn service(&self, id: &ResourceId) -> Option<&ServiceTopology> {
        self.entities.services.get(id)
    }

    #[must_use]
    pub fn report(&self) -> ValidationReport {
        let mut resources = BTreeMap::new();
        for id in &self.creation_order {
            if let Some(kind) = self.kind(id) {
                *resources.entry(kind).or_insert(0) += 1;
            }
        }
        ValidationReport {
            stack_name: self.stack_name.clone(),
            resource_count: self.resource_count(),
            edge_count: self.edge_count(),
            resources,
            creation_order: self.creation_order.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

/// Summary returned after successful validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub stack_name: String,
    pub resource_count: usize,
    pub edge_count: usize,
    /// Resource count per kind
    pub resources: BTreeMap<ResourceKind, usize>,
    pub creation_order: Vec<ResourceId>,
    pub warnings: Vec<PlanWarning>,
}
