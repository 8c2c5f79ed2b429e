//! Plan Builder
//!
//! The primary interface for the construction phase. Requests are collected
//! in any order and only checked by [`PlanBuilder::validate`], which either
//! returns a [`ValidatedPlan`] or the first error found. Partial plans are
//! never produced.

use std::path::PathBuf;

use stackplan_model::{
    Cluster, ClusterRequest, ConfigError, LaunchType, NetworkRequest, PlanError, Reference,
    ResourceId, ResourceKind, SecretRef, SecretRequest, ServiceRequest, TaskDefinition,
    TaskDefinitionRequest,
};

use crate::construction::validated::{PlanEntities, ValidatedPlan, ValidatedPlanConstructor};
use crate::container::ContainerAssembler;
use crate::graph::ResourceGraph;
use crate::logs::LogChannelRegistry;
use crate::network::NetworkResolver;
use crate::service::ServicePlanner;
use crate::task::TaskDefinitionBuilder;

/// Builder for validated plans
///
/// Usage:
/// ```rust,ignore
/// let mut builder = PlanBuilder::new("web-stack");
/// builder
///     .add_network(NetworkRequest::with_cidr("Vpc", "10.0.0.0/24"))
///     .add_cluster(ClusterRequest::new("Cluster", "Vpc"))
///     .add_task_definition(task)
///     .add_service(ServiceRequest::new("Service", "Cluster", "TaskDef"));
/// let plan: ValidatedPlan = builder.validate()?;
/// ```
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    stack_name: String,
    launch_type: LaunchType,
    base_dir: PathBuf,
    networks: Vec<NetworkRequest>,
    clusters: Vec<ClusterRequest>,
    secrets: Vec<SecretRequest>,
    task_definitions: Vec<TaskDefinitionRequest>,
    services: Vec<ServiceRequest>,
    dependencies: Vec<(String, String)>,
}

impl PlanBuilder {
    /// Create a new builder for the Fargate launch type, resolving build
    /// contexts against the current directory
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            launch_type: LaunchType::default(),
            base_dir: PathBuf::from("."),
            networks: Vec::new(),
            clusters: Vec::new(),
            secrets: Vec::new(),
            task_definitions: Vec::new(),
            services: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_launch_type(mut self, launch_type: LaunchType) -> Self {
        self.launch_type = launch_type;
        self
    }

    /// Directory that relative build contexts are resolved against
    #[inline]
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

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

    pub fn add_network(&mut self, request: NetworkRequest) -> &mut Self {
        self.networks.push(request);
        self
    }

    pub fn add_cluster(&mut self, request: ClusterRequest) -> &mut Self {
        self.clusters.push(request);
        self
    }

    pub fn add_secret(&mut self, request: SecretRequest) -> &mut Self {
        self.secrets.push(request);
        self
    }

    pub fn add_task_definition(&mut self, request: TaskDefinitionRequest) -> &mut Self {
        self.task_definitions.push(request);
        self
    }

    pub fn add_service(&mut self, request: ServiceRequest) -> &mut Self {
        self.services.push(request);
        self
    }

    /// Require `dependent` to be created after `dependency`, on top of the
    /// edges implied by references
    pub fn add_dependency(&mut self, dependent: impl Into<String>, dependency: impl Into<String>) -> &mut Self {
        self.dependencies.push((dependent.into(), dependency.into()));
        self
    }

    /// Validate every request and seal the plan
    ///
    /// Requests are processed leaves first: networks, secrets, clusters,
    /// task definitions (with their containers and log channels), services,
    /// then explicit dependencies.
    ///
    /// # Errors
    /// The first [`PlanError`] encountered; nothing is emitted on failure.
    pub fn validate(self) -> Result<ValidatedPlan, PlanError> {
        ResourceId::parse(&self.stack_name)?;

        let mut graph = ResourceGraph::new();
        let mut entities = PlanEntities::default();
        let mut warnings = Vec::new();

        let resolver = NetworkResolver::new();
        for request in &self.networks {
            let network = resolver.resolve(request)?;
            graph.add_resource(network.id.clone(), ResourceKind::Network)?;
            entities.networks.insert(network.id.clone(), network);
        }

        for request in &self.secrets {
            let secret = secret_ref(request)?;
            graph.add_resource(secret.id.clone(), ResourceKind::Secret)?;
            tracing::debug!(secret = %secret.id, "secret reference accepted");
            entities.secrets.insert(secret.id.clone(), secret);
        }

        for request in &self.clusters {
            let id = ResourceId::parse(&request.id)?;
            let network = ResourceId::parse(&request.network)?;
            if !entities.networks.contains_key(&network) {
                return Err(unknown(&id, &network).into());
            }
            graph.add_resource(id.clone(), ResourceKind::Cluster)?;
            graph.add_edge(&network, &id)?;
            tracing::debug!(cluster = %id, network = %network, "cluster accepted");
            entities.clusters.insert(
                id.clone(),
                Cluster {
                    id,
                    network,
                    insights_enabled: request.container_insights,
                },
            );
        }

        let assembler = ContainerAssembler::new(self.launch_type, &self.base_dir, &self.stack_name);
        let mut registry = LogChannelRegistry::new();
        let mut tasks = Vec::with_capacity(self.task_definitions.len());
        for request in &self.task_definitions {
            tasks.push(assemble_task(request, &assembler, &mut registry, self.launch_type)?);
        }

        for channel in registry.into_channels() {
            graph.add_resource(channel.id.clone(), ResourceKind::LogChannel)?;
            entities.log_channels.insert(channel.id.clone(), channel);
        }

        for task in tasks {
            graph.add_resource(task.id.clone(), ResourceKind::TaskDefinition)?;
            for container in &task.containers {
                graph.add_resource(container.id.clone(), ResourceKind::Container)?;
                graph.add_edge(&container.log.channel, &container.id)?;
                for binding in &container.secrets {
                    if !entities.secrets.contains_key(&binding.secret) {
                        return Err(unknown(&container.id, &binding.secret).into());
                    }
                    graph.add_edge(&binding.secret, &container.id)?;
                }
                graph.add_edge(&container.id, &task.id)?;
            }
            entities.task_definitions.insert(task.id.clone(), task);
        }

        let planner = ServicePlanner::new();
        for request in &self.services {
            let id = ResourceId::parse(&request.id)?;
            let cluster_id = ResourceId::parse(&request.cluster)?;
            let task_id = ResourceId::parse(&request.task_definition)?;

            let cluster = entities
                .clusters
                .get(&cluster_id)
                .ok_or_else(|| unknown(&id, &cluster_id))?;
            let task = entities
                .task_definitions
                .get(&task_id)
                .ok_or_else(|| unknown(&id, &task_id))?;
            let network = entities
                .networks
                .get(&cluster.network)
                .ok_or_else(|| unknown(&cluster.id, &cluster.network))?;

            let planned = planner.plan(request, network, cluster, task)?;
            let lb = planned.load_balancer;
            let service = planned.service;

            graph.add_resource(lb.id.clone(), ResourceKind::LoadBalancer)?;
            graph.add_resource(service.id.clone(), ResourceKind::Service)?;
            graph.add_edge(&lb.network, &lb.id)?;
            graph.add_edge(&lb.id, &service.id)?;
            graph.add_edge(&service.cluster, &service.id)?;
            graph.add_edge(&service.task_definition, &service.id)?;

            warnings.extend(planned.warnings);
            entities.load_balancers.insert(lb.id.clone(), lb);
            entities.services.insert(service.id.clone(), service);
        }

        for (dependent, dependency) in &self.dependencies {
            let unknown_edge = || ConfigError::UnknownReference {
                from: dependent.clone(),
                to: dependency.clone(),
            };
            let dependent = graph.lookup(dependent).cloned().ok_or_else(unknown_edge)?;
            let dependency = graph.lookup(dependency).cloned().ok_or_else(unknown_edge)?;
            graph.add_edge(&dependency, &dependent)?;
        }

        let plan = ValidatedPlanConstructor::construct(
            self.stack_name,
            self.launch_type,
            entities,
            graph,
            warnings,
        )?;

        tracing::info!(
            stack = plan.stack_name(),
            resources = plan.resource_count(),
            edges = plan.edge_count(),
            warnings = plan.warnings().len(),
            "plan validated"
        );

        Ok(plan)
    }
}

fn secret_ref(request: &SecretRequest) -> Result<SecretRef, ConfigError> {
    let id = ResourceId::parse(&request.id)?;
    let name = request.secret_name.trim();
    if name.is_empty() {
        return Err(ConfigError::EmptySecretName {
            secret: request.id.clone(),
        });
    }
    Ok(SecretRef {
        id,
        name: Reference::lookup(name),
    })
}

fn assemble_task(
    request: &TaskDefinitionRequest,
    assembler: &ContainerAssembler,
    registry: &mut LogChannelRegistry,
    launch_type: LaunchType,
) -> Result<TaskDefinition, PlanError> {
    let id = ResourceId::parse(&request.id)?;
    let mut builder = TaskDefinitionBuilder::new(id, request.cpu, request.memory_mib);
    for container in &request.containers {
        if builder.contains(&container.name) {
            return Err(ConfigError::DuplicateContainerName {
                task_definition: request.id.clone(),
                container: container.name.clone(),
            }
            .into());
        }
        let container = assembler.assemble(builder.id(), container, registry)?;
        builder.add_container(container)?;
    }
    builder.build(launch_type)
}

fn unknown(from: &ResourceId, to: &ResourceId) -> ConfigError {
    ConfigError::UnknownReference {
        from: from.to_string(),
        to: to.to_string(),
    }
}
