//! Service Topology Planner
//!
//! Binds a task definition and a cluster into a [`ServiceTopology`] and the
//! [`LoadBalancer`] in front of it. Placement is checked against the
//! network's subnet layout; rollback eligibility is decided here so the
//! deployment collaborator only has to act on the recorded policy.

use stackplan_model::{
    Cluster, ConfigError, DeploymentPolicy, HealthCheck, ListenerProtocol, LoadBalancer,
    LoadBalancerTarget, Network, PlanError, PlanWarning, ResourceId, ServiceRequest,
    ServiceTopology, SubnetKind, SubnetSelection, TaskDefinition,
};

use crate::container::port;

/// Accepted health check threshold counts
pub const HEALTH_CHECK_THRESHOLDS: std::ops::RangeInclusive<u32> = 2..=10;

/// A service and its load balancer, with any non-fatal findings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedService {
    pub service: ServiceTopology,
    pub load_balancer: LoadBalancer,
    pub warnings: Vec<PlanWarning>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServicePlanner;

impl ServicePlanner {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Plan one service
    ///
    /// # Errors
    /// - [`ConfigError::InvalidDesiredCount`] for negative or oversized counts
    /// - [`ConfigError::MissingSubnets`] when an availability zone lacks a
    ///   subnet of the selected kind, or a public subnet for an open listener
    /// - [`ConfigError::InvalidHealthCheck`], [`ConfigError::PortOutOfRange`]
    ///   and [`ConfigError::PrimaryWithoutPort`] for the load balancer
    pub fn plan(
        &self,
        request: &ServiceRequest,
        network: &Network,
        cluster: &Cluster,
        task_definition: &TaskDefinition,
    ) -> Result<PlannedService, PlanError> {
        let id = ResourceId::parse(&request.id)?;

        let desired_count =
            u32::try_from(request.desired_count).map_err(|_| ConfigError::InvalidDesiredCount {
                service: request.id.clone(),
                count: request.desired_count,
            })?;

        check_placement(&request.id, network, request.subnets.kind())?;
        if request.expose_public_listener && request.subnets != SubnetSelection::Public {
            check_placement(&request.id, network, SubnetKind::Public)?;
        }

        check_health(&request.id, &request.health_check)?;
        let listener_port = port(&format!("service {}", request.id), request.listener_port)?;

        let primary = task_definition.primary_container().ok_or_else(|| {
            ConfigError::NoPrimaryContainer {
                task_definition: task_definition.id.to_string(),
            }
        })?;
        let routed = primary
            .load_balanced_port()
            .ok_or_else(|| ConfigError::PrimaryWithoutPort {
                container: primary.name.clone(),
            })?;

        let load_balancer = LoadBalancer {
            id: ResourceId::for_load_balancer(&id),
            network: network.id.clone(),
            listener_port,
            protocol: ListenerProtocol::Http,
            open: request.expose_public_listener,
            target: LoadBalancerTarget {
                container: primary.id.clone(),
                port: routed.container_port,
            },
            health_check: request.health_check.clone(),
        };

        let mut warnings = Vec::new();
        let rollback_target_revision = if request.rollback_on_failure {
            match request.last_stable_revision {
                Some(revision) => Some(revision),
                None => {
                    let warning = PlanWarning::RollbackWithoutStableRevision {
                        service: id.clone(),
                    };
                    tracing::warn!(service = %id, "{warning}");
                    warnings.push(warning);
                    None
                }
            }
        } else {
            None
        };

        let service = ServiceTopology {
            load_balancer: load_balancer.id.clone(),
            cluster: cluster.id.clone(),
            task_definition: task_definition.id.clone(),
            desired_count,
            subnets: request.subnets,
            assign_public_ip: request.subnets == SubnetSelection::Public,
            deployment: DeploymentPolicy {
                circuit_breaker: request.rollback_on_failure,
                rollback_on_failure: request.rollback_on_failure,
                rollback_target_revision,
            },
            id,
        };

        tracing::debug!(
            service = %service.id,
            desired_count,
            subnets = ?service.subnets,
            scaled_to_zero = service.is_scaled_to_zero(),
            "service planned"
        );

        Ok(PlannedService {
            service,
            load_balancer,
            warnings,
        })
    }
}

fn check_placement(service: &str, network: &Network, kind: SubnetKind) -> Result<(), ConfigError> {
    let Some(layout) = network.subnets() else {
        tracing::debug!(service, network = %network.id, %kind, "subnet check deferred to apply time");
        return Ok(());
    };

    match (0..network.max_azs).find(|az| !layout.covers(kind, *az)) {
        Some(az_index) => Err(ConfigError::MissingSubnets {
            service: service.to_string(),
            kind,
            az_index,
        }),
        None => Ok(()),
    }
}

fn check_health(service: &str, check: &HealthCheck) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidHealthCheck {
        service: service.to_string(),
        reason,
    };

    if !check.path.starts_with('/') {
        return Err(invalid(format!("path {:?} must start with '/'", check.path)));
    }
    if check.timeout_secs == 0 || check.timeout_secs >= check.interval_secs {
        return Err(invalid(format!(
            "timeout {}s must be positive and shorter than interval {}s",
            check.timeout_secs, check.interval_secs
        )));
    }
    for (label, value) in [
        ("healthy", check.healthy_threshold),
        ("unhealthy", check.unhealthy_threshold),
    ] {
        if !HEALTH_CHECK_THRESHOLDS.contains(&value) {
            return Err(invalid(format!("{label} threshold {value} is outside 2..=10")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerAssembler;
    use crate::logs::LogChannelRegistry;
    use crate::network::NetworkResolver;
    use crate::task::TaskDefinitionBuilder;
    use stackplan_model::{
        ContainerRequest, LaunchType, NetworkRequest, PortMappingRequest, SubnetGroupRequest,
    };

    fn network(request: NetworkRequest) -> Network {
        NetworkResolver::new().resolve(&request).unwrap()
    }

    fn vpc() -> Network {
        network(NetworkRequest::with_cidr("Vpc", "10.0.0.0/24"))
    }

    fn cluster(network: &Network) -> Cluster {
        Cluster {
            id: ResourceId::parse("Cluster").unwrap(),
            network: network.id.clone(),
            insights_enabled: true,
        }
    }

    fn task() -> TaskDefinition {
        let id = ResourceId::parse("TaskDef").unwrap();
        let mut registry = LogChannelRegistry::new();
        let web = ContainerAssembler::new(LaunchType::Fargate, ".", "demo")
            .assemble(
                &id,
                &ContainerRequest::registry("web", "httpd:2.4")
                    .primary()
                    .port(PortMappingRequest::tcp(80)),
                &mut registry,
            )
            .unwrap();
        let mut builder = TaskDefinitionBuilder::new(id, 256, 512);
        builder.add_container(web).unwrap();
        builder.build(LaunchType::Fargate).unwrap()
    }

    fn plan(request: &ServiceRequest, network: &Network) -> Result<PlannedService, PlanError> {
        ServicePlanner::new().plan(request, network, &cluster(network), &task())
    }

    #[test]
    fn private_service_behind_open_listener() {
        let vpc = vpc();
        let planned = plan(&ServiceRequest::new("Service", "Cluster", "TaskDef"), &vpc).unwrap();

        assert_eq!(planned.load_balancer.id.as_str(), "Service-lb");
        assert_eq!(planned.load_balancer.target.container.as_str(), "TaskDef/web");
        assert_eq!(planned.load_balancer.target.port, 80);
        assert_eq!(planned.load_balancer.listener_port, 80);
        assert!(planned.load_balancer.open);
        assert!(!planned.service.assign_public_ip);
        assert!(planned.warnings.is_empty());
    }

    #[test]
    fn scaled_to_zero_is_valid() {
        let planned = plan(
            &ServiceRequest::new("Service", "Cluster", "TaskDef").desired_count(0),
            &vpc(),
        )
        .unwrap();
        assert!(planned.service.is_scaled_to_zero());
    }

    #[test]
    fn negative_desired_count() {
        let err = plan(
            &ServiceRequest::new("Service", "Cluster", "TaskDef").desired_count(-1),
            &vpc(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PlanError::Config(ConfigError::InvalidDesiredCount { count: -1, .. })
        ));
    }

    #[test]
    fn private_placement_needs_private_subnets() {
        let public_only = network(
            NetworkRequest::with_cidr("Vpc", "10.0.0.0/24")
                .subnet_groups(vec![SubnetGroupRequest::new("public", SubnetKind::Public)]),
        );
        let err = plan(&ServiceRequest::new("Service", "Cluster", "TaskDef"), &public_only).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Config(ConfigError::MissingSubnets {
                kind: SubnetKind::Private,
                az_index: 0,
                ..
            })
        ));
    }

    #[test]
    fn open_listener_needs_public_subnets() {
        let private_only = network(
            NetworkRequest::with_cidr("Vpc", "10.0.0.0/24")
                .subnet_groups(vec![SubnetGroupRequest::new("private", SubnetKind::Private)]),
        );
        let request = ServiceRequest::new("Service", "Cluster", "TaskDef");
        assert!(matches!(
            plan(&request, &private_only),
            Err(PlanError::Config(ConfigError::MissingSubnets {
                kind: SubnetKind::Public,
                ..
            }))
        ));
        assert!(plan(&request.public_listener(false), &private_only).is_ok());
    }

    #[test]
    fn lookup_network_defers_placement() {
        let shared = network(NetworkRequest::with_lookup("Vpc", "vpc-shared"));
        assert!(plan(&ServiceRequest::new("Service", "Cluster", "TaskDef"), &shared).is_ok());
    }

    #[test]
    fn public_placement_assigns_public_ip() {
        let planned = plan(
            &ServiceRequest::new("Service", "Cluster", "TaskDef").subnets(SubnetSelection::Public),
            &vpc(),
        )
        .unwrap();
        assert!(planned.service.assign_public_ip);
    }

    #[test]
    fn rollback_on_first_deployment_warns() {
        let planned = plan(
            &ServiceRequest::new("Service", "Cluster", "TaskDef").rollback(true),
            &vpc(),
        )
        .unwrap();
        assert_eq!(
            planned.warnings,
            vec![PlanWarning::RollbackWithoutStableRevision {
                service: ResourceId::parse("Service").unwrap()
            }]
        );
        assert!(planned.service.deployment.circuit_breaker);
        assert_eq!(planned.service.deployment.rollback_target_revision, None);
    }

    #[test]
    fn rollback_with_stable_revision_is_clean() {
        let planned = plan(
            &ServiceRequest::new("Service", "Cluster", "TaskDef")
                .rollback(true)
                .last_stable_revision(3),
            &vpc(),
        )
        .unwrap();
        assert!(planned.warnings.is_empty());
        assert_eq!(planned.service.deployment.rollback_target_revision, Some(3));
    }

    #[test]
    fn health_check_validation() {
        let bad_path = HealthCheck {
            path: "health".into(),
            ..HealthCheck::default()
        };
        let slow_timeout = HealthCheck {
            timeout_secs: 30,
            ..HealthCheck::default()
        };
        let low_threshold = HealthCheck {
            healthy_threshold: 1,
            ..HealthCheck::default()
        };

        for check in [bad_path, slow_timeout, low_threshold] {
            let request = ServiceRequest::new("Service", "Cluster", "TaskDef").health_check(check);
            assert!(matches!(
                plan(&request, &vpc()),
                Err(PlanError::Config(ConfigError::InvalidHealthCheck { .. }))
            ));
        }
    }

    #[test]
    fn listener_port_out_of_range() {
        let mut request = ServiceRequest::new("Service", "Cluster", "TaskDef");
        request.listener_port = 70_000;
        assert!(matches!(
            plan(&request, &vpc()),
            Err(PlanError::Config(ConfigError::PortOutOfRange { port: 70_000, .. }))
        ));
    }
}
