use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;
use crate::types::network::SubnetKind;

/// Which subnets the service's tasks are placed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubnetSelection {
    Public,
    #[default]
    Private,
}

impl SubnetSelection {
    #[inline]
    #[must_use]
    pub fn kind(self) -> SubnetKind {
        match self {
            Self::Public => SubnetKind::Public,
            Self::Private => SubnetKind::Private,
        }
    }
}

/// Target group health check
///
/// A deployment whose tasks never pass this check within the bounded
/// window is what triggers the circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheck {
    pub path: String,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
    /// Time after task start during which failed checks are ignored
    pub grace_period_secs: Option<u32>,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            interval_secs: 30,
            timeout_secs: 5,
            healthy_threshold: 5,
            unhealthy_threshold: 2,
            grace_period_secs: None,
        }
    }
}

/// Declarative service input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ServiceRequest {
    pub id: String,
    pub cluster: String,
    pub task_definition: String,
    #[serde(default = "ServiceRequest::default_desired_count")]
    pub desired_count: i64,
    #[serde(default)]
    pub subnets: SubnetSelection,
    /// Open the listener to any client address
    #[serde(default = "ServiceRequest::default_expose_public_listener")]
    pub expose_public_listener: bool,
    #[serde(default)]
    pub rollback_on_failure: bool,
    #[serde(default = "ServiceRequest::default_listener_port")]
    pub listener_port: u32,
    #[serde(default)]
    pub health_check: HealthCheck,
    /// Revision of the task definition that last deployed successfully
    #[serde(default)]
    pub last_stable_revision: Option<u32>,
}

impl ServiceRequest {
    pub const DEFAULT_LISTENER_PORT: u32 = 80;

    fn default_desired_count() -> i64 {
        1
    }

    fn default_expose_public_listener() -> bool {
        true
    }

    fn default_listener_port() -> u32 {
        Self::DEFAULT_LISTENER_PORT
    }

    pub fn new(
        id: impl Into<String>,
        cluster: impl Into<String>,
        task_definition: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            cluster: cluster.into(),
            task_definition: task_definition.into(),
            desired_count: Self::default_desired_count(),
            subnets: SubnetSelection::default(),
            expose_public_listener: true,
            rollback_on_failure: false,
            listener_port: Self::DEFAULT_LISTENER_PORT,
            health_check: HealthCheck::default(),
            last_stable_revision: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn desired_count(mut self, count: i64) -> Self {
        self.desired_count = count;
        self
    }

    #[inline]
    #[must_use]
    pub fn subnets(mut self, selection: SubnetSelection) -> Self {
        self.subnets = selection;
        self
    }

    #[inline]
    #[must_use]
    pub fn public_listener(mut self, open: bool) -> Self {
        self.expose_public_listener = open;
        self
    }

    #[inline]
    #[must_use]
    pub fn rollback(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn last_stable_revision(mut self, revision: u32) -> Self {
        self.last_stable_revision = Some(revision);
        self
    }

    #[must_use]
    pub fn health_check(mut self, check: HealthCheck) -> Self {
        self.health_check = check;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ListenerProtocol {
    #[default]
    Http,
}

/// Container port the load balancer forwards to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct LoadBalancerTarget {
    pub container: ResourceId,
    pub port: u16,
}

/// Public entry point of a service: load balancer, listener and target group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct LoadBalancer {
    pub id: ResourceId,
    pub network: ResourceId,
    pub listener_port: u16,
    pub protocol: ListenerProtocol,
    /// Listener accepts traffic from any address
    pub open: bool,
    pub target: LoadBalancerTarget,
    pub health_check: HealthCheck,
}

/// Circuit breaker settings handed to the deployment collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DeploymentPolicy {
    pub circuit_breaker: bool,
    pub rollback_on_failure: bool,
    /// Revision to revert to; `None` on a first deployment
    pub rollback_target_revision: Option<u32>,
}

/// A task definition bound to a cluster behind a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ServiceTopology {
    pub id: ResourceId,
    pub cluster: ResourceId,
    pub task_definition: ResourceId,
    pub load_balancer: ResourceId,
    pub desired_count: u32,
    pub subnets: SubnetSelection,
    pub assign_public_ip: bool,
    pub deployment: DeploymentPolicy,
}

impl ServiceTopology {
    #[inline]
    #[must_use]
    pub fn is_scaled_to_zero(&self) -> bool {
        self.desired_count == 0
    }
}
