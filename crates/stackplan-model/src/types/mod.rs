//! Plan entities and their declarative requests
//!
//! Dependency shape (edges point from dependency to dependent):
//!
//! ```text
//! Network ──> Cluster ─────────────┐
//!    │                             v
//!    └──> LoadBalancer ──────> ServiceTopology
//!                                  ^
//! LogChannel ─┐                    │
//!             ├─> Container ─> TaskDefinition
//! SecretRef ──┘
//! ```

mod cluster;
mod container;
mod logs;
mod network;
mod secret;
mod service;
mod task;

pub use cluster::{Cluster, ClusterRequest};
pub use container::{
    Container, ContainerRequest, ImageRequest, LoggingRequest, PortMapping, PortMappingRequest,
    Protocol, SecretBinding, SecretBindingRequest,
};
pub use logs::{LogBinding, LogChannel, LogChannelRequest, LogRetention, TeardownPolicy};
pub use network::{
    Network, NetworkRequest, NetworkSource, Subnet, SubnetGroupRequest, SubnetKind, SubnetLayout,
};
pub use secret::{SecretRef, SecretRequest};
pub use service::{
    DeploymentPolicy, HealthCheck, ListenerProtocol, LoadBalancer, LoadBalancerTarget,
    ServiceRequest, ServiceTopology, SubnetSelection,
};
pub use task::{ExecutionGrants, LaunchType, TaskDefinition, TaskDefinitionRequest};
