//! Stackplan Planner
//!
//! Turns declarative requests for a load-balanced, multi-container service
//! into a dependency-ordered plan descriptor, with a two-phase design:
//! 1. **Construction Phase**: resolve, assemble and validate every resource
//! 2. **Synthesis Phase**: emit a deterministic descriptor from the
//!    validated plan
//!
//! Nothing here performs network I/O. External references (existing
//! networks, secret values) stay unresolved until an [`ApplyCollaborator`]
//! consumes the descriptor.
//!
//! # Quick Start
//!
//! ```rust
//! use stackplan_planner::prelude::*;
//!
//! let mut builder = PlanBuilder::new("web-stack");
//! builder
//!     .add_network(NetworkRequest::with_cidr("Vpc", "10.0.0.0/24"))
//!     .add_cluster(ClusterRequest::new("Cluster", "Vpc"))
//!     .add_task_definition(
//!         TaskDefinitionRequest::new("TaskDef", 256, 512).container(
//!             ContainerRequest::registry("web", "httpd:2.4")
//!                 .primary()
//!                 .port(PortMappingRequest::tcp(80)),
//!         ),
//!     )
//!     .add_service(ServiceRequest::new("Service", "Cluster", "TaskDef"));
//!
//! let plan = builder.validate().unwrap();
//! let descriptor = Synthesizer::new().synthesize(&plan).unwrap();
//! assert_eq!(descriptor.count(ResourceKind::Container), 1);
//! ```

pub mod apply;
pub mod config;
pub mod construction;
pub mod container;
pub mod descriptor;
pub mod graph;
pub mod logs;
pub mod network;
pub mod service;
pub mod synth;
pub mod task;

pub use apply::{ApplyCollaborator, ApplyReport, CatalogCollaborator};
pub use config::{ConfigLoadError, DependencyRequest, PlanConfig};
pub use construction::{PlanBuilder, ValidatedPlan, ValidationReport};
pub use descriptor::{
    DependencyEdge, DescriptorError, PlanDescriptor, ResourceDescriptor, ResourceSpec,
    TaskDefinitionProperties, DESCRIPTOR_FORMAT_VERSION,
};
pub use synth::Synthesizer;

/// Re-export the planner surface and the model types it consumes
pub mod prelude {
    pub use crate::apply::{ApplyCollaborator, ApplyReport, CatalogCollaborator};
    pub use crate::config::PlanConfig;
    pub use crate::construction::{PlanBuilder, ValidatedPlan, ValidationReport};
    pub use crate::descriptor::{PlanDescriptor, ResourceSpec};
    pub use crate::synth::Synthesizer;
    pub use stackplan_model::{
        ApplyError, ClusterRequest, ContainerRequest, ImageRequest, LaunchType, LogChannelRequest,
        LogRetention, NetworkRequest, PlanError, PlanWarning, PortMappingRequest, ResourceId,
        ResourceKind, SecretRequest, ServiceRequest, SubnetSelection, TaskDefinitionRequest,
        TeardownPolicy,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
