//! Stackplan Resource Model
//!
//! Typed entities for a single-network, load-balanced, multi-container
//! service plan.
//!
//! # Core Concepts
//!
//! - [`ResourceId`]: Logical identity of every planned resource
//! - [`Reference`]: A value that is either known now or looked up at apply time
//! - [`Ipv4Cidr`]: Address blocks for networks and subnets
//! - [`ImageSource`]: Registry pull or local build of a container image
//! - Entities in [`types`]: networks, clusters, log channels, secrets,
//!   containers, task definitions, load balancers and services
//!
//! Every entity has a matching `*Request` type: the declarative input that
//! the planner validates and turns into the entity. Entities are never
//! mutated once validated.
//!
//! # Example
//!
//! ```rust
//! use stackplan_model::{Ipv4Cidr, Reference, ResourceId};
//!
//! let cidr: Ipv4Cidr = "10.0.0.0/24".parse().unwrap();
//! assert_eq!(cidr.prefix(), 24);
//!
//! let id = ResourceId::parse("web-service").unwrap();
//! assert_eq!(id.as_str(), "web-service");
//!
//! let secret = Reference::lookup("DatadogApiKey");
//! assert!(!secret.is_resolved());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cidr;
mod error;
mod id;
mod image;
mod reference;

pub mod types;

pub use cidr::Ipv4Cidr;
pub use error::{
    ApplyError, CapacityError, ConfigError, ConflictError, PlanError, PlanErrorKind, PlanWarning,
};
pub use id::{ResourceId, ResourceKind};
pub use image::{BuildContext, ImageReference, ImageReferenceError, ImageSource, DEFAULT_BUILD_RECIPE};
pub use reference::Reference;

pub use types::{
    Cluster, ClusterRequest, Container, ContainerRequest, DeploymentPolicy, ExecutionGrants,
    HealthCheck, ImageRequest, LaunchType, ListenerProtocol, LoadBalancer, LoadBalancerTarget,
    LogBinding, LogChannel, LogChannelRequest, LogRetention, LoggingRequest, Network,
    NetworkRequest, NetworkSource, PortMapping, PortMappingRequest, Protocol, SecretBinding,
    SecretBindingRequest, SecretRef, SecretRequest, ServiceRequest, ServiceTopology, Subnet,
    SubnetGroupRequest, SubnetKind, SubnetLayout, SubnetSelection, TaskDefinition,
    TaskDefinitionRequest, TeardownPolicy,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
