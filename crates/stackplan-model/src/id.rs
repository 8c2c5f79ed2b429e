//! Resource identity
//!
//! User-declared ids follow a small grammar so they stay usable as logical
//! names in any downstream template format. Ids the planner derives (log
//! channels, containers, load balancers) are built through the dedicated
//! constructors below and are not re-checked against that grammar.

use std::borrow::Borrow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

static RESOURCE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{0,63}$").expect("valid resource id regex"));

/// Logical identity of a planned resource
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Parse a user-declared id
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidResourceId`] if `raw` does not match
    /// `^[A-Za-z][A-Za-z0-9_-]{0,63}$`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if RESOURCE_ID.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ConfigError::InvalidResourceId {
                id: raw.to_string(),
            })
        }
    }

    /// Id of the log channel with the given channel name
    #[must_use]
    pub fn for_log_channel(name: &str) -> Self {
        Self(format!("logs:{name}"))
    }

    /// Id of a container inside a task definition
    #[must_use]
    pub fn for_container(task_definition: &ResourceId, name: &str) -> Self {
        Self(format!("{}/{name}", task_definition.0))
    }

    /// Id of the load balancer fronting a service
    #[must_use]
    pub fn for_load_balancer(service: &ResourceId) -> Self {
        Self(format!("{}-lb", service.0))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of a planned resource
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    LogChannel,
    Secret,
    Container,
    TaskDefinition,
    Cluster,
    LoadBalancer,
    Service,
}

impl ResourceKind {
    /// Tie-break rank among resources that are ready for creation at the
    /// same time. Lower ranks are emitted first.
    #[inline]
    #[must_use]
    pub const fn creation_rank(self) -> u8 {
        match self {
            Self::Network => 0,
            Self::LogChannel => 1,
            Self::Secret => 2,
            Self::Container => 3,
            Self::TaskDefinition => 4,
            Self::Cluster => 5,
            Self::LoadBalancer => 6,
            Self::Service => 7,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::LogChannel => "log_channel",
            Self::Secret => "secret",
            Self::Container => "container",
            Self::TaskDefinition => "task_definition",
            Self::Cluster => "cluster",
            Self::LoadBalancer => "load_balancer",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
