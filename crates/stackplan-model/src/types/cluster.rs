use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClusterRequest {
    pub id: String,
    pub network: String,
    #[serde(default)]
    pub container_insights: bool,
}

impl ClusterRequest {
    pub fn new(id: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            network: network.into(),
            container_insights: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_insights(mut self, enabled: bool) -> Self {
        self.container_insights = enabled;
        self
    }
}

/// A named pool of capacity bound to one network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Cluster {
    pub id: ResourceId,
    pub network: ResourceId,
    pub insights_enabled: bool,
}
