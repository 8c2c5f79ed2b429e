use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;
use crate::reference::Reference;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SecretRequest {
    pub id: String,
    /// Name of the secret in the external secret store
    pub secret_name: String,
}

impl SecretRequest {
    pub fn new(id: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret_name: secret_name.into(),
        }
    }
}

/// A credential managed outside the plan
///
/// Only the lookup token is carried; the value is resolved at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SecretRef {
    pub id: ResourceId,
    pub name: Reference,
}
