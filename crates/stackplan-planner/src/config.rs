//! Declarative plan configuration
//!
//! A [`PlanConfig`] describes the whole stack in one document: one network,
//! one cluster, the secrets, one task definition and one service. It can be
//! loaded from YAML, TOML or JSON, chosen by file extension. Every optional
//! field has a documented default; see the request types in
//! [`stackplan_model`].

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stackplan_model::{
    ClusterRequest, LaunchType, NetworkRequest, PlanError, SecretRequest, ServiceRequest,
    TaskDefinitionRequest,
};

use crate::construction::{PlanBuilder, ValidatedPlan};

/// Errors while loading a configuration document
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format {extension:?}; expected yaml, yml, toml or json")]
    UnsupportedFormat { extension: String },
}

/// Extra ordering edge between two declared resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DependencyRequest {
    pub dependent: String,
    pub dependency: String,
}

/// Complete declarative input for one stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    pub stack_name: String,
    #[serde(default)]
    pub launch_type: LaunchType,
    pub network: NetworkRequest,
    pub cluster: ClusterRequest,
    #[serde(default)]
    pub secrets: Vec<SecretRequest>,
    pub task_definition: TaskDefinitionRequest,
    pub service: ServiceRequest,
    #[serde(default)]
    pub dependencies: Vec<DependencyRequest>,
}

impl PlanConfig {
    /// Load from a file, picking the format by extension
    ///
    /// # Errors
    /// [`ConfigLoadError`] if the file cannot be read, has an unknown
    /// extension, or does not parse.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            "toml" => Self::from_toml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            _ => return Err(ConfigLoadError::UnsupportedFormat { extension }),
        };

        tracing::debug!(path = %path.display(), stack = %config.stack_name, "config loaded");
        Ok(config)
    }

    /// Enum values are written as single-key maps (`image: {registry: httpd:2.4}`),
    /// the same shape TOML and JSON use.
    ///
    /// # Errors
    /// [`ConfigLoadError::Yaml`] on malformed input.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigLoadError> {
        let deserializer = serde_yaml::Deserializer::from_str(text);
        Ok(serde_yaml::with::singleton_map_recursive::deserialize(deserializer)?)
    }

    /// # Errors
    /// [`ConfigLoadError::Toml`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    /// [`ConfigLoadError::Json`] on malformed input.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigLoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builder holding every request in this document
    pub fn to_builder(&self, base_dir: impl Into<PathBuf>) -> PlanBuilder {
        let mut builder = PlanBuilder::new(&self.stack_name)
            .with_launch_type(self.launch_type)
            .with_base_dir(base_dir);
        builder
            .add_network(self.network.clone())
            .add_cluster(self.cluster.clone())
            .add_task_definition(self.task_definition.clone())
            .add_service(self.service.clone());
        for secret in &self.secrets {
            builder.add_secret(secret.clone());
        }
        for dep in &self.dependencies {
            builder.add_dependency(&dep.dependent, &dep.dependency);
        }
        builder
    }

    /// Validate this document into a plan
    ///
    /// # Errors
    /// The first [`PlanError`] found.
    pub fn build(&self, base_dir: impl Into<PathBuf>) -> Result<ValidatedPlan, PlanError> {
        self.to_builder(base_dir).validate()
    }
}
