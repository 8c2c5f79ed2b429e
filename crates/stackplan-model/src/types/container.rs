use std::collections::BTreeMap;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;
use crate::image::ImageSource;
use crate::types::logs::{LogBinding, LogChannelRequest};

/// Transport protocol of a port mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

/// Requested image, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImageRequest {
    /// `repo[:tag]` pulled from a registry
    Registry(String),
    /// Directory with a build recipe, relative to the plan's base directory
    LocalBuild {
        directory: PathBuf,
        #[serde(default)]
        recipe: Option<String>,
    },
}

/// Requested port exposure; ports are wide so out-of-range input can be
/// reported instead of failing to deserialize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PortMappingRequest {
    pub container_port: u32,
    /// Defaults to `container_port`
    #[serde(default)]
    pub host_port: Option<u32>,
    #[serde(default)]
    pub protocol: Protocol,
}

impl PortMappingRequest {
    pub fn tcp(port: u32) -> Self {
        Self {
            container_port: port,
            host_port: None,
            protocol: Protocol::Tcp,
        }
    }

    #[inline]
    #[must_use]
    pub fn host_port(mut self, port: u32) -> Self {
        self.host_port = Some(port);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SecretBindingRequest {
    /// Environment variable that receives the secret value
    pub env: String,
    /// Id of a declared secret
    pub secret: String,
}

impl SecretBindingRequest {
    pub fn new(env: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            secret: secret.into(),
        }
    }
}

/// An environment variable fed from a secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SecretBinding {
    pub env_var_name: String,
    pub secret: ResourceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LoggingRequest {
    pub channel: LogChannelRequest,
    /// Defaults to the container name
    #[serde(default)]
    pub stream_prefix: Option<String>,
}

/// Declarative container input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ContainerRequest {
    pub name: String,
    pub image: ImageRequest,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub memory_mib: Option<u32>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub secrets: Vec<SecretBindingRequest>,
    /// Defaults to a channel named `/<stack>/<container>`
    #[serde(default)]
    pub logging: Option<LoggingRequest>,
    #[serde(default)]
    pub ports: Vec<PortMappingRequest>,
    /// Receives the load-balanced traffic
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub essential: Option<bool>,
}

impl ContainerRequest {
    pub fn new(name: impl Into<String>, image: ImageRequest) -> Self {
        Self {
            name: name.into(),
            image,
            cpu: None,
            memory_mib: None,
            environment: BTreeMap::new(),
            secrets: Vec::new(),
            logging: None,
            ports: Vec::new(),
            primary: false,
            essential: None,
        }
    }

    pub fn registry(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::new(name, ImageRequest::Registry(reference.into()))
    }

    #[inline]
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn memory_mib(mut self, mib: u32) -> Self {
        self.memory_mib = Some(mib);
        self
    }

    #[inline]
    #[must_use]
    pub fn cpu(mut self, units: u32) -> Self {
        self.cpu = Some(units);
        self
    }

    #[must_use]
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn secret(mut self, env: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.push(SecretBindingRequest::new(env, secret));
        self
    }

    #[must_use]
    pub fn port(mut self, mapping: PortMappingRequest) -> Self {
        self.ports.push(mapping);
        self
    }

    #[must_use]
    pub fn log_to(mut self, channel: LogChannelRequest) -> Self {
        self.logging = Some(LoggingRequest {
            channel,
            stream_prefix: None,
        });
        self
    }
}

/// One runnable unit inside a task definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Container {
    pub id: ResourceId,
    pub task_definition: ResourceId,
    pub name: String,
    pub image: ImageSource,
    pub cpu: Option<u32>,
    pub memory_mib: Option<u32>,
    pub environment: BTreeMap<String, String>,
    pub secrets: Vec<SecretBinding>,
    pub log: LogBinding,
    pub ports: Vec<PortMapping>,
    pub primary: bool,
    pub essential: bool,
}

impl Container {
    /// Port the load balancer routes to, if this is the primary container
    #[must_use]
    pub fn load_balanced_port(&self) -> Option<&PortMapping> {
        if self.primary {
            self.ports.first()
        } else {
            None
        }
    }
}
