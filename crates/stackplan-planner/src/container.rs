//! Container Assembler
//!
//! Builds a [`Container`] from a [`ContainerRequest`]. Images are parsed or
//! checked for a build recipe on disk, ports and environment names are
//! validated, and the container's log channel is registered with the
//! [`LogChannelRegistry`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use stackplan_model::{
    BuildContext, ConfigError, Container, ContainerRequest, ImageReference, ImageRequest,
    ImageSource, LaunchType, LogBinding, LogChannelRequest, PlanError, PortMapping,
    PortMappingRequest, ResourceId, SecretBinding, DEFAULT_BUILD_RECIPE,
};

use crate::logs::LogChannelRegistry;

static ENV_VAR_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid environment variable regex")
});

/// Assembles containers for one plan
#[derive(Debug, Clone)]
pub struct ContainerAssembler {
    launch_type: LaunchType,
    base_dir: PathBuf,
    stack_name: String,
}

impl ContainerAssembler {
    /// `base_dir` anchors relative build contexts; `stack_name` prefixes
    /// default log channel names
    pub fn new(launch_type: LaunchType, base_dir: impl Into<PathBuf>, stack_name: impl Into<String>) -> Self {
        Self {
            launch_type,
            base_dir: base_dir.into(),
            stack_name: stack_name.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn launch_type(&self) -> LaunchType {
        self.launch_type
    }

    /// Name of the channel a container logs to when none is requested
    #[must_use]
    pub fn default_log_channel(&self, container: &str) -> String {
        format!("/{}/{container}", self.stack_name)
    }

    /// Validate `request` and produce a container owned by `task_definition`
    ///
    /// # Errors
    /// [`ConfigError`] for malformed input, [`stackplan_model::ConflictError`]
    /// when the requested log channel disagrees with an earlier request of
    /// the same name.
    pub fn assemble(
        &self,
        task_definition: &ResourceId,
        request: &ContainerRequest,
        registry: &mut LogChannelRegistry,
    ) -> Result<Container, PlanError> {
        let name = ResourceId::parse(&request.name)?.to_string();
        let owner = format!("container {name}");

        let image = self.resolve_image(&name, &request.image)?;

        for var in request.environment.keys() {
            check_env_name(&name, var)?;
        }

        let mut bound = BTreeSet::new();
        let mut secrets = Vec::with_capacity(request.secrets.len());
        for binding in &request.secrets {
            check_env_name(&name, &binding.env)?;
            if !bound.insert(binding.env.as_str()) {
                return Err(ConfigError::DuplicateSecretBinding {
                    container: name,
                    env_var: binding.env.clone(),
                }
                .into());
            }
            if request.environment.contains_key(&binding.env) {
                return Err(ConfigError::DuplicateEnvironmentVariable {
                    container: name,
                    name: binding.env.clone(),
                }
                .into());
            }
            secrets.push(SecretBinding {
                env_var_name: binding.env.clone(),
                secret: ResourceId::parse(&binding.secret)?,
            });
        }

        let ports = request
            .ports
            .iter()
            .map(|mapping| port_mapping(&owner, mapping))
            .collect::<Result<Vec<_>, _>>()?;

        if request.primary {
            let Some(routed) = ports.first() else {
                return Err(ConfigError::PrimaryWithoutPort { container: name }.into());
            };
            if self.launch_type.requires_port_equality() && routed.host_port != routed.container_port {
                return Err(ConfigError::LoadBalancedPortMismatch {
                    container: name,
                    container_port: routed.container_port,
                    host_port: routed.host_port,
                }
                .into());
            }
        }

        let (channel_request, stream_prefix) = match &request.logging {
            Some(logging) => (
                logging.channel.clone(),
                logging.stream_prefix.clone().unwrap_or_else(|| name.clone()),
            ),
            None => (LogChannelRequest::new(self.default_log_channel(&name)), name.clone()),
        };
        let channel = registry.request(&channel_request)?.id.clone();

        tracing::debug!(
            task_definition = %task_definition,
            container = %name,
            primary = request.primary,
            local_build = image.is_local_build(),
            "container assembled"
        );

        Ok(Container {
            id: ResourceId::for_container(task_definition, &name),
            task_definition: task_definition.clone(),
            image,
            cpu: request.cpu,
            memory_mib: request.memory_mib,
            environment: request.environment.clone(),
            secrets,
            log: LogBinding {
                channel,
                stream_prefix,
            },
            ports,
            primary: request.primary,
            essential: request.essential.unwrap_or(true),
            name,
        })
    }

    fn resolve_image(&self, container: &str, image: &ImageRequest) -> Result<ImageSource, ConfigError> {
        match image {
            ImageRequest::Registry(raw) => {
                let reference: ImageReference =
                    raw.parse().map_err(|source| ConfigError::InvalidImageReference {
                        container: container.to_string(),
                        reference: raw.clone(),
                        source,
                    })?;
                Ok(ImageSource::Registry { reference })
            }
            ImageRequest::LocalBuild { directory, recipe } => {
                let recipe = recipe
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(DEFAULT_BUILD_RECIPE);
                let recipe_path = self.anchor(directory).join(recipe);
                if !recipe_path.is_file() {
                    return Err(ConfigError::MissingBuildContext {
                        container: container.to_string(),
                        path: recipe_path,
                    });
                }
                Ok(ImageSource::LocalBuild(BuildContext {
                    directory: directory.clone(),
                    recipe: recipe.to_string(),
                }))
            }
        }
    }

    fn anchor(&self, directory: &Path) -> PathBuf {
        if directory.is_absolute() {
            directory.to_path_buf()
        } else {
            self.base_dir.join(directory)
        }
    }
}

fn check_env_name(container: &str, var: &str) -> Result<(), ConfigError> {
    if ENV_VAR_NAME.is_match(var) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvironmentVariable {
            container: container.to_string(),
            name: var.to_string(),
        })
    }
}

fn port_mapping(owner: &str, request: &PortMappingRequest) -> Result<PortMapping, ConfigError> {
    let container_port = port(owner, request.container_port)?;
    let host_port = match request.host_port {
        Some(raw) => port(owner, raw)?,
        None => container_port,
    };
    Ok(PortMapping {
        container_port,
        host_port,
        protocol: request.protocol,
    })
}

/// Narrow a requested port to `1..=65535`
pub(crate) fn port(owner: &str, raw: u32) -> Result<u16, ConfigError> {
    u16::try_from(raw)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| ConfigError::PortOutOfRange {
            owner: owner.to_string(),
            port: raw,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackplan_model::{LogRetention, PlanErrorKind};

    fn assembler() -> ContainerAssembler {
        ContainerAssembler::new(LaunchType::Fargate, ".", "demo")
    }

    fn task() -> ResourceId {
        ResourceId::parse("TaskDef").unwrap()
    }

    #[test]
    fn assembles_primary_web_container() {
        let mut registry = LogChannelRegistry::new();
        let request = ContainerRequest::registry("web", "httpd:2.4")
            .primary()
            .port(PortMappingRequest::tcp(80))
            .log_to(LogChannelRequest::new("web"));

        let container = assembler().assemble(&task(), &request, &mut registry).unwrap();

        assert_eq!(container.id.as_str(), "TaskDef/web");
        assert_eq!(container.log.channel.as_str(), "logs:web");
        assert_eq!(container.log.stream_prefix, "web");
        assert_eq!(container.load_balanced_port().map(|p| p.host_port), Some(80));
        assert!(container.essential);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn default_log_channel_is_scoped_to_stack() {
        let mut registry = LogChannelRegistry::new();
        let request = ContainerRequest::registry("datadog", "public.ecr.aws/datadog/agent:latest");
        let container = assembler().assemble(&task(), &request, &mut registry).unwrap();
        assert_eq!(container.log.channel.as_str(), "logs:/demo/datadog");
    }

    #[test]
    fn empty_registry_reference_is_rejected() {
        let mut registry = LogChannelRegistry::new();
        let err = assembler()
            .assemble(&task(), &ContainerRequest::registry("web", "  "), &mut registry)
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::Config(ConfigError::InvalidImageReference { .. })
        ));
    }

    #[test]
    fn local_build_requires_recipe() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = ContainerAssembler::new(LaunchType::Fargate, dir.path(), "demo");
        let request = ContainerRequest::new(
            "app",
            ImageRequest::LocalBuild {
                directory: "app".into(),
                recipe: None,
            },
        );

        let mut registry = LogChannelRegistry::new();
        assert!(matches!(
            assembler.assemble(&task(), &request, &mut registry),
            Err(PlanError::Config(ConfigError::MissingBuildContext { .. }))
        ));

        std::fs::create_dir(dir.path().join("app")).unwrap();
        std::fs::write(dir.path().join("app").join("Dockerfile"), "FROM scratch\n").unwrap();
        let container = assembler.assemble(&task(), &request, &mut registry).unwrap();
        assert!(container.image.is_local_build());
    }

    #[test]
    fn duplicate_secret_binding_is_rejected() {
        let mut registry = LogChannelRegistry::new();
        let request = ContainerRequest::registry("datadog", "datadog/agent")
            .secret("DD_API_KEY", "DatadogApiKey")
            .secret("DD_API_KEY", "OtherKey");
        let err = assembler().assemble(&task(), &request, &mut registry).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Config(ConfigError::DuplicateSecretBinding { .. })
        ));
    }

    #[test]
    fn secret_and_plain_env_collide() {
        let mut registry = LogChannelRegistry::new();
        let request = ContainerRequest::registry("datadog", "datadog/agent")
            .env("DD_API_KEY", "inline")
            .secret("DD_API_KEY", "DatadogApiKey");
        let err = assembler().assemble(&task(), &request, &mut registry).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Config(ConfigError::DuplicateEnvironmentVariable { .. })
        ));
    }

    #[test]
    fn invalid_env_name_is_rejected() {
        let mut registry = LogChannelRegistry::new();
        let request = ContainerRequest::registry("web", "httpd").env("1BAD", "x");
        assert!(assembler().assemble(&task(), &request, &mut registry).is_err());
    }

    #[test]
    fn ports_out_of_range() {
        let mut registry = LogChannelRegistry::new();
        for raw in [0, 65_536] {
            let request = ContainerRequest::registry("web", "httpd").port(PortMappingRequest::tcp(raw));
            let err = assembler().assemble(&task(), &request, &mut registry).unwrap_err();
            assert!(
                matches!(err, PlanError::Config(ConfigError::PortOutOfRange { port, .. }) if port == raw)
            );
        }
    }

    #[test]
    fn fargate_load_balanced_port_must_match_host_port() {
        let mut registry = LogChannelRegistry::new();
        let request = ContainerRequest::registry("web", "httpd")
            .primary()
            .port(PortMappingRequest::tcp(80).host_port(8080));

        let err = assembler().assemble(&task(), &request, &mut registry).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Config(ConfigError::LoadBalancedPortMismatch {
                container_port: 80,
                host_port: 8080,
                ..
            })
        ));

        let ec2 = ContainerAssembler::new(LaunchType::Ec2, ".", "demo");
        assert!(ec2.assemble(&task(), &request, &mut registry).is_ok());
    }

    #[test]
    fn sidecar_ports_are_not_forced_equal() {
        let mut registry = LogChannelRegistry::new();
        let request = ContainerRequest::registry("agent", "datadog/agent")
            .port(PortMappingRequest::tcp(8126).host_port(9126));
        assert!(assembler().assemble(&task(), &request, &mut registry).is_ok());
    }

    #[test]
    fn primary_needs_a_port() {
        let mut registry = LogChannelRegistry::new();
        let request = ContainerRequest::registry("web", "httpd").primary();
        assert!(matches!(
            assembler().assemble(&task(), &request, &mut registry),
            Err(PlanError::Config(ConfigError::PrimaryWithoutPort { .. }))
        ));
    }

    #[test]
    fn conflicting_log_channel_surfaces_conflict() {
        let mut registry = LogChannelRegistry::new();
        let first = ContainerRequest::registry("web", "httpd").log_to(LogChannelRequest::new("shared"));
        let second = ContainerRequest::registry("agent", "datadog/agent")
            .log_to(LogChannelRequest::new("shared").retention(LogRetention::Days(30)));

        assembler().assemble(&task(), &first, &mut registry).unwrap();
        let err = assembler().assemble(&task(), &second, &mut registry).unwrap_err();
        assert_eq!(err.kind(), PlanErrorKind::Conflict);
    }
}
