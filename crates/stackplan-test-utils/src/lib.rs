//! Testing utilities for the stackplan workspace
//!
//! Shared fixtures: the reference web + telemetry sidecar stack, its
//! building blocks, and temporary build contexts.

#![allow(missing_docs)]

use std::path::Path;

use stackplan_model::{
    ClusterRequest, ContainerRequest, LaunchType, LogChannelRequest, NetworkRequest, PortMappingRequest,
    SecretRequest, ServiceRequest, SubnetSelection, TaskDefinitionRequest,
};
use stackplan_planner::{PlanBuilder, PlanConfig};
use tempfile::TempDir;

pub const STACK_NAME: &str = "web-stack";
pub const NETWORK_ID: &str = "Vpc";
pub const CLUSTER_ID: &str = "Cluster";
pub const TASK_ID: &str = "TaskDef";
pub const SERVICE_ID: &str = "Service";
pub const SECRET_ID: &str = "ApiKey";

/// Primary container: `httpd` on port 80, logging to channel `web`
pub fn web_container() -> ContainerRequest {
    ContainerRequest::registry("web", "httpd:2.4")
        .primary()
        .port(PortMappingRequest::tcp(80))
        .log_to(LogChannelRequest::new("web"))
}

/// Telemetry sidecar: no ports, logging to channel `telemetry`, with the
/// API key bound to `API_KEY`
pub fn telemetry_container() -> ContainerRequest {
    ContainerRequest::registry("telemetry", "public.ecr.aws/datadog/agent:latest")
        .memory_mib(256)
        .env("ECS_FARGATE", "true")
        .secret("API_KEY", SECRET_ID)
        .log_to(LogChannelRequest::new("telemetry"))
}

pub fn network() -> NetworkRequest {
    NetworkRequest::with_cidr(NETWORK_ID, "10.0.0.0/24").max_azs(2)
}

pub fn task_definition() -> TaskDefinitionRequest {
    TaskDefinitionRequest::new(TASK_ID, 256, 512)
        .container(web_container())
        .container(telemetry_container())
}

/// Private placement, open listener, rollback on a first deployment
pub fn service() -> ServiceRequest {
    ServiceRequest::new(SERVICE_ID, CLUSTER_ID, TASK_ID)
        .desired_count(1)
        .subnets(SubnetSelection::Private)
        .public_listener(true)
        .rollback(true)
}

/// The reference stack as a builder
pub fn scenario_builder() -> PlanBuilder {
    let mut builder = PlanBuilder::new(STACK_NAME);
    builder
        .add_network(network())
        .add_cluster(ClusterRequest::new(CLUSTER_ID, NETWORK_ID).with_insights(true))
        .add_secret(SecretRequest::new(SECRET_ID, "web-stack/api-key"))
        .add_task_definition(task_definition())
        .add_service(service());
    builder
}

/// The reference stack as a configuration document
pub fn scenario_config() -> PlanConfig {
    PlanConfig {
        stack_name: STACK_NAME.to_string(),
        launch_type: LaunchType::default(),
        network: network(),
        cluster: ClusterRequest::new(CLUSTER_ID, NETWORK_ID).with_insights(true),
        secrets: vec![SecretRequest::new(SECRET_ID, "web-stack/api-key")],
        task_definition: task_definition(),
        service: service(),
        dependencies: Vec::new(),
    }
}

/// Temporary directory holding `<name>/Dockerfile`
pub fn build_context(name: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_recipe(dir.path(), name, "Dockerfile");
    dir
}

/// Write a minimal build recipe at `<root>/<name>/<recipe>`
pub fn write_recipe(root: &Path, name: &str, recipe: &str) {
    let context = root.join(name);
    std::fs::create_dir_all(&context).expect("create build context");
    std::fs::write(context.join(recipe), "FROM scratch\n").expect("write build recipe");
}
