//! Compute service builder: cluster, task definition, and managed service
//!
//! The build is logically sequential: the cluster and task definition must
//! exist before a container can be attached, and the log sink must exist
//! before the container's logging driver can reference it. Each descriptor
//! is immutable once produced.

use crate::config::StackConfig;
use crate::error::TopologyError;
use crate::naming::{self, qualifier};
use crate::topology::iam::ServiceRoles;
use crate::topology::logs::{LogSinkDescriptor, TASK_LOG_RETENTION_DAYS};
use crate::topology::network::NetworkTopology;
use crate::topology::security_group::{Protocol, SecurityGroupDescriptor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Task CPU shape, in CPU units (1024 = one vCPU)
pub const TASK_CPU_UNITS: u32 = 256;

/// Task memory shape, in MiB
pub const TASK_MEMORY_MIB: u32 = 512;

/// Seconds between health probe invocations
pub const HEALTH_CHECK_INTERVAL_SECS: u64 = 10;

/// Seconds before a single probe invocation is considered hung
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

/// Consecutive probe failures before a task is marked unhealthy
pub const HEALTH_CHECK_RETRIES: u32 = 3;

/// Floor of running tasks during a deployment, as percent of desired count
pub const MIN_HEALTHY_PERCENT: u32 = 100;

/// Ceiling of running tasks during a deployment, as percent of desired count
pub const MAX_HEALTHY_PERCENT: u32 = 200;

/// CPU architecture of the task runtime platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(non_camel_case_types)]
pub enum CpuArchitecture {
    X86_64,
    Arm64,
}

/// Operating system family of the task runtime platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OsFamily {
    Linux,
}

/// Runtime platform a task definition is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimePlatform {
    pub cpu_architecture: CpuArchitecture,
    pub os_family: OsFamily,
}

/// Shell-based container health probe.
///
/// The orchestrator runs the command on the configured interval; after
/// the configured number of consecutive failures the task is marked
/// unhealthy and the orchestrator, not this builder, drives the restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub command: Vec<String>,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl HealthCheck {
    /// The standard HTTP liveness probe against the container itself
    pub fn http_localhost() -> Self {
        Self {
            command: vec![
                "CMD-SHELL".to_string(),
                "curl -f http://localhost/ || exit 1".to_string(),
            ],
            interval_secs: HEALTH_CHECK_INTERVAL_SECS,
            timeout_secs: HEALTH_CHECK_TIMEOUT_SECS,
            retries: HEALTH_CHECK_RETRIES,
        }
    }
}

/// A container port exposed to the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: Protocol,
}

/// One container attached to a task definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub port_mappings: Vec<PortMapping>,
    pub health_check: HealthCheck,
    /// Log sink the logging driver ships to, referenced by identity
    pub log_sink: String,
    pub log_stream_prefix: String,
}

/// Logical cluster the service runs in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDescriptor {
    pub name: String,
    /// Owning network, referenced by identity
    pub vpc: String,
    pub container_insights: bool,
    pub fargate_capacity_providers: bool,
}

/// Task shape: runtime platform, identities, and containers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinitionDescriptor {
    pub family: String,
    pub cpu_units: u32,
    pub memory_mib: u32,
    pub runtime_platform: RuntimePlatform,
    /// Identity the orchestrator uses to pull images and ship logs
    pub execution_role: String,
    /// Identity the running container uses to call other services
    pub task_role: String,
    pub containers: Vec<ContainerSpec>,
}

/// How the orchestrator replaces tasks during a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPolicy {
    pub min_healthy_percent: u32,
    pub max_healthy_percent: u32,
    /// Stop a failing deployment instead of retrying it forever
    pub circuit_breaker: bool,
    /// Revert to the last known-good task definition on failure
    pub rollback_on_failure: bool,
}

impl DeploymentPolicy {
    /// Rolling replacement: never below the full desired count, at most
    /// double while replacing, rollback on repeated health-check failure
    pub fn rolling() -> Self {
        Self {
            min_healthy_percent: MIN_HEALTHY_PERCENT,
            max_healthy_percent: MAX_HEALTHY_PERCENT,
            circuit_breaker: true,
            rollback_on_failure: true,
        }
    }

    /// The bounds must straddle the full desired count
    pub fn validate(&self) -> bool {
        self.min_healthy_percent <= 100 && 100 <= self.max_healthy_percent
    }
}

/// Declarative description of the managed service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    /// Owning cluster, referenced by identity
    pub cluster: String,
    /// Task definition family, referenced by identity
    pub task_definition: String,
    pub desired_count: u32,
    pub deployment: DeploymentPolicy,
    /// Attached security groups, referenced by identity
    pub security_groups: Vec<String>,
    pub assign_public_ip: bool,
}

/// An endpoint a load-balancer target group can register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub service: String,
    pub container: String,
    pub port: u16,
}

/// The full output of the compute service builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeService {
    pub cluster: ClusterDescriptor,
    pub task_definition: TaskDefinitionDescriptor,
    pub log_sink: LogSinkDescriptor,
    pub service: ServiceDescriptor,
}

impl ComputeService {
    /// The attachable endpoint a listener's target group forwards to, if
    /// the task exposes one
    pub fn target(&self) -> Option<ServiceTarget> {
        let container = self.task_definition.containers.first()?;
        let mapping = container.port_mappings.first()?;
        Some(ServiceTarget {
            service: self.service.name.clone(),
            container: container.name.clone(),
            port: mapping.container_port,
        })
    }
}

/// Build the cluster, task definition, log sink, container, and service.
///
/// The attached security group must already express its reachability
/// dependency on the edge tier; attaching an internal group with no
/// group-sourced ingress rule is a composition-order error.
pub fn build(
    config: &StackConfig,
    network: &NetworkTopology,
    roles: &ServiceRoles,
    security_group: &SecurityGroupDescriptor,
) -> Result<ComputeService, TopologyError> {
    let prefix = &config.name_prefix;

    if roles.execution.name == roles.task.name {
        return Err(TopologyError::DuplicateName {
            name: roles.execution.name.clone(),
        });
    }
    if security_group.vpc != network.vpc_name {
        return Err(TopologyError::MissingDependency {
            resource: security_group.name.clone(),
            dependency: network.vpc_name.clone(),
        });
    }
    if !security_group.has_group_source() {
        // the edge-to-internal path must be declared before the group is
        // attached to any compute service
        return Err(TopologyError::MissingDependency {
            resource: security_group.name.clone(),
            dependency: "an edge security group ingress".to_string(),
        });
    }

    let cluster = ClusterDescriptor {
        name: naming::resource_name(prefix, qualifier::CLUSTER),
        vpc: network.vpc_name.clone(),
        container_insights: true,
        fargate_capacity_providers: true,
    };
    info!(cluster = %cluster.name, "Building compute cluster");

    let family = naming::resource_name(prefix, qualifier::TASK_FAMILY);
    debug!(family = %family, cpu = TASK_CPU_UNITS, memory = TASK_MEMORY_MIB, "Allocating task definition");

    let log_sink =
        LogSinkDescriptor::log_group(naming::log_group_name(prefix), TASK_LOG_RETENTION_DAYS);
    debug!(log_group = %log_sink.identity(), "Allocated task log sink");

    let container = ContainerSpec {
        name: naming::resource_name(prefix, qualifier::CONTAINER),
        image: config.service.image.clone(),
        port_mappings: vec![PortMapping {
            container_port: config.service.container_port,
            protocol: Protocol::Tcp,
        }],
        health_check: HealthCheck::http_localhost(),
        log_sink: log_sink.identity().to_string(),
        log_stream_prefix: "ecs".to_string(),
    };
    debug!(container = %container.name, image = %container.image, "Attached container");

    let task_definition = TaskDefinitionDescriptor {
        family: family.clone(),
        cpu_units: TASK_CPU_UNITS,
        memory_mib: TASK_MEMORY_MIB,
        runtime_platform: RuntimePlatform {
            cpu_architecture: CpuArchitecture::X86_64,
            os_family: OsFamily::Linux,
        },
        execution_role: roles.execution.name.clone(),
        task_role: roles.task.name.clone(),
        containers: vec![container],
    };

    let service = ServiceDescriptor {
        name: naming::resource_name(prefix, qualifier::SERVICE),
        cluster: cluster.name.clone(),
        task_definition: family,
        desired_count: config.service.desired_count,
        deployment: DeploymentPolicy::rolling(),
        security_groups: vec![security_group.name.clone()],
        assign_public_ip: true,
    };
    info!(
        service = %service.name,
        desired = service.desired_count,
        "Building managed service"
    );

    Ok(ComputeService {
        cluster,
        task_definition,
        log_sink,
        service,
    })
}
