//! Topology builders, one module per resource tier
//!
//! - network: VPC, public subnets, routing
//! - iam: execution and task identities
//! - security_group: reachability intent between tiers
//! - logs: diagnostics sinks (log group, access-log bucket)
//! - service: cluster, task definition, managed service
//! - load_balancer: public balancer and listener wiring

pub mod iam;
pub mod load_balancer;
pub mod logs;
pub mod network;
pub mod security_group;
pub mod service;

pub use iam::{RoleDescriptor, ServiceRoles};
pub use load_balancer::{ListenerDescriptor, LoadBalancer, LoadBalancerDescriptor, TargetGroupDescriptor};
pub use logs::{LogDestination, LogSinkDescriptor};
pub use network::{NetworkTopology, SubnetDescriptor};
pub use security_group::{
    IngressRule, IngressSource, Protocol, SecurityGroupBuilder, SecurityGroupDescriptor,
};
pub use service::{ComputeService, ContainerSpec, ServiceDescriptor, ServiceTarget};
