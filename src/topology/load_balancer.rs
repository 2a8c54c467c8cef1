//! Load balancer builder: public balancer, access-log bucket, and wiring
//!
//! Allocates an internet-facing balancer in the network behind the edge
//! security group, a versioned and encrypted bucket for its access logs
//! with a write grant for the platform's log-delivery identity, and one
//! listener forwarding to a target group holding the front service's
//! endpoint. A listener with zero targets is an invalid terminal state and
//! fails composition instead of producing a dangling listener.

use crate::config::StackConfig;
use crate::error::TopologyError;
use crate::naming::{self, qualifier};
use crate::topology::logs::{LogSinkDescriptor, ACCESS_LOG_EXPIRATION_DAYS};
use crate::topology::network::NetworkTopology;
use crate::topology::security_group::SecurityGroupDescriptor;
use crate::topology::service::{ComputeService, ServiceTarget};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Port the public listener accepts traffic on
pub const LISTENER_PORT: u16 = 80;

/// A named set of endpoints a listener forwards traffic to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroupDescriptor {
    pub name: String,
    pub port: u16,
    pub targets: Vec<ServiceTarget>,
}

/// One listener on the balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerDescriptor {
    pub name: String,
    pub port: u16,
    pub target_groups: Vec<TargetGroupDescriptor>,
}

impl ListenerDescriptor {
    /// Construct a listener, enforcing that it forwards somewhere.
    pub fn new(
        name: String,
        port: u16,
        target_groups: Vec<TargetGroupDescriptor>,
    ) -> Result<Self, TopologyError> {
        if target_groups.is_empty() || target_groups.iter().any(|tg| tg.targets.is_empty()) {
            return Err(TopologyError::EmptyListener { listener: name });
        }
        Ok(Self {
            name,
            port,
            target_groups,
        })
    }
}

/// Declarative description of the public balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancerDescriptor {
    pub name: String,
    /// Owning network, referenced by identity
    pub vpc: String,
    /// Edge security group, referenced by identity
    pub security_group: String,
    pub internet_facing: bool,
    /// Bucket the balancer ships access logs to, referenced by identity
    pub access_log_sink: String,
    pub listeners: Vec<ListenerDescriptor>,
}

/// The full output of the load balancer builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub balancer: LoadBalancerDescriptor,
    pub log_sink: LogSinkDescriptor,
}

/// Build the balancer, its access-log sink, and the listener wiring.
pub fn build(
    config: &StackConfig,
    network: &NetworkTopology,
    edge_group: &SecurityGroupDescriptor,
    service: &ComputeService,
) -> Result<LoadBalancer, TopologyError> {
    let prefix = &config.name_prefix;

    if edge_group.vpc != network.vpc_name {
        return Err(TopologyError::MissingDependency {
            resource: edge_group.name.clone(),
            dependency: network.vpc_name.clone(),
        });
    }

    let name = naming::resource_name(prefix, qualifier::LOAD_BALANCER);
    info!(balancer = %name, vpc = %network.vpc_name, "Building load balancer");

    // The log-delivery identity is external to the topology's own account
    // and must be enumerated by its platform-defined principal identifier.
    let log_sink = LogSinkDescriptor::bucket(
        naming::resource_name(prefix, qualifier::LOG_BUCKET),
        naming::resource_name(prefix, qualifier::LIFECYCLE_RULE),
        ACCESS_LOG_EXPIRATION_DAYS,
    )
    .with_object_write_grant(&config.log_delivery_account);
    debug!(bucket = %log_sink.identity(), "Allocated access-log sink");

    let target = service
        .target()
        .ok_or_else(|| TopologyError::MissingDependency {
            resource: naming::resource_name(prefix, qualifier::TARGET_GROUP),
            dependency: "an attachable service endpoint".to_string(),
        })?;
    let target_group = TargetGroupDescriptor {
        name: naming::resource_name(prefix, qualifier::TARGET_GROUP),
        port: target.port,
        targets: vec![target],
    };
    debug!(target_group = %target_group.name, "Registered service target");

    let listener = ListenerDescriptor::new(
        naming::resource_name(prefix, qualifier::LISTENER),
        LISTENER_PORT,
        vec![target_group],
    )?;

    Ok(LoadBalancer {
        balancer: LoadBalancerDescriptor {
            name,
            vpc: network.vpc_name.clone(),
            security_group: edge_group.name.clone(),
            internet_facing: true,
            access_log_sink: log_sink.identity().to_string(),
            listeners: vec![listener],
        },
        log_sink,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::demo_config;
    use crate::topology::logs::{EncryptionMode, LogDestination, RemovalPolicy};
    use crate::topology::security_group::{IngressSource, SecurityGroupBuilder};
    use crate::topology::{iam, network, service};

    fn demo_parts() -> (NetworkTopology, SecurityGroupDescriptor, ComputeService) {
        let config = demo_config();
        let net = network::build(&config).unwrap();
        let roles = iam::build_service_roles(&config).unwrap();
        let mut groups = SecurityGroupBuilder::new();
        groups
            .build_group("demo-alb-sg", "ALB security group", &net)
            .unwrap();
        groups
            .add_ingress("demo-alb-sg", IngressSource::any_ipv4(), 443, "from any")
            .unwrap();
        groups
            .build_group("demo-front-ecs-sg", "Front ECS security group", &net)
            .unwrap();
        groups
            .add_ingress(
                "demo-front-ecs-sg",
                IngressSource::group("demo-alb-sg"),
                80,
                "from ALB",
            )
            .unwrap();
        let internal = groups.get("demo-front-ecs-sg").unwrap().clone();
        let edge = groups.get("demo-alb-sg").unwrap().clone();
        let compute = service::build(&demo_config(), &net, &roles, &internal).unwrap();
        (net, edge, compute)
    }

    fn demo_balancer() -> LoadBalancer {
        let (net, edge, compute) = demo_parts();
        build(&demo_config(), &net, &edge, &compute).unwrap()
    }

    #[test]
    fn demo_names_and_wiring() {
        let lb = demo_balancer();
        assert_eq!(lb.balancer.name, "demo-alb");
        assert_eq!(lb.balancer.vpc, "demo-vpc");
        assert_eq!(lb.balancer.security_group, "demo-alb-sg");
        assert!(lb.balancer.internet_facing);
        assert_eq!(lb.balancer.access_log_sink, "demo-alb-log");

        let listener = &lb.balancer.listeners[0];
        assert_eq!(listener.name, "demo-listener");
        assert_eq!(listener.port, LISTENER_PORT);
        let tg = &listener.target_groups[0];
        assert_eq!(tg.name, "demo-front-ecs-tg");
        assert_eq!(tg.port, 80);
        assert_eq!(tg.targets[0].service, "demo-front-service");
    }

    #[test]
    fn listener_always_has_targets() {
        let lb = demo_balancer();
        for listener in &lb.balancer.listeners {
            assert!(!listener.target_groups.is_empty());
            for tg in &listener.target_groups {
                assert!(!tg.targets.is_empty());
            }
        }
    }

    #[test]
    fn listener_rejects_zero_target_groups() {
        let err = ListenerDescriptor::new("demo-listener".to_string(), 80, Vec::new()).unwrap_err();
        assert!(matches!(err, TopologyError::EmptyListener { .. }));
    }

    #[test]
    fn listener_rejects_empty_target_group() {
        let tg = TargetGroupDescriptor {
            name: "demo-front-ecs-tg".to_string(),
            port: 80,
            targets: Vec::new(),
        };
        let err = ListenerDescriptor::new("demo-listener".to_string(), 80, vec![tg]).unwrap_err();
        assert!(matches!(err, TopologyError::EmptyListener { .. }));
    }

    #[test]
    fn access_log_sink_shape() {
        let sink = demo_balancer().log_sink;
        assert_eq!(sink.retention_days, 183);
        assert_eq!(sink.encryption, EncryptionMode::PlatformManaged);
        assert_eq!(sink.removal_policy, RemovalPolicy::Destroy);
        match &sink.destination {
            LogDestination::Bucket {
                versioned,
                lifecycle_rule_id,
                auto_purge_objects,
                ..
            } => {
                assert!(versioned);
                assert!(auto_purge_objects);
                assert_eq!(lifecycle_rule_id, "demo-delete-lifecycle-rule");
            }
            other => panic!("expected bucket destination, got {other:?}"),
        }
    }

    #[test]
    fn log_delivery_grant_uses_configured_account() {
        let sink = demo_balancer().log_sink;
        assert_eq!(sink.grants.len(), 1);
        assert_eq!(sink.grants[0].principal_account, "582318560864");
        assert_eq!(sink.grants[0].actions, ["s3:PutObject"]);
        assert_eq!(sink.grants[0].resource, "arn:aws:s3:::demo-alb-log/*");
    }

    #[test]
    fn rejects_edge_group_from_foreign_network() {
        let (net, mut edge, compute) = demo_parts();
        edge.vpc = "other-vpc".to_string();
        let err = build(&demo_config(), &net, &edge, &compute).unwrap_err();
        assert!(err.is_ordering());
    }

    #[test]
    fn rejects_service_without_attachable_endpoint() {
        let (net, edge, mut compute) = demo_parts();
        compute.task_definition.containers[0].port_mappings.clear();
        let err = build(&demo_config(), &net, &edge, &compute).unwrap_err();
        assert!(matches!(err, TopologyError::MissingDependency { .. }));
    }
}
