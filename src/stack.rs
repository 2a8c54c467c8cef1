//! Topology composer: the orchestration root
//!
//! Instantiates the builders strictly in dependency order (network, then
//! roles and security groups, then the compute service, then the load
//! balancer), threading each builder's outputs into the next builder's
//! inputs, and records every descriptor and wiring edge in the resource
//! graph handed to the provisioning engine. Composition is pure,
//! synchronous, and finite; on any error no partial topology is returned.

use crate::config::StackConfig;
use crate::error::TopologyError;
use crate::graph::{ResourceGraph, ResourceKind};
use crate::naming::{self, qualifier};
use crate::topology::iam::{self, ServiceRoles};
use crate::topology::load_balancer::{self, LoadBalancer};
use crate::topology::network::{self, NetworkTopology};
use crate::topology::security_group::{
    IngressSource, SecurityGroupBuilder, SecurityGroupDescriptor,
};
use crate::topology::service::{self, ComputeService};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A fully-wired, internally consistent resource topology, ready for a
/// provisioning engine to realize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub network: NetworkTopology,
    pub roles: ServiceRoles,
    pub security_groups: Vec<SecurityGroupDescriptor>,
    pub compute: ComputeService,
    pub load_balancer: LoadBalancer,
    pub graph: ResourceGraph,
}

/// Compose the full topology from one immutable configuration.
pub fn compose(config: &StackConfig) -> Result<Topology, TopologyError> {
    config.validate()?;
    let prefix = &config.name_prefix;
    info!(prefix = %prefix, region = %config.env.region, "Composing topology");

    let network = network::build(config)?;
    let roles = iam::build_service_roles(config)?;

    let mut groups = SecurityGroupBuilder::new();
    let edge_name = naming::resource_name(prefix, qualifier::ALB_SECURITY_GROUP);
    groups.build_group(&edge_name, "ALB security group", &network)?;
    groups.add_ingress(&edge_name, IngressSource::any_ipv4(), 443, "from any client")?;

    let internal_name = naming::resource_name(prefix, qualifier::FRONT_ECS_SECURITY_GROUP);
    groups.build_group(&internal_name, "Front ECS security group", &network)?;
    // the edge-to-internal path must exist before the internal group is
    // attached to the compute service
    groups.add_ingress(
        &internal_name,
        IngressSource::group(&edge_name),
        config.service.container_port,
        "from ALB",
    )?;

    let edge_group = groups
        .get(&edge_name)
        .ok_or_else(|| TopologyError::MissingDependency {
            resource: "topology".to_string(),
            dependency: edge_name.clone(),
        })?
        .clone();
    let internal_group = groups
        .get(&internal_name)
        .ok_or_else(|| TopologyError::MissingDependency {
            resource: "topology".to_string(),
            dependency: internal_name.clone(),
        })?
        .clone();

    let compute = service::build(config, &network, &roles, &internal_group)?;
    let load_balancer = load_balancer::build(config, &network, &edge_group, &compute)?;

    let security_groups = groups.into_groups();
    let graph = build_graph(
        &network,
        &roles,
        &security_groups,
        &compute,
        &load_balancer,
    )?;
    info!(resources = graph.len(), "Topology composed");

    Ok(Topology {
        network,
        roles,
        security_groups,
        compute,
        load_balancer,
        graph,
    })
}

/// Record every descriptor as a typed node and every wiring as an edge.
fn build_graph(
    network: &NetworkTopology,
    roles: &ServiceRoles,
    security_groups: &[SecurityGroupDescriptor],
    compute: &ComputeService,
    load_balancer: &LoadBalancer,
) -> Result<ResourceGraph, TopologyError> {
    let mut graph = ResourceGraph::new();

    graph.add_node(ResourceKind::Vpc, &network.vpc_name)?;
    for subnet in &network.subnets {
        graph.add_node(ResourceKind::Subnet, &subnet.name)?;
        graph.add_edge(&subnet.name, &network.vpc_name)?;
        graph.add_node(ResourceKind::RouteTable, &subnet.route_table.name)?;
        graph.add_edge(&subnet.route_table.name, &subnet.name)?;
    }

    for role in [&roles.execution, &roles.task] {
        graph.add_node(ResourceKind::IamRole, &role.name)?;
    }

    for group in security_groups {
        graph.add_node(ResourceKind::SecurityGroup, &group.name)?;
        graph.add_edge(&group.name, &group.vpc)?;
        for (index, rule) in group.ingress.iter().enumerate() {
            let rule_name = format!("{}/ingress-{}", group.name, index + 1);
            graph.add_node(ResourceKind::SecurityGroupRule, &rule_name)?;
            graph.add_edge(&rule_name, &group.name)?;
            if let IngressSource::Group { name } = &rule.source {
                graph.add_edge(&rule_name, name)?;
            }
        }
    }

    graph.add_node(ResourceKind::LogGroup, compute.log_sink.identity())?;
    graph.add_node(ResourceKind::Cluster, &compute.cluster.name)?;
    graph.add_edge(&compute.cluster.name, &compute.cluster.vpc)?;
    graph.add_node(ResourceKind::TaskDefinition, &compute.task_definition.family)?;
    graph.add_edge(
        &compute.task_definition.family,
        &compute.task_definition.execution_role,
    )?;
    graph.add_edge(
        &compute.task_definition.family,
        &compute.task_definition.task_role,
    )?;
    for container in &compute.task_definition.containers {
        graph.add_edge(&compute.task_definition.family, &container.log_sink)?;
    }
    graph.add_node(ResourceKind::Service, &compute.service.name)?;
    graph.add_edge(&compute.service.name, &compute.service.cluster)?;
    graph.add_edge(&compute.service.name, &compute.service.task_definition)?;
    for group in &compute.service.security_groups {
        graph.add_edge(&compute.service.name, group)?;
    }

    graph.add_node(ResourceKind::LogBucket, load_balancer.log_sink.identity())?;
    let balancer = &load_balancer.balancer;
    graph.add_node(ResourceKind::LoadBalancer, &balancer.name)?;
    graph.add_edge(&balancer.name, &balancer.vpc)?;
    graph.add_edge(&balancer.name, &balancer.security_group)?;
    graph.add_edge(&balancer.name, &balancer.access_log_sink)?;
    for listener in &balancer.listeners {
        for target_group in &listener.target_groups {
            graph.add_node(ResourceKind::TargetGroup, &target_group.name)?;
            for target in &target_group.targets {
                graph.add_edge(&target_group.name, &target.service)?;
            }
        }
        graph.add_node(ResourceKind::Listener, &listener.name)?;
        graph.add_edge(&listener.name, &balancer.name)?;
        for target_group in &listener.target_groups {
            graph.add_edge(&listener.name, &target_group.name)?;
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::demo_config;

    #[test]
    fn composes_the_demo_topology() {
        let topology = compose(&demo_config()).unwrap();
        assert_eq!(topology.network.vpc_name, "demo-vpc");
        assert_eq!(topology.security_groups.len(), 2);
        assert_eq!(topology.compute.service.name, "demo-front-service");
        assert_eq!(topology.load_balancer.balancer.name, "demo-alb");
    }

    #[test]
    fn graph_contains_every_descriptor() {
        let topology = compose(&demo_config()).unwrap();
        let graph = &topology.graph;
        for name in [
            "demo-vpc",
            "demo-public-subnet-1",
            "demo-public-subnet-2",
            "demo-public-rtb-1-rtb",
            "demo-public-rtb-2-rtb",
            "demo-ecs-task-execution-role",
            "demo-front-ecs-task-role",
            "demo-alb-sg",
            "demo-front-ecs-sg",
            "/ecs/demo-front-log",
            "demo-front-cluster",
            "demo-front-task",
            "demo-front-service",
            "demo-alb-log",
            "demo-alb",
            "demo-front-ecs-tg",
            "demo-listener",
        ] {
            assert!(graph.contains(name), "graph is missing {name}");
        }
    }

    #[test]
    fn creation_order_is_downstream() {
        let topology = compose(&demo_config()).unwrap();
        let order: Vec<String> = topology
            .graph
            .creation_order()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(order.len(), topology.graph.len(), "order must be complete");
        let pos = |n: &str| {
            order
                .iter()
                .position(|x| x == n)
                .unwrap_or_else(|| panic!("{n} missing from order"))
        };
        assert_eq!(pos("demo-vpc"), 0);
        assert!(pos("demo-alb-sg") < pos("demo-front-ecs-sg/ingress-1"));
        assert!(pos("demo-front-task") < pos("demo-front-service"));
        assert!(pos("demo-front-cluster") < pos("demo-front-service"));
        assert!(pos("demo-front-service") < pos("demo-front-ecs-tg"));
        assert!(pos("demo-front-ecs-tg") < pos("demo-listener"));
        assert!(pos("demo-alb") < pos("demo-listener"));
        assert!(pos("demo-alb-log") < pos("demo-alb"));
    }

    #[test]
    fn reachability_edges_are_recorded() {
        let topology = compose(&demo_config()).unwrap();
        let deps = topology.graph.dependencies_of("demo-front-ecs-sg/ingress-1");
        assert!(deps.contains(&"demo-front-ecs-sg"));
        assert!(deps.contains(&"demo-alb-sg"));
    }

    #[test]
    fn halts_on_invalid_configuration() {
        let mut config = demo_config();
        config.network.az_count = 9;
        assert!(compose(&config).is_err());
    }

    #[test]
    fn composition_is_idempotent() {
        let a = serde_json::to_string(&compose(&demo_config()).unwrap()).unwrap();
        let b = serde_json::to_string(&compose(&demo_config()).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
