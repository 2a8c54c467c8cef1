//! Typed resource nodes and the dependency graph
//!
//! The composer records every descriptor as a typed node and every
//! output-to-input wiring as a directed edge. The provisioning engine may
//! parallelize independent resources but must respect these edges; the
//! graph is validated to be acyclic so no ordering negotiation is needed.

use crate::error::TopologyError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kinds of resources in a composed topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Vpc,
    Subnet,
    RouteTable,
    IamRole,
    SecurityGroup,
    SecurityGroupRule,
    LogGroup,
    LogBucket,
    Cluster,
    TaskDefinition,
    Service,
    LoadBalancer,
    TargetGroup,
    Listener,
}

impl ResourceKind {
    /// Provisioning priority (lower number = create first).
    ///
    /// This is a coarse ordering hint layered under the explicit edges:
    /// - 0: the network root
    /// - 1: subnets and routing
    /// - 2: roles, groups, and log sinks (only need the network)
    /// - 3: rules and the cluster
    /// - 4: the task definition (needs roles and the log sink)
    /// - 5: the service and the balancer
    /// - 6: target groups (need a registered service)
    /// - 7: listeners (need the balancer and a target group)
    pub fn provision_priority(self) -> u8 {
        match self {
            ResourceKind::Vpc => 0,
            ResourceKind::Subnet => 1,
            ResourceKind::RouteTable => 1,
            ResourceKind::IamRole => 2,
            ResourceKind::SecurityGroup => 2,
            ResourceKind::LogGroup => 2,
            ResourceKind::LogBucket => 2,
            ResourceKind::SecurityGroupRule => 3,
            ResourceKind::Cluster => 3,
            ResourceKind::TaskDefinition => 4,
            ResourceKind::Service => 5,
            ResourceKind::LoadBalancer => 5,
            ResourceKind::TargetGroup => 6,
            ResourceKind::Listener => 7,
        }
    }

    /// Human-readable label for logging
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Vpc => "VPC",
            ResourceKind::Subnet => "subnet",
            ResourceKind::RouteTable => "route table",
            ResourceKind::IamRole => "IAM role",
            ResourceKind::SecurityGroup => "security group",
            ResourceKind::SecurityGroupRule => "security group rule",
            ResourceKind::LogGroup => "log group",
            ResourceKind::LogBucket => "log bucket",
            ResourceKind::Cluster => "cluster",
            ResourceKind::TaskDefinition => "task definition",
            ResourceKind::Service => "service",
            ResourceKind::LoadBalancer => "load balancer",
            ResourceKind::TargetGroup => "target group",
            ResourceKind::Listener => "listener",
        }
    }
}

/// The directed acyclic dependency graph of a composed topology.
///
/// Nodes are keyed by resource name (globally unique within the topology's
/// namespace); an edge `(a, b)` declares that `a` depends on `b` and must
/// be created after it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceGraph {
    nodes: BTreeMap<String, ResourceKind>,
    edges: BTreeSet<(String, String)>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource node. Duplicate names are fatal.
    pub fn add_node(&mut self, kind: ResourceKind, name: &str) -> Result<(), TopologyError> {
        if self.nodes.contains_key(name) {
            return Err(TopologyError::DuplicateName {
                name: name.to_string(),
            });
        }
        self.nodes.insert(name.to_string(), kind);
        Ok(())
    }

    /// Declare that `resource` depends on `dependency`.
    ///
    /// Both nodes must already be registered, and the new edge must not
    /// close a cycle.
    pub fn add_edge(&mut self, resource: &str, dependency: &str) -> Result<(), TopologyError> {
        for name in [resource, dependency] {
            if !self.nodes.contains_key(name) {
                return Err(TopologyError::MissingDependency {
                    resource: resource.to_string(),
                    dependency: name.to_string(),
                });
            }
        }
        if self.reaches(dependency, resource) {
            return Err(TopologyError::CyclicReference {
                from: resource.to_string(),
                to: dependency.to_string(),
            });
        }
        self.edges
            .insert((resource.to_string(), dependency.to_string()));
        Ok(())
    }

    /// Check whether `from` transitively depends on `to`
    fn reaches(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(node) = stack.pop() {
            for (a, b) in &self.edges {
                if a == node && seen.insert(b.as_str()) {
                    if b == to {
                        return true;
                    }
                    stack.push(b);
                }
            }
        }
        false
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ResourceKind> {
        self.nodes.get(name).copied()
    }

    /// Direct dependencies of a resource
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(a, _)| a == name)
            .map(|(_, b)| b.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deterministic creation order: dependencies before dependents,
    /// ties broken by provisioning priority then name.
    ///
    /// Always succeeds because `add_edge` rejects cycles.
    pub fn creation_order(&self) -> Vec<&str> {
        let mut in_degree: BTreeMap<&str, usize> =
            self.nodes.keys().map(|n| (n.as_str(), 0)).collect();
        for (a, _) in &self.edges {
            *in_degree.get_mut(a.as_str()).unwrap() += 1;
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();

        while !ready.is_empty() {
            // Pick the lowest (priority, name) among the ready nodes
            ready.sort_by_key(|n| (self.nodes[*n].provision_priority(), *n));
            let next = ready.remove(0);
            order.push(next);
            for (a, b) in &self.edges {
                if b == next {
                    let d = in_degree.get_mut(a.as_str()).unwrap();
                    *d -= 1;
                    if *d == 0 {
                        ready.push(a.as_str());
                    }
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(nodes: &[(ResourceKind, &str)]) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for (kind, name) in nodes {
            graph.add_node(*kind, name).unwrap();
        }
        graph
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut graph = graph_with(&[(ResourceKind::Vpc, "demo-vpc")]);
        let err = graph
            .add_node(ResourceKind::SecurityGroup, "demo-vpc")
            .unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateName { .. }));
    }

    #[test]
    fn rejects_edges_to_unknown_nodes() {
        let mut graph = graph_with(&[(ResourceKind::Vpc, "demo-vpc")]);
        let err = graph.add_edge("demo-vpc", "demo-alb-sg").unwrap_err();
        assert!(matches!(err, TopologyError::MissingDependency { .. }));
        assert!(err.is_ordering());
    }

    #[test]
    fn rejects_cycles() {
        let mut graph = graph_with(&[
            (ResourceKind::SecurityGroup, "a"),
            (ResourceKind::SecurityGroup, "b"),
            (ResourceKind::SecurityGroup, "c"),
        ]);
        graph.add_edge("b", "a").unwrap();
        graph.add_edge("c", "b").unwrap();
        let err = graph.add_edge("a", "c").unwrap_err();
        assert!(matches!(err, TopologyError::CyclicReference { .. }));
    }

    #[test]
    fn rejects_self_edges() {
        let mut graph = graph_with(&[(ResourceKind::Vpc, "demo-vpc")]);
        assert!(graph.add_edge("demo-vpc", "demo-vpc").is_err());
    }

    #[test]
    fn creation_order_respects_edges() {
        let mut graph = graph_with(&[
            (ResourceKind::Listener, "demo-listener"),
            (ResourceKind::TargetGroup, "demo-front-ecs-tg"),
            (ResourceKind::LoadBalancer, "demo-alb"),
            (ResourceKind::Vpc, "demo-vpc"),
        ]);
        graph.add_edge("demo-alb", "demo-vpc").unwrap();
        graph.add_edge("demo-listener", "demo-alb").unwrap();
        graph.add_edge("demo-listener", "demo-front-ecs-tg").unwrap();

        let order = graph.creation_order();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], "demo-vpc");
        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        assert!(pos("demo-alb") < pos("demo-listener"));
        assert!(pos("demo-front-ecs-tg") < pos("demo-listener"));
    }

    #[test]
    fn creation_order_is_deterministic() {
        let build = || {
            let mut graph = graph_with(&[
                (ResourceKind::Subnet, "demo-public-subnet-2"),
                (ResourceKind::Subnet, "demo-public-subnet-1"),
                (ResourceKind::Vpc, "demo-vpc"),
            ]);
            graph.add_edge("demo-public-subnet-1", "demo-vpc").unwrap();
            graph.add_edge("demo-public-subnet-2", "demo-vpc").unwrap();
            graph
        };
        let a: Vec<String> = build().creation_order().iter().map(|s| s.to_string()).collect();
        let b: Vec<String> = build().creation_order().iter().map(|s| s.to_string()).collect();
        assert_eq!(a, b);
        assert_eq!(a[0], "demo-vpc");
        assert_eq!(a[1], "demo-public-subnet-1");
    }

    #[test]
    fn priority_orders_network_first() {
        assert!(
            ResourceKind::Vpc.provision_priority()
                < ResourceKind::SecurityGroup.provision_priority()
        );
        assert!(
            ResourceKind::SecurityGroup.provision_priority()
                < ResourceKind::SecurityGroupRule.provision_priority()
        );
        assert!(
            ResourceKind::TaskDefinition.provision_priority()
                < ResourceKind::Service.provision_priority()
        );
        assert!(
            ResourceKind::TargetGroup.provision_priority()
                < ResourceKind::Listener.provision_priority()
        );
    }
}
