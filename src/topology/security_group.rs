//! Security group builder and the reachability intent graph
//!
//! Ingress rules express which traffic paths between tiers are allowed,
//! e.g. "only traffic from the balancer group may reach the service group
//! on its service port". A rule may name another group as its source only
//! if that group was already built, and group references must stay
//! acyclic; both violations fail composition instead of producing a graph
//! the provisioning engine could not resolve.

use crate::cidr::Ipv4Cidr;
use crate::error::TopologyError;
use crate::tags::{name_tags, Tag};
use crate::topology::network::NetworkTopology;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use tracing::{debug, info};

/// Transport protocol of a rule or port mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// Where allowed traffic originates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum IngressSource {
    /// Any address in the block
    Cidr { cidr: Ipv4Cidr },
    /// Members of a previously built security group, referenced by name.
    /// A pure relation: the referenced group stays independently
    /// lifecycle-managed.
    Group { name: String },
}

impl IngressSource {
    /// The unrestricted IPv4 source
    pub fn any_ipv4() -> Self {
        IngressSource::Cidr {
            cidr: Ipv4Cidr::new(Ipv4Addr::UNSPECIFIED, 0).expect("0.0.0.0/0 is a valid block"),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        IngressSource::Group { name: name.into() }
    }
}

/// One permission statement allowing traffic into a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngressRule {
    pub source: IngressSource,
    pub protocol: Protocol,
    pub port: u16,
    pub description: String,
}

/// Declarative description of one security group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupDescriptor {
    pub name: String,
    pub description: String,
    /// Owning network, referenced by identity
    pub vpc: String,
    /// Ordered list of ingress rules
    pub ingress: Vec<IngressRule>,
    pub tags: Vec<Tag>,
}

impl SecurityGroupDescriptor {
    /// Check whether any rule admits traffic from another group
    pub fn has_group_source(&self) -> bool {
        self.ingress
            .iter()
            .any(|r| matches!(r.source, IngressSource::Group { .. }))
    }
}

/// Builds security groups, tracking which groups exist so far.
///
/// Rules can only reference groups this builder has already produced,
/// which keeps the reference graph resolvable and acyclic.
#[derive(Debug, Default)]
pub struct SecurityGroupBuilder {
    groups: Vec<SecurityGroupDescriptor>,
}

impl SecurityGroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new, empty group in the given network.
    ///
    /// `name` is the full resource name. Duplicate names are fatal.
    pub fn build_group(
        &mut self,
        name: &str,
        description: &str,
        network: &NetworkTopology,
    ) -> Result<(), TopologyError> {
        if self.get(name).is_some() {
            return Err(TopologyError::DuplicateName {
                name: name.to_string(),
            });
        }
        info!(name = %name, vpc = %network.vpc_name, "Building security group");
        self.groups.push(SecurityGroupDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            vpc: network.vpc_name.clone(),
            ingress: Vec::new(),
            tags: name_tags(name),
        });
        Ok(())
    }

    /// Append an ingress rule to `group`.
    ///
    /// If `source` names a security group, that group must already have
    /// been built here, and the reference must not close a cycle.
    pub fn add_ingress(
        &mut self,
        group: &str,
        source: IngressSource,
        port: u16,
        description: &str,
    ) -> Result<(), TopologyError> {
        if self.get(group).is_none() {
            return Err(TopologyError::MissingDependency {
                resource: format!("ingress rule on port {port}"),
                dependency: group.to_string(),
            });
        }
        if let IngressSource::Group { name: source_name } = &source {
            if self.get(source_name).is_none() {
                return Err(TopologyError::UnknownIngressSource {
                    group: group.to_string(),
                    source_group: source_name.clone(),
                });
            }
            if self.references(source_name, group) {
                return Err(TopologyError::CyclicReference {
                    from: group.to_string(),
                    to: source_name.clone(),
                });
            }
        }
        debug!(group = %group, port, "Adding ingress rule");
        let descriptor = self
            .groups
            .iter_mut()
            .find(|g| g.name == group)
            .expect("group existence checked above");
        descriptor.ingress.push(IngressRule {
            source,
            protocol: Protocol::Tcp,
            port,
            description: description.to_string(),
        });
        Ok(())
    }

    /// Check whether `from` (transitively) references `to` through
    /// group-sourced ingress rules
    fn references(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let Some(group) = self.get(from) else {
            return false;
        };
        group.ingress.iter().any(|rule| match &rule.source {
            IngressSource::Group { name } => self.references(name, to),
            IngressSource::Cidr { .. } => false,
        })
    }

    /// Look up a built group by name
    pub fn get(&self, name: &str) -> Option<&SecurityGroupDescriptor> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// All groups, in build order
    pub fn groups(&self) -> &[SecurityGroupDescriptor] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<SecurityGroupDescriptor> {
        self.groups
    }
}
