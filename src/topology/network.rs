//! Network builder: VPC, public subnets, and per-subnet routing
//!
//! Partitions the configured address space into one public subnet per
//! availability zone, in address order, with a dedicated route table per
//! subnet. Names and tags are a pure function of the inputs, so the same
//! configuration always yields the same network.

use crate::cidr::Ipv4Cidr;
use crate::config::{StackConfig, MAX_AZ_COUNT};
use crate::error::TopologyError;
use crate::naming::{self, qualifier};
use crate::tags::{name_tags, Tag};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Public/private classification of a subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetTier {
    /// Routed to the internet gateway; instances may receive public IPs
    Public,
    /// No internet route
    Private,
}

/// Route table owned by a single subnet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTableDescriptor {
    pub name: String,
    pub tags: Vec<Tag>,
}

/// One subnet, pinned to an availability zone by index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetDescriptor {
    pub name: String,
    /// Zero-based index into the region's zone enumeration
    pub az_index: u32,
    pub cidr: Ipv4Cidr,
    pub tier: SubnetTier,
    pub route_table: RouteTableDescriptor,
    pub tags: Vec<Tag>,
}

/// The composed network: root of the topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkTopology {
    pub vpc_name: String,
    pub address_space: Ipv4Cidr,
    pub subnets: Vec<SubnetDescriptor>,
    pub tags: Vec<Tag>,
}

/// Build the network topology.
///
/// Fails without producing a partial network if the zone count is out of
/// range or the address space cannot hold the requested subnets.
pub fn build(config: &StackConfig) -> Result<NetworkTopology, TopologyError> {
    let prefix = &config.name_prefix;
    let az_count = config.network.az_count;
    if az_count == 0 || az_count > MAX_AZ_COUNT {
        return Err(TopologyError::InvalidAzCount {
            requested: az_count,
            max: MAX_AZ_COUNT,
        });
    }

    let vpc_name = naming::resource_name(prefix, qualifier::VPC);
    info!(
        vpc = %vpc_name,
        address_space = %config.network.address_space,
        az_count,
        "Building network topology"
    );

    let blocks = config
        .network
        .address_space
        .partition(config.network.subnet_prefix_len, az_count)?;

    let subnets = blocks
        .into_iter()
        .enumerate()
        .map(|(index, cidr)| {
            let ordinal = index as u32 + 1;
            let name = naming::subnet_name(prefix, ordinal);
            let rtb_name = naming::route_table_name(prefix, ordinal);
            debug!(subnet = %name, cidr = %cidr, route_table = %rtb_name, "Allocated public subnet");
            SubnetDescriptor {
                tags: name_tags(&name),
                name,
                az_index: index as u32,
                cidr,
                tier: SubnetTier::Public,
                route_table: RouteTableDescriptor {
                    tags: name_tags(&rtb_name),
                    name: rtb_name,
                },
            }
        })
        .collect();

    Ok(NetworkTopology {
        tags: name_tags(&vpc_name),
        vpc_name,
        address_space: config.network.address_space,
        subnets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::demo_config;

    #[test]
    fn builds_one_subnet_per_zone() {
        for az_count in 1..=MAX_AZ_COUNT {
            let mut config = demo_config();
            config.network.az_count = az_count;
            let network = build(&config).unwrap();
            assert_eq!(network.subnets.len(), az_count as usize);
        }
    }

    #[test]
    fn subnets_are_disjoint_and_nested() {
        let mut config = demo_config();
        config.network.az_count = MAX_AZ_COUNT;
        let network = build(&config).unwrap();
        for (i, a) in network.subnets.iter().enumerate() {
            assert!(network.address_space.contains(&a.cidr));
            for b in &network.subnets[i + 1..] {
                assert!(!a.cidr.overlaps(&b.cidr), "{} overlaps {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn demo_names_and_tags() {
        let network = build(&demo_config()).unwrap();
        assert_eq!(network.vpc_name, "demo-vpc");
        assert_eq!(network.subnets[0].name, "demo-public-subnet-1");
        assert_eq!(network.subnets[1].name, "demo-public-subnet-2");
        assert_eq!(network.subnets[0].route_table.name, "demo-public-rtb-1-rtb");
        assert_eq!(network.subnets[1].route_table.name, "demo-public-rtb-2-rtb");
        for subnet in &network.subnets {
            assert_eq!(subnet.tags[0].value, subnet.name);
            assert_eq!(subnet.route_table.tags[0].value, subnet.route_table.name);
            assert_eq!(subnet.tier, SubnetTier::Public);
        }
    }

    #[test]
    fn ordinals_follow_zone_order() {
        let network = build(&demo_config()).unwrap();
        for (index, subnet) in network.subnets.iter().enumerate() {
            assert_eq!(subnet.az_index, index as u32);
            assert!(subnet.name.ends_with(&format!("-{}", index + 1)));
        }
    }

    #[test]
    fn rejects_zone_count_out_of_range() {
        for bad in [0, MAX_AZ_COUNT + 1] {
            let mut config = demo_config();
            config.network.az_count = bad;
            assert!(matches!(
                build(&config).unwrap_err(),
                TopologyError::InvalidAzCount { .. }
            ));
        }
    }

    #[test]
    fn rejects_address_space_too_small() {
        let mut config = demo_config();
        config.network.address_space = "10.0.0.0/26".parse().unwrap();
        config.network.subnet_prefix_len = 28;
        config.network.az_count = 5;
        assert!(matches!(
            build(&config).unwrap_err(),
            TopologyError::SubnetSpaceExhausted { .. }
        ));
    }
}
