//! IPv4 CIDR blocks and subnet partitioning
//!
//! Address-space math for the network builder: parsing, containment and
//! overlap checks, and partitioning a parent block into equal-sized
//! subnets. Blocks are always normalized network addresses; a CIDR whose
//! host bits are set is rejected at parse time.

use crate::error::TopologyError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network in CIDR notation, e.g. `172.16.0.0/16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix_len: u8,
}

impl Ipv4Cidr {
    /// Construct from a network address and prefix length.
    ///
    /// Fails if the prefix length exceeds 32 or if any host bit is set.
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, TopologyError> {
        if prefix_len > 32 {
            return Err(TopologyError::InvalidCidr {
                value: format!("{addr}/{prefix_len}"),
                reason: "prefix length out of range".to_string(),
            });
        }
        let cidr = Self { addr, prefix_len };
        if u32::from(addr) & !cidr.netmask() != 0 {
            return Err(TopologyError::InvalidCidr {
                value: format!("{addr}/{prefix_len}"),
                reason: "host bits set; not a network address".to_string(),
            });
        }
        Ok(cidr)
    }

    /// The network address
    pub fn network(&self) -> Ipv4Addr {
        self.addr
    }

    /// The prefix length
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The netmask as a host-order u32
    fn netmask(&self) -> u32 {
        if self.prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix_len)
        }
    }

    /// First address of the block
    fn first(&self) -> u32 {
        u32::from(self.addr)
    }

    /// Last address of the block
    fn last(&self) -> u32 {
        self.first() | !self.netmask()
    }

    /// Check whether `other` is fully contained in this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.first() && other.last() <= self.last()
    }

    /// Check whether the two blocks share any address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }

    /// Partition this block into `count` consecutive `/{new_prefix_len}`
    /// subnets, in address order.
    ///
    /// Fails if the subnet prefix is shorter than the parent's, longer than
    /// /28 (the smallest subnet the platform allocates), or if the parent
    /// block cannot hold `count` subnets of that size.
    pub fn partition(&self, new_prefix_len: u8, count: u32) -> Result<Vec<Ipv4Cidr>, TopologyError> {
        if new_prefix_len < self.prefix_len || new_prefix_len > 28 {
            return Err(TopologyError::InvalidCidr {
                value: format!("{self}"),
                reason: format!(
                    "cannot carve /{new_prefix_len} subnets out of a /{} block",
                    self.prefix_len
                ),
            });
        }
        let available = 1u64 << (new_prefix_len - self.prefix_len);
        if u64::from(count) > available {
            return Err(TopologyError::SubnetSpaceExhausted {
                address_space: self.to_string(),
                prefix_len: new_prefix_len,
                requested: count,
            });
        }
        let step = 1u64 << (32 - new_prefix_len);
        let mut subnets = Vec::with_capacity(count as usize);
        for i in 0..count {
            let addr = Ipv4Addr::from((u64::from(self.first()) + u64::from(i) * step) as u32);
            subnets.push(Ipv4Cidr {
                addr,
                prefix_len: new_prefix_len,
            });
        }
        Ok(subnets)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TopologyError::InvalidCidr {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let (addr_part, len_part) = s
            .split_once('/')
            .ok_or_else(|| invalid("missing '/' separator"))?;
        let addr: Ipv4Addr = addr_part
            .parse()
            .map_err(|_| invalid("malformed IPv4 address"))?;
        let prefix_len: u8 = len_part
            .parse()
            .map_err(|_| invalid("malformed prefix length"))?;
        Ipv4Cidr::new(addr, prefix_len)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e: TopologyError| D::Error::custom(e))
    }
}
