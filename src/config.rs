//! Configuration for a topology composition run
//!
//! All values are fixed at process start and immutable for the lifetime of
//! a composition. The name prefix is threaded explicitly through every
//! builder call; there is no hidden global naming state.

use crate::cidr::Ipv4Cidr;
use crate::error::TopologyError;
use crate::naming;
use serde::{Deserialize, Serialize};

/// Default address space for the network
pub const DEFAULT_ADDRESS_SPACE: &str = "172.16.0.0/16";

/// Default number of availability zones
pub const DEFAULT_AZ_COUNT: u32 = 2;

/// Default subnet prefix length (one /24 per zone)
pub const DEFAULT_SUBNET_PREFIX_LEN: u8 = 24;

/// Most zones a single topology may span
pub const MAX_AZ_COUNT: u32 = 6;

/// Default container image for the front service
pub const DEFAULT_IMAGE: &str = "amazon/amazon-ecs-sample";

/// Default container port for the front service
pub const DEFAULT_CONTAINER_PORT: u16 = 80;

/// Default desired replica count for the front service
pub const DEFAULT_DESIRED_COUNT: u32 = 1;

/// Account and region the topology is composed for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// 12-digit platform account id
    pub account_id: String,
    /// Region identifier, e.g. "ap-northeast-1"
    pub region: String,
}

/// Network shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Parent address space partitioned into public subnets
    pub address_space: Ipv4Cidr,
    /// Number of availability zones (one public subnet each)
    pub az_count: u32,
    /// Prefix length of each public subnet
    pub subnet_prefix_len: u8,
}

/// Front service shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Container image reference
    pub image: String,
    /// Container port receiving traffic from the balancer
    pub container_port: u16,
    /// Desired replica count
    pub desired_count: u32,
}

/// Configuration for one topology composition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Process-wide name prefix; every resource name derives from it
    pub name_prefix: String,
    /// Platform account of the load-balancing service's log-delivery
    /// identity. External to the topology's own account and
    /// platform/region specific, so it is an input, never a constant.
    pub log_delivery_account: String,
    pub env: EnvConfig,
    pub network: NetworkConfig,
    pub service: ServiceConfig,
}

impl StackConfig {
    /// Validate everything that can be checked before any builder runs.
    ///
    /// Builders re-check their own inputs; this front-loads the common
    /// configuration errors so composition fails before the first
    /// descriptor exists.
    pub fn validate(&self) -> Result<(), TopologyError> {
        naming::validate_prefix(&self.name_prefix)?;
        naming::validate_account_id(&self.env.account_id)?;
        naming::validate_account_id(&self.log_delivery_account)?;
        if self.network.az_count == 0 || self.network.az_count > MAX_AZ_COUNT {
            return Err(TopologyError::InvalidAzCount {
                requested: self.network.az_count,
                max: MAX_AZ_COUNT,
            });
        }
        Ok(())
    }
}
