//! Centralized test fixtures shared across module tests.

use crate::config::{
    EnvConfig, NetworkConfig, ServiceConfig, StackConfig, DEFAULT_ADDRESS_SPACE, DEFAULT_AZ_COUNT,
    DEFAULT_CONTAINER_PORT, DEFAULT_DESIRED_COUNT, DEFAULT_IMAGE, DEFAULT_SUBNET_PREFIX_LEN,
};

/// Create a valid StackConfig matching the demo topology
pub fn demo_config() -> StackConfig {
    StackConfig {
        name_prefix: "demo".to_string(),
        log_delivery_account: "582318560864".to_string(),
        env: EnvConfig {
            account_id: "111122223333".to_string(),
            region: "ap-northeast-1".to_string(),
        },
        network: NetworkConfig {
            address_space: DEFAULT_ADDRESS_SPACE.parse().unwrap(),
            az_count: DEFAULT_AZ_COUNT,
            subnet_prefix_len: DEFAULT_SUBNET_PREFIX_LEN,
        },
        service: ServiceConfig {
            image: DEFAULT_IMAGE.to_string(),
            container_port: DEFAULT_CONTAINER_PORT,
            desired_count: DEFAULT_DESIRED_COUNT,
        },
    }
}
