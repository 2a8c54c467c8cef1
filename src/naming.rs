//! Resource naming convention
//!
//! Every resource name is `{prefix}-{qualifier}` with a fixed qualifier per
//! resource type. Subnets and their route tables additionally carry a
//! 1-based ordinal assigned in address order, so names are stable
//! run-to-run for the same inputs.

use crate::error::TopologyError;

/// Fixed per-resource-type name qualifiers
pub mod qualifier {
    pub const VPC: &str = "vpc";
    pub const ALB_SECURITY_GROUP: &str = "alb-sg";
    pub const FRONT_ECS_SECURITY_GROUP: &str = "front-ecs-sg";
    pub const EXECUTION_ROLE: &str = "ecs-task-execution-role";
    pub const TASK_ROLE: &str = "front-ecs-task-role";
    pub const CLUSTER: &str = "front-cluster";
    pub const TASK_FAMILY: &str = "front-task";
    pub const CONTAINER: &str = "front-ecs-container";
    pub const SERVICE: &str = "front-service";
    pub const LOAD_BALANCER: &str = "alb";
    pub const LISTENER: &str = "listener";
    pub const TARGET_GROUP: &str = "front-ecs-tg";
    pub const LOG_BUCKET: &str = "alb-log";
    pub const LIFECYCLE_RULE: &str = "delete-lifecycle-rule";
}

/// Maximum role name length accepted by the platform
pub const MAX_ROLE_NAME_LEN: usize = 64;

/// Maximum name prefix length; keeps every derived name, including the
/// log bucket name, inside platform limits
pub const MAX_PREFIX_LEN: usize = 32;

/// Derive a resource name from the process-wide prefix and a qualifier
pub fn resource_name(prefix: &str, qualifier: &str) -> String {
    format!("{prefix}-{qualifier}")
}

/// Name for the nth public subnet (1-based ordinal)
pub fn subnet_name(prefix: &str, ordinal: u32) -> String {
    format!("{prefix}-public-subnet-{ordinal}")
}

/// Name for the nth public subnet's route table (1-based ordinal)
pub fn route_table_name(prefix: &str, ordinal: u32) -> String {
    format!("{prefix}-public-rtb-{ordinal}-rtb")
}

/// Log group name for the front task's container output
pub fn log_group_name(prefix: &str) -> String {
    format!("/ecs/{prefix}-front-log")
}

/// Validate the process-wide name prefix.
///
/// The prefix flows into bucket names, so it is held to the strictest
/// charset: lowercase alphanumeric plus hyphens, starting with a letter,
/// no trailing hyphen.
pub fn validate_prefix(prefix: &str) -> Result<(), TopologyError> {
    let invalid = |reason: &str| TopologyError::InvalidName {
        name: prefix.to_string(),
        reason: reason.to_string(),
    };
    if prefix.is_empty() {
        return Err(invalid("empty prefix"));
    }
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(invalid("prefix too long"));
    }
    if !prefix.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
        return Err(invalid("must start with a lowercase letter"));
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "only lowercase letters, digits, and hyphens allowed",
        ));
    }
    if prefix.ends_with('-') {
        return Err(invalid("trailing hyphen"));
    }
    Ok(())
}

/// Validate a role name against the platform's naming constraints.
///
/// A violation is a fatal configuration error, not a retryable condition.
pub fn validate_role_name(name: &str) -> Result<(), TopologyError> {
    let invalid = |reason: &str| TopologyError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("empty role name"));
    }
    if name.len() > MAX_ROLE_NAME_LEN {
        return Err(invalid("role name longer than 64 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "+=,.@_-".contains(c))
    {
        return Err(invalid("character outside [A-Za-z0-9+=,.@_-]"));
    }
    Ok(())
}

/// Validate a 12-digit platform account identifier
pub fn validate_account_id(value: &str) -> Result<(), TopologyError> {
    if value.len() != 12 || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(TopologyError::InvalidAccountId {
            value: value.to_string(),
        });
    }
    Ok(())
}
