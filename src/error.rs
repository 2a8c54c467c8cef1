//! Error taxonomy for topology composition
//!
//! Every error at this layer is fatal: composition halts and no partial
//! topology is returned. Retries belong to the provisioning engine, never
//! to the composer.

use thiserror::Error;

/// Errors raised while composing a topology
#[derive(Debug, Error)]
pub enum TopologyError {
    /// CIDR string could not be parsed or is not a network address
    #[error("Invalid CIDR '{value}': {reason}")]
    InvalidCidr { value: String, reason: String },

    /// A resource name violates the platform's naming constraints
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// An account identifier is not a well-formed 12-digit account id
    #[error("Invalid account id '{value}'")]
    InvalidAccountId { value: String },

    /// Two resources were declared with the same name
    #[error("Duplicate resource name '{name}'")]
    DuplicateName { name: String },

    /// Requested availability-zone count is outside the supported range
    #[error("Availability zone count {requested} outside supported range 1..={max}")]
    InvalidAzCount { requested: u32, max: u32 },

    /// The address space cannot hold the requested number of subnets
    #[error("Address space {address_space} cannot hold {requested} /{prefix_len} subnets")]
    SubnetSpaceExhausted {
        address_space: String,
        prefix_len: u8,
        requested: u32,
    },

    /// An ingress rule names a source security group that was never built
    #[error("Security group '{group}' references unknown source group '{source_group}'")]
    UnknownIngressSource { group: String, source_group: String },

    /// A reference between resources would close a cycle
    #[error("Reference from '{from}' to '{to}' would create a cycle")]
    CyclicReference { from: String, to: String },

    /// A listener was declared without any target group, or a target group
    /// without any target
    #[error("Listener '{listener}' has no targets")]
    EmptyListener { listener: String },

    /// A builder was invoked before one of its declared dependencies existed
    #[error("'{resource}' requires '{dependency}' which has not been built")]
    MissingDependency {
        resource: String,
        dependency: String,
    },
}

impl TopologyError {
    /// Check if this is a configuration error (bad input to the composer)
    pub fn is_configuration(&self) -> bool {
        !self.is_ordering()
    }

    /// Check if this is a composition-order error: a builder invoked before
    /// its dependency, which is a programmer error in the composer
    pub fn is_ordering(&self) -> bool {
        matches!(self, TopologyError::MissingDependency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_errors() {
        let err = TopologyError::MissingDependency {
            resource: "demo-front-service".to_string(),
            dependency: "demo-front-ecs-sg".to_string(),
        };
        assert!(err.is_ordering());
        assert!(!err.is_configuration());
    }

    #[test]
    fn configuration_errors() {
        let errs = [
            TopologyError::InvalidCidr {
                value: "10.0.0.0/33".to_string(),
                reason: "prefix length out of range".to_string(),
            },
            TopologyError::InvalidName {
                name: "bad name".to_string(),
                reason: "whitespace".to_string(),
            },
            TopologyError::InvalidAccountId {
                value: "abc".to_string(),
            },
            TopologyError::DuplicateName {
                name: "demo-vpc".to_string(),
            },
            TopologyError::InvalidAzCount {
                requested: 9,
                max: 6,
            },
            TopologyError::UnknownIngressSource {
                group: "demo-front-ecs-sg".to_string(),
                source_group: "demo-alb-sg".to_string(),
            },
            TopologyError::CyclicReference {
                from: "a".to_string(),
                to: "b".to_string(),
            },
            TopologyError::EmptyListener {
                listener: "demo-listener".to_string(),
            },
        ];
        for err in errs {
            assert!(err.is_configuration(), "expected configuration: {err}");
            assert!(!err.is_ordering());
        }
    }

    #[test]
    fn error_messages_name_the_offender() {
        let err = TopologyError::UnknownIngressSource {
            group: "b".to_string(),
            source_group: "c".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains('b') && msg.contains('c'));
    }
}
