//! Role builder: execution and task identities for the front service
//!
//! The two roles are deliberately distinct: the execution role is what the
//! orchestrator uses to pull images and ship logs, the task role is what
//! the running container uses to call other services. The execution role
//! must never be granted task-level application permissions.

use crate::config::StackConfig;
use crate::error::TopologyError;
use crate::naming::{self, qualifier};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Service principal allowed to assume both roles
pub const ECS_TASKS_SERVICE_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Managed policy granting container-runtime pull/log permissions
pub const EXECUTION_ROLE_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";

/// A policy attached to a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum PolicyAttachment {
    /// Reference to a platform-managed policy
    Managed { arn: String },
    /// Inline policy document
    Inline {
        name: String,
        document: serde_json::Value,
    },
}

/// Declarative description of one IAM role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    pub name: String,
    /// Service principal that may assume this role
    pub trusted_principal: String,
    /// Rendered trust policy document
    pub assume_role_policy: serde_json::Value,
    pub policies: Vec<PolicyAttachment>,
}

/// The two identities every composed service carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRoles {
    pub execution: RoleDescriptor,
    pub task: RoleDescriptor,
}

fn assume_role_policy(principal: &str) -> serde_json::Value {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": { "Service": principal },
                "Action": "sts:AssumeRole"
            }
        ]
    })
}

fn build_role(name: String, policies: Vec<PolicyAttachment>) -> Result<RoleDescriptor, TopologyError> {
    naming::validate_role_name(&name)?;
    info!(role = %name, "Building IAM role");
    Ok(RoleDescriptor {
        name,
        trusted_principal: ECS_TASKS_SERVICE_PRINCIPAL.to_string(),
        assume_role_policy: assume_role_policy(ECS_TASKS_SERVICE_PRINCIPAL),
        policies,
    })
}

/// Build the execution role with exactly the managed runtime policy
pub fn build_execution_role(config: &StackConfig) -> Result<RoleDescriptor, TopologyError> {
    build_role(
        naming::resource_name(&config.name_prefix, qualifier::EXECUTION_ROLE),
        vec![PolicyAttachment::Managed {
            arn: EXECUTION_ROLE_POLICY_ARN.to_string(),
        }],
    )
}

/// Build the task role with no policies; permissions are attached later by
/// the application's owners
pub fn build_task_role(config: &StackConfig) -> Result<RoleDescriptor, TopologyError> {
    build_role(
        naming::resource_name(&config.name_prefix, qualifier::TASK_ROLE),
        Vec::new(),
    )
}

/// Build both identities and guarantee they are distinct
pub fn build_service_roles(config: &StackConfig) -> Result<ServiceRoles, TopologyError> {
    let execution = build_execution_role(config)?;
    let task = build_task_role(config)?;
    if execution.name == task.name {
        return Err(TopologyError::DuplicateName {
            name: execution.name,
        });
    }
    Ok(ServiceRoles { execution, task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::demo_config;

    #[test]
    fn execution_role_has_exactly_the_managed_policy() {
        let role = build_execution_role(&demo_config()).unwrap();
        assert_eq!(role.name, "demo-ecs-task-execution-role");
        assert_eq!(role.policies.len(), 1);
        assert_eq!(
            role.policies[0],
            PolicyAttachment::Managed {
                arn: EXECUTION_ROLE_POLICY_ARN.to_string()
            }
        );
    }

    #[test]
    fn task_role_starts_with_no_policies() {
        let role = build_task_role(&demo_config()).unwrap();
        assert_eq!(role.name, "demo-front-ecs-task-role");
        assert!(role.policies.is_empty());
    }

    #[test]
    fn both_roles_trust_only_the_orchestrator() {
        let roles = build_service_roles(&demo_config()).unwrap();
        for role in [&roles.execution, &roles.task] {
            assert_eq!(role.trusted_principal, ECS_TASKS_SERVICE_PRINCIPAL);
            assert_eq!(
                role.assume_role_policy["Statement"][0]["Principal"]["Service"],
                ECS_TASKS_SERVICE_PRINCIPAL
            );
            assert_eq!(
                role.assume_role_policy["Statement"][0]["Action"],
                "sts:AssumeRole"
            );
        }
    }

    #[test]
    fn roles_are_distinct_identities() {
        let roles = build_service_roles(&demo_config()).unwrap();
        assert_ne!(roles.execution.name, roles.task.name);
    }

    #[test]
    fn rejects_role_name_over_limit() {
        let mut config = demo_config();
        // pushes the derived role name past the platform's 64-character limit
        config.name_prefix = "a".repeat(50);
        assert!(matches!(
            build_execution_role(&config).unwrap_err(),
            TopologyError::InvalidName { .. }
        ));
    }
}
