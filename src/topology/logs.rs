//! Log sink descriptors
//!
//! Two diagnostics destinations exist in the topology: a log group for the
//! front task's container output, and an object-storage bucket for the
//! load balancer's access logs. Both declare their retention window,
//! encryption mode, and teardown policy up front; the bucket additionally
//! carries the resource-policy grant that lets the platform's log-delivery
//! identity write into it.

use serde::{Deserialize, Serialize};

/// Retention window for the task log group, in days
pub const TASK_LOG_RETENTION_DAYS: u32 = 180;

/// Expiration window for balancer access logs, in days
pub const ACCESS_LOG_EXPIRATION_DAYS: u32 = 183;

/// What happens to the sink when the topology is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalPolicy {
    /// Delete the sink together with the stack
    Destroy,
    /// Keep the sink after the stack is gone
    Retain,
}

/// Server-side encryption mode of the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionMode {
    /// Keys owned and rotated by the platform
    PlatformManaged,
    /// No server-side encryption
    Unencrypted,
}

/// A resource-policy statement granting a principal access to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyGrant {
    /// 12-digit account id of the granted principal
    pub principal_account: String,
    /// Allowed actions, e.g. `s3:PutObject`
    pub actions: Vec<String>,
    /// Resource pattern the grant applies to
    pub resource: String,
}

/// Where the sink's data lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum LogDestination {
    /// A named log group
    LogGroup { name: String },
    /// An object-storage bucket
    Bucket {
        name: String,
        versioned: bool,
        /// Identifier of the expiration lifecycle rule
        lifecycle_rule_id: String,
        /// Purge remaining objects when the bucket is destroyed
        auto_purge_objects: bool,
    },
}

/// Declarative description of one log sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSinkDescriptor {
    pub destination: LogDestination,
    /// Days before entries are deleted
    pub retention_days: u32,
    pub encryption: EncryptionMode,
    pub removal_policy: RemovalPolicy,
    /// Resource-policy grants to principals outside the topology's account
    pub grants: Vec<PolicyGrant>,
}

impl LogSinkDescriptor {
    /// A log-group sink with the standard retention and teardown policy
    pub fn log_group(name: impl Into<String>, retention_days: u32) -> Self {
        Self {
            destination: LogDestination::LogGroup { name: name.into() },
            retention_days,
            encryption: EncryptionMode::PlatformManaged,
            removal_policy: RemovalPolicy::Destroy,
            grants: Vec::new(),
        }
    }

    /// A versioned, encrypted bucket sink that expires objects after
    /// `expiration_days` and purges itself on teardown
    pub fn bucket(
        name: impl Into<String>,
        lifecycle_rule_id: impl Into<String>,
        expiration_days: u32,
    ) -> Self {
        Self {
            destination: LogDestination::Bucket {
                name: name.into(),
                versioned: true,
                lifecycle_rule_id: lifecycle_rule_id.into(),
                auto_purge_objects: true,
            },
            retention_days: expiration_days,
            encryption: EncryptionMode::PlatformManaged,
            removal_policy: RemovalPolicy::Destroy,
            grants: Vec::new(),
        }
    }

    /// Add a write grant for an external account on every object in the sink
    pub fn with_object_write_grant(mut self, principal_account: impl Into<String>) -> Self {
        let resource = match &self.destination {
            LogDestination::Bucket { name, .. } => format!("arn:aws:s3:::{name}/*"),
            LogDestination::LogGroup { name } => name.clone(),
        };
        self.grants.push(PolicyGrant {
            principal_account: principal_account.into(),
            actions: vec!["s3:PutObject".to_string()],
            resource,
        });
        self
    }

    /// The sink's identity (log group name or bucket name)
    pub fn identity(&self) -> &str {
        match &self.destination {
            LogDestination::LogGroup { name } => name,
            LogDestination::Bucket { name, .. } => name,
        }
    }

    /// Render the sink's resource policy, if any grants exist.
    pub fn access_policy_document(&self) -> Option<serde_json::Value> {
        if self.grants.is_empty() {
            return None;
        }
        let statements: Vec<serde_json::Value> = self
            .grants
            .iter()
            .map(|g| {
                serde_json::json!({
                    "Effect": "Allow",
                    "Principal": {
                        "AWS": format!("arn:aws:iam::{}:root", g.principal_account)
                    },
                    "Action": g.actions,
                    "Resource": g.resource,
                })
            })
            .collect();
        Some(serde_json::json!({
            "Version": "2012-10-17",
            "Statement": statements,
        }))
    }
}
