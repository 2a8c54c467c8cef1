//! Resource tag convention
//!
//! Every network-level resource (subnets, route tables, security groups)
//! carries a `Name` tag equal to its computed name, so the provisioned
//! infrastructure is discoverable by the same names the composer derived.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `Name`  | The resource's computed `{prefix}-{qualifier}` name |

use serde::{Deserialize, Serialize};

/// Tag key for the display name of a resource
pub const TAG_NAME: &str = "Name";

/// A single resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Build the standard tag set for a named network-level resource
pub fn name_tags(name: &str) -> Vec<Tag> {
    vec![Tag::new(TAG_NAME, name)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_tag_carries_computed_name() {
        let tags = name_tags("demo-public-subnet-1");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].key, TAG_NAME);
        assert_eq!(tags[0].value, "demo-public-subnet-1");
    }
}
