//! Composite identifiers for parent-scoped objects
//!
//! Workflow states and transitions are only unique within their workflow, so
//! their dependency id carries both halves: `"<workflowId>-<stateId>"`.

use crate::error::{DeployError, DeployResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the parent and child halves
pub const PAIR_SEPARATOR: char = '-';

/// `(parent_id, child_id)` pair encoded as a single dependency id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairDependencyId {
    parent_id: String,
    child_id: String,
}

impl PairDependencyId {
    /// Create a pair id, rejecting empty halves and halves containing the separator
    pub fn new(parent_id: impl Into<String>, child_id: impl Into<String>) -> DeployResult<Self> {
        let parent_id = parent_id.into();
        let child_id = child_id.into();
        for (label, part) in [("parent", &parent_id), ("child", &child_id)] {
            if part.is_empty() {
                return Err(DeployError::InvalidArgument(format!(
                    "Pair id {} component may not be empty",
                    label
                )));
            }
            if part.contains(PAIR_SEPARATOR) {
                return Err(DeployError::InvalidArgument(format!(
                    "Pair id {} component '{}' contains the separator '{}'",
                    label, part, PAIR_SEPARATOR
                )));
            }
        }
        Ok(Self {
            parent_id,
            child_id,
        })
    }

    /// Parse a formatted pair id back into its two components
    pub fn parse(value: &str) -> DeployResult<Self> {
        let (parent, child) = value.split_once(PAIR_SEPARATOR).ok_or_else(|| {
            DeployError::InvalidArgument(format!("'{}' is not a valid pair id", value))
        })?;
        Self::new(parent, child)
    }

    pub fn format(&self) -> String {
        format!("{}{}{}", self.parent_id, PAIR_SEPARATOR, self.child_id)
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn child_id(&self) -> &str {
        &self.child_id
    }
}

impl fmt::Display for PairDependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for PairDependencyId {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
