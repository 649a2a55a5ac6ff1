//! Extension (exit) references
//!
//! Extensions are addressed by a fully qualified name of the form
//! `handler/context.../name`, e.g. `Java/global/percussion/generic/sys_MakeIntLink`.

use crate::error::{DeployError, DeployResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parsed extension reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtensionRef {
    /// Extension handler name (e.g. `Java`)
    pub handler: String,
    /// Context path, always ending with `/` (e.g. `global/percussion/generic/`)
    pub context: String,
    /// Short extension name (e.g. `sys_MakeIntLink`)
    pub name: String,
}

impl ExtensionRef {
    pub fn new(
        handler: impl Into<String>,
        context: impl Into<String>,
        name: impl Into<String>,
    ) -> DeployResult<Self> {
        let handler = handler.into();
        let mut context = context.into();
        let name = name.into();
        if handler.is_empty() || name.is_empty() || context.trim_matches('/').is_empty() {
            return Err(DeployError::InvalidArgument(format!(
                "Extension reference requires handler, context and name (got '{}', '{}', '{}')",
                handler, context, name
            )));
        }
        if handler.contains('/') || name.contains('/') {
            return Err(DeployError::InvalidArgument(format!(
                "Extension handler and name may not contain '/': '{}', '{}'",
                handler, name
            )));
        }
        if !context.ends_with('/') {
            context.push('/');
        }
        Ok(Self {
            handler,
            context,
            name,
        })
    }

    /// Parse a fully qualified name
    pub fn parse(fqn: &str) -> DeployResult<Self> {
        let trimmed = fqn.trim().trim_matches('/');
        let parts: Vec<&str> = trimmed.split('/').collect();
        if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(DeployError::InvalidArgument(format!(
                "'{}' is not a valid extension reference",
                fqn
            )));
        }
        let handler = parts[0];
        let name = parts[parts.len() - 1];
        let context = parts[1..parts.len() - 1].join("/");
        Self::new(handler, context, name)
    }

    pub fn fqn(&self) -> String {
        format!("{}/{}{}", self.handler, self.context, self.name)
    }

    /// True when the extension lives in the product's own context
    pub fn is_system(&self) -> bool {
        self.context.split('/').any(|segment| segment == "percussion")
    }
}

impl fmt::Display for ExtensionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqn())
    }
}

impl FromStr for ExtensionRef {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
