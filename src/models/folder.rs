//! Folder tree model
//!
//! Folders are path addressed: the identity of a folder is the chain of names
//! from the root, written `/Sites/EnterpriseInvestments/Files`.

use crate::error::{DeployError, DeployResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsed folder path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderPath {
    names: Vec<String>,
}

impl FolderPath {
    pub fn root() -> Self {
        Self { names: Vec::new() }
    }

    /// Split on `/`; an empty or root path yields no names
    pub fn parse(path: &str) -> Self {
        Self {
            names: path
                .split('/')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn from_names(names: Vec<String>) -> DeployResult<Self> {
        if let Some(bad) = names.iter().find(|n| n.is_empty() || n.contains('/')) {
            return Err(DeployError::InvalidArgument(format!(
                "Invalid folder name '{}'",
                bad
            )));
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_root(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<FolderPath> {
        if self.names.is_empty() {
            return None;
        }
        Some(Self {
            names: self.names[..self.names.len() - 1].to_vec(),
        })
    }

    pub fn child(&self, name: &str) -> DeployResult<FolderPath> {
        let mut names = self.names.clone();
        names.push(name.to_string());
        Self::from_names(names)
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.names.join("/"))
    }
}

/// Folder as stored by the folder service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_format_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            community_id: None,
            display_format_id: None,
            description: None,
        }
    }
}

/// Immediate child entry returned by the relationship processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSummary {
    pub name: String,
    pub path: FolderPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_and_empty_paths_have_no_names() {
        assert!(FolderPath::parse("").is_root());
        assert!(FolderPath::parse("/").is_root());
        assert_eq!(FolderPath::root().to_string(), "/");
    }

    #[test]
    fn parses_and_formats_nested_paths() {
        let path = FolderPath::parse("/Sites//Corporate/Files/");
        assert_eq!(path.names(), &["Sites", "Corporate", "Files"]);
        assert_eq!(path.to_string(), "/Sites/Corporate/Files");
        assert_eq!(path.parent().unwrap().to_string(), "/Sites/Corporate");
        assert_eq!(path.name(), Some("Files"));
    }
}
