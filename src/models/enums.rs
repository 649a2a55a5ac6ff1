//! Enums for deployment objects
//!
//! # Serde Casing Conventions
//!
//! - `PascalCase` (no rename): object type tags, matching the names used in
//!   package descriptors and id maps (`ContentType`, `WorkflowState`)
//! - `SCREAMING_SNAKE_CASE`: archive file tags and log actions, which are
//!   persisted vocabulary shared with other servers (`APPLICATION_XML`,
//!   `CREATED`)
//! - `lowercase`: dependency sharing levels (`system`, `shared`, `local`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tag identifying the kind of CMS object a dependency refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    Application,
    SupportFile,
    Stylesheet,
    Exit,
    ContentEditor,
    ContentType,
    Template,
    Variant,
    Slot,
    Site,
    Workflow,
    WorkflowState,
    WorkflowTransition,
    Search,
    View,
    DisplayFormat,
    Folder,
    Community,
    Acl,
    SharedGroup,
    Context,
    Role,
}

impl ObjectType {
    pub const ALL: [ObjectType; 22] = [
        ObjectType::Application,
        ObjectType::SupportFile,
        ObjectType::Stylesheet,
        ObjectType::Exit,
        ObjectType::ContentEditor,
        ObjectType::ContentType,
        ObjectType::Template,
        ObjectType::Variant,
        ObjectType::Slot,
        ObjectType::Site,
        ObjectType::Workflow,
        ObjectType::WorkflowState,
        ObjectType::WorkflowTransition,
        ObjectType::Search,
        ObjectType::View,
        ObjectType::DisplayFormat,
        ObjectType::Folder,
        ObjectType::Community,
        ObjectType::Acl,
        ObjectType::SharedGroup,
        ObjectType::Context,
        ObjectType::Role,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Application => "Application",
            ObjectType::SupportFile => "SupportFile",
            ObjectType::Stylesheet => "Stylesheet",
            ObjectType::Exit => "Exit",
            ObjectType::ContentEditor => "ContentEditor",
            ObjectType::ContentType => "ContentType",
            ObjectType::Template => "Template",
            ObjectType::Variant => "Variant",
            ObjectType::Slot => "Slot",
            ObjectType::Site => "Site",
            ObjectType::Workflow => "Workflow",
            ObjectType::WorkflowState => "WorkflowState",
            ObjectType::WorkflowTransition => "WorkflowTransition",
            ObjectType::Search => "Search",
            ObjectType::View => "View",
            ObjectType::DisplayFormat => "DisplayFormat",
            ObjectType::Folder => "Folder",
            ObjectType::Community => "Community",
            ObjectType::Acl => "Acl",
            ObjectType::SharedGroup => "SharedGroup",
            ObjectType::Context => "Context",
            ObjectType::Role => "Role",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown object type: {}", s))
    }
}

/// How a dependency is shared between packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// Shipped with every server; never packaged
    System,
    /// May be referenced by several parents
    #[default]
    Shared,
    /// Exclusively owned by its parent
    Local,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyType::System => write!(f, "system"),
            DependencyType::Shared => write!(f, "shared"),
            DependencyType::Local => write!(f, "local"),
        }
    }
}

/// Action recorded in the transaction log for an installed element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowAction {
    Created,
    Modified,
    Deleted,
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowAction::Created => write!(f, "CREATED"),
            RowAction::Modified => write!(f, "MODIFIED"),
            RowAction::Deleted => write!(f, "DELETED"),
        }
    }
}

/// Tag on every file stored in an archive for a dependency
///
/// Install logic branches on this tag to pick a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyFileType {
    ApplicationXml,
    ApplicationFile,
    ItemDefinition,
    NodeDefinition,
    DbmsData,
    DbmsSchema,
    #[serde(rename = "SERVICEGENERATED_XML")]
    ServiceGeneratedXml,
    SupportFile,
}

impl DependencyFileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyFileType::ApplicationXml => "APPLICATION_XML",
            DependencyFileType::ApplicationFile => "APPLICATION_FILE",
            DependencyFileType::ItemDefinition => "ITEM_DEFINITION",
            DependencyFileType::NodeDefinition => "NODE_DEFINITION",
            DependencyFileType::DbmsData => "DBMS_DATA",
            DependencyFileType::DbmsSchema => "DBMS_SCHEMA",
            DependencyFileType::ServiceGeneratedXml => "SERVICEGENERATED_XML",
            DependencyFileType::SupportFile => "SUPPORT_FILE",
        }
    }
}

impl fmt::Display for DependencyFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_parses_case_insensitively() {
        assert_eq!("contenttype".parse::<ObjectType>(), Ok(ObjectType::ContentType));
        assert_eq!(" Slot ".parse::<ObjectType>(), Ok(ObjectType::Slot));
        assert!("Gadget".parse::<ObjectType>().is_err());
    }

    #[test]
    fn file_type_tags_serialize_to_archive_vocabulary() {
        let json = serde_json::to_string(&DependencyFileType::ServiceGeneratedXml).unwrap();
        assert_eq!(json, "\"SERVICEGENERATED_XML\"");
        let json = serde_json::to_string(&DependencyFileType::DbmsData).unwrap();
        assert_eq!(json, "\"DBMS_DATA\"");
    }
}
