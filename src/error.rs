//! Error types for deployment operations
//!
//! All handler and driver operations return [`DeployResult`]. Collaborator
//! services report failures through `anyhow::Error`, which converts into
//! [`DeployError::Unexpected`] with the original message preserved.

use crate::models::enums::{DependencyFileType, ObjectType};

/// Error during dependency discovery, packaging or installation
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A caller passed a null, empty or malformed argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced object does not exist in the repository being read
    #[error("{object_type} '{id}' was not found")]
    ObjectNotFound { object_type: ObjectType, id: String },

    /// An id map is active but holds no entry for the requested key
    #[error("No ID mapping found for {object_type} '{source_id}'{}", parent_suffix(.parent_id))]
    MissingIdMapping {
        object_type: ObjectType,
        source_id: String,
        parent_id: Option<String>,
    },

    /// A mapping exists but was never assigned a target id
    #[error("ID mapping for {object_type} '{source_id}' has no target id")]
    IncompleteIdMapping {
        object_type: ObjectType,
        source_id: String,
    },

    /// A dependency file of the wrong type was handed to a parser
    #[error("Wrong dependency file type: expected {expected}, found {actual}")]
    WrongFileType {
        expected: DependencyFileType,
        actual: DependencyFileType,
    },

    /// A mandatory dependency file is absent from the archive
    #[error("Dependency {dependency} is missing a required {file_type} file")]
    MissingFileType {
        dependency: String,
        file_type: DependencyFileType,
    },

    /// The handler does not implement the requested operation
    #[error("{operation} is not supported for {object_type}")]
    Unsupported {
        operation: &'static str,
        object_type: ObjectType,
    },

    /// A handler produced a child whose type its parent does not accept
    #[error("{parent} does not accept child dependencies of type {child}")]
    UnsupportedChildType {
        parent: ObjectType,
        child: ObjectType,
    },

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backing-store failure, lock timeout, malformed XML
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

fn parent_suffix(parent_id: &Option<String>) -> String {
    match parent_id {
        Some(parent) => format!(" (parent '{}')", parent),
        None => String::new(),
    }
}

impl DeployError {
    /// True for the "missing ID mapping" kind, which association helpers treat as
    /// "this association does not apply" rather than a failure.
    pub fn is_missing_id_mapping(&self) -> bool {
        matches!(self, DeployError::MissingIdMapping { .. })
    }

    pub fn not_found(object_type: ObjectType, id: impl Into<String>) -> Self {
        DeployError::ObjectNotFound {
            object_type,
            id: id.into(),
        }
    }

    pub fn unexpected(message: impl std::fmt::Display) -> Self {
        DeployError::Unexpected(message.to_string())
    }
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Unexpected(format!("{:#}", err))
    }
}

impl From<quick_xml::Error> for DeployError {
    fn from(err: quick_xml::Error) -> Self {
        DeployError::Unexpected(format!("XML parsing error: {}", err))
    }
}

impl From<serde_json::Error> for DeployError {
    fn from(err: serde_json::Error) -> Self {
        DeployError::Unexpected(format!("JSON error: {}", err))
    }
}

/// Result type for deployment operations
pub type DeployResult<T> = Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_mapping_is_distinguishable() {
        let err = DeployError::MissingIdMapping {
            object_type: ObjectType::Slot,
            source_id: "12".to_string(),
            parent_id: None,
        };
        assert!(err.is_missing_id_mapping());
        assert!(!DeployError::unexpected("boom").is_missing_id_mapping());
        assert_eq!(err.to_string(), "No ID mapping found for Slot '12'");
    }

    #[test]
    fn anyhow_errors_keep_their_message() {
        let err: DeployError = anyhow::anyhow!("lock timed out").into();
        assert!(matches!(err, DeployError::Unexpected(ref m) if m.contains("lock timed out")));
    }
}
