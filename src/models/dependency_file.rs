//! Files stored in an archive for a dependency

use crate::models::enums::DependencyFileType;
use serde::{Deserialize, Serialize};

/// Descriptor of one archived file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyFile {
    pub file_type: DependencyFileType,
    /// Location inside the archive
    pub archive_path: String,
    /// Path of the file on the source server, when it was a file there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
}

/// File produced while packaging a dependency, with its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_type: DependencyFileType,
    pub original_path: Option<String>,
    pub data: Vec<u8>,
}

impl ExportedFile {
    pub fn new(file_type: DependencyFileType, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_type,
            original_path: None,
            data: data.into(),
        }
    }

    pub fn with_original_path(mut self, path: impl Into<String>) -> Self {
        self.original_path = Some(path.into());
        self
    }
}
