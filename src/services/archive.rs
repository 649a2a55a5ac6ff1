//! Archive collaborator
//!
//! An archive holds the serialized files of every packaged dependency. The
//! container format is not the concern of this crate; handlers only need the
//! per-dependency file list and the bytes of each file.

use crate::error::{DeployError, DeployResult};
use crate::models::{Dependency, DependencyFile, DependencyFileType, ExportedFile};
use anyhow::{Context, Result};
use std::collections::HashMap;

/// File retrieval contract consumed by installing handlers
pub trait ArchiveHandler: Send + Sync {
    /// Files stored for a dependency, in the order they were added
    fn get_files(&self, dependency: &Dependency) -> Result<Vec<DependencyFile>>;

    /// Contents of one file
    fn get_file_data(&self, file: &DependencyFile) -> Result<Vec<u8>>;
}

/// In-memory archive used for packaging and tests
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    files: HashMap<String, Vec<DependencyFile>>,
    data: HashMap<String, Vec<u8>>,
    descriptor: Vec<Dependency>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file for a dependency and return its descriptor
    pub fn add_file(&mut self, dependency: &Dependency, file: ExportedFile) -> DependencyFile {
        let entries = self.files.entry(dependency.key()).or_default();
        let archive_path = format!(
            "{}/{}/{:03}-{}",
            dependency.object_type,
            dependency.dependency_id,
            entries.len(),
            file.file_type
        );
        let descriptor = DependencyFile {
            file_type: file.file_type,
            archive_path: archive_path.clone(),
            original_path: file.original_path,
        };
        entries.push(descriptor.clone());
        self.data.insert(archive_path, file.data);
        descriptor
    }

    pub fn has_files(&self, dependency: &Dependency) -> bool {
        self.files
            .get(&dependency.key())
            .is_some_and(|files| !files.is_empty())
    }

    /// Dependency forest the archive was built from
    pub fn descriptor(&self) -> &[Dependency] {
        &self.descriptor
    }

    pub fn set_descriptor(&mut self, roots: Vec<Dependency>) {
        self.descriptor = roots;
    }

    pub fn file_count(&self) -> usize {
        self.data.len()
    }
}

impl ArchiveHandler for MemoryArchive {
    fn get_files(&self, dependency: &Dependency) -> Result<Vec<DependencyFile>> {
        Ok(self
            .files
            .get(&dependency.key())
            .cloned()
            .unwrap_or_default())
    }

    fn get_file_data(&self, file: &DependencyFile) -> Result<Vec<u8>> {
        self.data
            .get(&file.archive_path)
            .cloned()
            .with_context(|| format!("Archive entry {} does not exist", file.archive_path))
    }
}

/// Files of one type for a dependency, in archive order
pub fn get_files_by_type(
    archive: &dyn ArchiveHandler,
    dependency: &Dependency,
    file_type: DependencyFileType,
) -> DeployResult<Vec<DependencyFile>> {
    Ok(archive
        .get_files(dependency)?
        .into_iter()
        .filter(|f| f.file_type == file_type)
        .collect())
}

/// First file of a mandatory type, or a missing-file error
pub fn require_file(
    archive: &dyn ArchiveHandler,
    dependency: &Dependency,
    file_type: DependencyFileType,
) -> DeployResult<DependencyFile> {
    get_files_by_type(archive, dependency, file_type)?
        .into_iter()
        .next()
        .ok_or_else(|| DeployError::MissingFileType {
            dependency: dependency.key(),
            file_type,
        })
}

/// Read a file as UTF-8 after checking it has the expected tag
pub fn read_text(
    archive: &dyn ArchiveHandler,
    file: &DependencyFile,
    expected: DependencyFileType,
) -> DeployResult<String> {
    check_file_type(file, expected)?;
    let bytes = archive.get_file_data(file)?;
    String::from_utf8(bytes).map_err(|e| {
        DeployError::Unexpected(format!(
            "Archive entry {} is not valid UTF-8: {}",
            file.archive_path, e
        ))
    })
}

pub fn check_file_type(file: &DependencyFile, expected: DependencyFileType) -> DeployResult<()> {
    if file.file_type != expected {
        return Err(DeployError::WrongFileType {
            expected,
            actual: file.file_type,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyType, ObjectType};

    #[test]
    fn files_come_back_in_insertion_order() {
        let dep = Dependency::new(ObjectType::Workflow, "4", "Simple", DependencyType::Shared);
        let mut archive = MemoryArchive::new();
        archive.add_file(&dep, ExportedFile::new(DependencyFileType::DbmsData, "a"));
        archive.add_file(&dep, ExportedFile::new(DependencyFileType::DbmsData, "b"));

        let files = get_files_by_type(&archive, &dep, DependencyFileType::DbmsData).unwrap();
        let data: Vec<Vec<u8>> = files
            .iter()
            .map(|f| archive.get_file_data(f).unwrap())
            .collect();
        assert_eq!(data, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn missing_mandatory_type_is_reported() {
        let dep = Dependency::new(ObjectType::Application, "app", "app", DependencyType::Shared);
        let archive = MemoryArchive::new();
        let err = require_file(&archive, &dep, DependencyFileType::ApplicationXml).unwrap_err();
        assert!(matches!(
            err,
            DeployError::MissingFileType {
                file_type: DependencyFileType::ApplicationXml,
                ..
            }
        ));
    }

    #[test]
    fn wrong_type_is_rejected_before_reading() {
        let dep = Dependency::new(ObjectType::Slot, "1", "s", DependencyType::Shared);
        let mut archive = MemoryArchive::new();
        let file = archive.add_file(&dep, ExportedFile::new(DependencyFileType::DbmsData, "x"));
        let err = read_text(&archive, &file, DependencyFileType::ServiceGeneratedXml).unwrap_err();
        assert!(matches!(err, DeployError::WrongFileType { .. }));
    }
}
