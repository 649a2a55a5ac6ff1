//! Folder service and relationship processor collaborator

use crate::models::{Folder, FolderPath, FolderSummary};
use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

pub trait FolderStore: Send + Sync {
    fn find_folder(&self, path: &FolderPath) -> Result<Option<Folder>>;

    /// Immediate child folders of a path
    fn child_folders(&self, path: &FolderPath) -> Result<Vec<FolderSummary>>;

    /// Create or update a folder; the parent must exist
    fn save_folder(&self, path: &FolderPath, folder: &Folder) -> Result<()>;

    fn folder_paths(&self) -> Result<Vec<FolderPath>>;
}

/// In-memory folder tree; the root always exists
#[derive(Debug, Default)]
pub struct MemoryFolderStore {
    folders: Mutex<BTreeMap<FolderPath, Folder>>,
}

impl MemoryFolderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn folders(&self) -> Result<MutexGuard<'_, BTreeMap<FolderPath, Folder>>> {
        self.folders
            .lock()
            .map_err(|_| anyhow!("Folder store lock poisoned"))
    }

    /// Create a folder and any missing ancestors
    pub fn create_all(&self, path: &FolderPath) -> Result<()> {
        let mut folders = self.folders()?;
        let mut current = FolderPath::root();
        for name in path.names() {
            current = current.child(name).map_err(|e| anyhow!("{}", e))?;
            folders
                .entry(current.clone())
                .or_insert_with(|| Folder::new(name.clone()));
        }
        Ok(())
    }
}

impl FolderStore for MemoryFolderStore {
    fn find_folder(&self, path: &FolderPath) -> Result<Option<Folder>> {
        Ok(self.folders()?.get(path).cloned())
    }

    fn child_folders(&self, path: &FolderPath) -> Result<Vec<FolderSummary>> {
        Ok(self
            .folders()?
            .iter()
            .filter(|(p, _)| p.parent().as_ref() == Some(path))
            .map(|(p, f)| FolderSummary {
                name: f.name.clone(),
                path: p.clone(),
            })
            .collect())
    }

    fn save_folder(&self, path: &FolderPath, folder: &Folder) -> Result<()> {
        let Some(parent) = path.parent() else {
            bail!("The root folder cannot be saved");
        };
        let mut folders = self.folders()?;
        if !parent.is_root() && !folders.contains_key(&parent) {
            bail!("Parent folder {} does not exist", parent);
        }
        folders.insert(path.clone(), folder.clone());
        Ok(())
    }

    fn folder_paths(&self) -> Result<Vec<FolderPath>> {
        Ok(self.folders()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_immediate_children() {
        let store = MemoryFolderStore::new();
        store.create_all(&FolderPath::parse("/Sites/Corp/Files")).unwrap();
        store.create_all(&FolderPath::parse("/Sites/Intranet")).unwrap();

        let mut names: Vec<String> = store
            .child_folders(&FolderPath::parse("/Sites"))
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Corp", "Intranet"]);
    }

    #[test]
    fn save_requires_parent() {
        let store = MemoryFolderStore::new();
        let path = FolderPath::parse("/Missing/Child");
        assert!(store.save_folder(&path, &Folder::new("Child")).is_err());
    }
}
