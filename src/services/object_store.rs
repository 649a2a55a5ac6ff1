//! XML object store collaborator
//!
//! Holds application documents, the files stored under each application and
//! the ID-type definitions recorded for an application. Writes to application
//! files are guarded by pessimistic locks.

use crate::models::ObjectType;
use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Handle of an acquired lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockId(pub Uuid);

/// One ID-type definition: a literal in an application element that refers
/// to an object of another type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdTypeEntry {
    /// Element whose text carries the id
    pub element: String,
    /// Literal id value as found in the source document
    pub value: String,
    pub object_type: ObjectType,
}

/// XML object store interface
pub trait ObjectStore: Send + Sync {
    fn list_applications(&self) -> Result<Vec<String>>;

    fn application_exists(&self, name: &str) -> Result<bool>;

    /// Application document as XML text
    fn load_application(&self, name: &str) -> Result<String>;

    fn save_application(&self, name: &str, xml: &str) -> Result<()>;

    /// Paths of the files stored under an application, relative to it
    fn list_application_files(&self, app: &str) -> Result<Vec<String>>;

    fn application_file_exists(&self, app: &str, path: &str) -> Result<bool>;

    fn load_application_file(&self, app: &str, path: &str) -> Result<Vec<u8>>;

    /// Save a file; the caller must hold the lock for `app-path`
    fn save_application_file(&self, app: &str, path: &str, data: &[u8], lock: LockId) -> Result<()>;

    /// ID-type definitions recorded for an application
    fn load_id_types(&self, app: &str) -> Result<Vec<IdTypeEntry>>;

    fn save_id_types(&self, app: &str, entries: &[IdTypeEntry]) -> Result<()>;

    /// Acquire a lock, waiting up to `timeout`; with `steal` an expired wait
    /// takes over the existing lock instead of failing
    fn acquire_lock(&self, key: &str, timeout: Duration, steal: bool) -> Result<LockId>;

    fn release_lock(&self, key: &str, lock: LockId) -> Result<()>;
}

#[derive(Debug, Default)]
struct ObjectStoreState {
    applications: BTreeMap<String, String>,
    files: HashMap<String, BTreeMap<String, Vec<u8>>>,
    id_types: HashMap<String, Vec<IdTypeEntry>>,
    locks: HashMap<String, LockId>,
}

/// In-memory object store
///
/// Locks never wait: a held lock is either stolen or reported as a timeout.
/// Test hooks count releases and inject save or release failures.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    state: Mutex<ObjectStoreState>,
    releases: AtomicUsize,
    fail_file_saves: AtomicBool,
    fail_releases: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, ObjectStoreState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Object store lock poisoned"))
    }

    /// Number of successful lock releases so far
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn fail_file_saves(&self, fail: bool) {
        self.fail_file_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_releases(&self, fail: bool) {
        self.fail_releases.store(fail, Ordering::SeqCst);
    }

    pub fn held_locks(&self) -> Result<usize> {
        Ok(self.state()?.locks.len())
    }

    /// Seed a file without taking a lock
    pub fn put_application_file(&self, app: &str, path: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        self.state()?
            .files
            .entry(app.to_string())
            .or_default()
            .insert(path.to_string(), data.into());
        Ok(())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list_applications(&self) -> Result<Vec<String>> {
        Ok(self.state()?.applications.keys().cloned().collect())
    }

    fn application_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state()?.applications.contains_key(name))
    }

    fn load_application(&self, name: &str) -> Result<String> {
        self.state()?
            .applications
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("Application {} does not exist", name))
    }

    fn save_application(&self, name: &str, xml: &str) -> Result<()> {
        self.state()?
            .applications
            .insert(name.to_string(), xml.to_string());
        Ok(())
    }

    fn list_application_files(&self, app: &str) -> Result<Vec<String>> {
        Ok(self
            .state()?
            .files
            .get(app)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn application_file_exists(&self, app: &str, path: &str) -> Result<bool> {
        Ok(self
            .state()?
            .files
            .get(app)
            .is_some_and(|files| files.contains_key(path)))
    }

    fn load_application_file(&self, app: &str, path: &str) -> Result<Vec<u8>> {
        self.state()?
            .files
            .get(app)
            .and_then(|files| files.get(path))
            .cloned()
            .ok_or_else(|| anyhow!("File {}/{} does not exist", app, path))
    }

    fn save_application_file(&self, app: &str, path: &str, data: &[u8], lock: LockId) -> Result<()> {
        if self.fail_file_saves.load(Ordering::SeqCst) {
            bail!("Failed to save {}/{}: store unavailable", app, path);
        }
        let mut state = self.state()?;
        let key = format!("{}-{}", app, path);
        if state.locks.get(&key) != Some(&lock) {
            bail!("Lock {} is not held by the caller", key);
        }
        state
            .files
            .entry(app.to_string())
            .or_default()
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn load_id_types(&self, app: &str) -> Result<Vec<IdTypeEntry>> {
        Ok(self
            .state()?
            .id_types
            .get(app)
            .cloned()
            .unwrap_or_default())
    }

    fn save_id_types(&self, app: &str, entries: &[IdTypeEntry]) -> Result<()> {
        self.state()?
            .id_types
            .insert(app.to_string(), entries.to_vec());
        Ok(())
    }

    fn acquire_lock(&self, key: &str, timeout: Duration, steal: bool) -> Result<LockId> {
        let mut state = self.state()?;
        if state.locks.contains_key(key) && !steal {
            bail!("Timed out after {:?} waiting for lock {}", timeout, key);
        }
        let lock = LockId(Uuid::new_v4());
        if state.locks.insert(key.to_string(), lock).is_some() {
            debug!("Stole lock {}", key);
        }
        Ok(lock)
    }

    fn release_lock(&self, key: &str, lock: LockId) -> Result<()> {
        if self.fail_releases.load(Ordering::SeqCst) {
            bail!("Failed to release lock {}", key);
        }
        let mut state = self.state()?;
        match state.locks.get(key) {
            Some(held) if *held == lock => {
                state.locks.remove(key);
                self.releases.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            _ => bail!("Lock {} is not held by the caller", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_saves_require_the_matching_lock() {
        let store = MemoryObjectStore::new();
        store
            .save_application_file("app", "a.xsl", b"<x/>", LockId(Uuid::new_v4()))
            .unwrap_err();
        let lock = store
            .acquire_lock("app-a.xsl", Duration::from_secs(1), true)
            .unwrap();
        store
            .save_application_file("app", "a.xsl", b"<x/>", lock)
            .unwrap();
        store.release_lock("app-a.xsl", lock).unwrap();
        assert_eq!(store.release_count(), 1);
        assert!(store.application_file_exists("app", "a.xsl").unwrap());
    }

    #[test]
    fn held_lock_without_steal_times_out() {
        let store = MemoryObjectStore::new();
        store
            .acquire_lock("k", Duration::from_secs(0), false)
            .unwrap();
        assert!(store.acquire_lock("k", Duration::from_secs(0), false).is_err());
    }
}
