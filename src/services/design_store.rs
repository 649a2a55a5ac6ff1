//! Design object repositories
//!
//! One [`DesignStore`] per design object type. Saves use optimistic locking:
//! an update must carry the version it was loaded with, and a new object must
//! carry none.

use crate::models::DesignObject;
use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Repository of one design object type keyed by GUID
pub trait DesignStore<T: DesignObject>: Send + Sync {
    fn find(&self, id: u64) -> Result<Option<T>>;

    fn find_by_name(&self, name: &str) -> Result<Option<T>>;

    fn list(&self) -> Result<Vec<T>>;

    /// Insert or update, returning the stored object with its new version
    fn save(&self, object: &T) -> Result<T>;

    fn exists(&self, id: u64) -> Result<bool> {
        Ok(self.find(id)?.is_some())
    }
}

/// In-memory repository
#[derive(Debug)]
pub struct MemoryDesignStore<T> {
    objects: Mutex<BTreeMap<u64, T>>,
}

impl<T> Default for MemoryDesignStore<T> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<T: DesignObject> MemoryDesignStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> Result<MutexGuard<'_, BTreeMap<u64, T>>> {
        self.objects
            .lock()
            .map_err(|_| anyhow!("{} store lock poisoned", T::ROOT))
    }

    /// Seed an object, bypassing the version check
    pub fn insert(&self, mut object: T) -> Result<()> {
        if object.version().is_none() {
            object.set_version(Some(0));
        }
        self.objects()?.insert(object.id(), object);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.objects()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.objects()?.is_empty())
    }
}

impl<T: DesignObject> DesignStore<T> for MemoryDesignStore<T> {
    fn find(&self, id: u64) -> Result<Option<T>> {
        Ok(self.objects()?.get(&id).cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<T>> {
        Ok(self
            .objects()?
            .values()
            .find(|o| o.name().eq_ignore_ascii_case(name))
            .cloned())
    }

    fn list(&self) -> Result<Vec<T>> {
        Ok(self.objects()?.values().cloned().collect())
    }

    fn save(&self, object: &T) -> Result<T> {
        let mut objects = self.objects()?;
        let current = objects.get(&object.id()).and_then(|o| o.version());
        if current != object.version() {
            bail!(
                "Stale {} {}: stored version {:?}, saved version {:?}",
                T::ROOT,
                object.id(),
                current,
                object.version()
            );
        }
        let mut stored = object.clone();
        stored.set_version(Some(current.map_or(0, |v| v + 1)));
        debug!("Saved {} {} ({})", T::ROOT, stored.id(), stored.name());
        objects.insert(stored.id(), stored.clone());
        Ok(stored)
    }
}
