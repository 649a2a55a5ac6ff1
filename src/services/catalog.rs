//! Catalog collaborators for simple named elements and back-end roles

use crate::models::ObjectType;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// Catalogued element: community, ACL, shared group, context, exit or role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

pub trait ElementCatalog: Send + Sync {
    fn list(&self, object_type: ObjectType) -> Result<Vec<CatalogEntry>>;

    fn find(&self, object_type: ObjectType, id: &str) -> Result<Option<CatalogEntry>> {
        Ok(self
            .list(object_type)?
            .into_iter()
            .find(|entry| entry.id == id))
    }
}

/// Back-end role catalog used by workflows
pub trait RoleCatalog: Send + Sync {
    fn role_exists(&self, name: &str) -> Result<bool>;

    fn create_role(&self, name: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryElementCatalog {
    entries: Mutex<BTreeMap<ObjectType, Vec<CatalogEntry>>>,
}

impl MemoryElementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, BTreeMap<ObjectType, Vec<CatalogEntry>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("Element catalog lock poisoned"))
    }

    pub fn add(&self, object_type: ObjectType, id: &str, name: &str) -> Result<()> {
        let mut entries = self.entries()?;
        let list = entries.entry(object_type).or_default();
        list.retain(|e| e.id != id);
        list.push(CatalogEntry::new(id, name));
        Ok(())
    }
}

impl ElementCatalog for MemoryElementCatalog {
    fn list(&self, object_type: ObjectType) -> Result<Vec<CatalogEntry>> {
        Ok(self
            .entries()?
            .get(&object_type)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRoleCatalog {
    roles: Mutex<BTreeSet<String>>,
}

impl MemoryRoleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn roles(&self) -> Result<MutexGuard<'_, BTreeSet<String>>> {
        self.roles
            .lock()
            .map_err(|_| anyhow!("Role catalog lock poisoned"))
    }

    pub fn role_names(&self) -> Result<Vec<String>> {
        Ok(self.roles()?.iter().cloned().collect())
    }
}

impl RoleCatalog for MemoryRoleCatalog {
    fn role_exists(&self, name: &str) -> Result<bool> {
        Ok(self.roles()?.contains(name))
    }

    fn create_role(&self, name: &str) -> Result<()> {
        self.roles()?.insert(name.to_string());
        Ok(())
    }
}
