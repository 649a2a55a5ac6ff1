//! External collaborator interfaces
//!
//! The deployment core reaches every backing store through the narrow traits
//! in this module:
//! - `ArchiveHandler`: per-dependency files of a package
//! - `RelationalStore`: tables, rows and the id allocator
//! - `ObjectStore`: application documents, application files and locks
//! - `DesignStore<T>`: template, slot, site, content type, search and display
//!   format repositories
//! - `FolderStore`, `ElementCatalog`, `RoleCatalog`
//! - `TransactionLog`
//!
//! Each trait ships with an in-memory implementation.

pub mod archive;
pub mod catalog;
pub mod design_store;
pub mod folder_store;
pub mod object_store;
pub mod relational;
pub mod txn_log;

use crate::models::{ContentType, DisplayFormat, Search, Site, Slot, Template};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub use archive::{ArchiveHandler, MemoryArchive};
pub use catalog::{
    CatalogEntry, ElementCatalog, MemoryElementCatalog, MemoryRoleCatalog, RoleCatalog,
};
pub use design_store::{DesignStore, MemoryDesignStore};
pub use folder_store::{FolderStore, MemoryFolderStore};
pub use object_store::{IdTypeEntry, LockId, MemoryObjectStore, ObjectStore};
pub use relational::{MemoryRelationalStore, RelationalStore};
pub use txn_log::{MemoryTransactionLog, TransactionLog, TxnLogEntry};

/// Opaque security token passed through to collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityToken {
    pub user: String,
    pub session: Uuid,
}

impl SecurityToken {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            session: Uuid::new_v4(),
        }
    }
}

/// Backing stores of one server, as seen by the handlers
#[derive(Clone)]
pub struct Services {
    pub object_store: Arc<dyn ObjectStore>,
    pub relational: Arc<dyn RelationalStore>,
    pub templates: Arc<dyn DesignStore<Template>>,
    pub slots: Arc<dyn DesignStore<Slot>>,
    pub sites: Arc<dyn DesignStore<Site>>,
    pub content_types: Arc<dyn DesignStore<ContentType>>,
    pub searches: Arc<dyn DesignStore<Search>>,
    pub display_formats: Arc<dyn DesignStore<DisplayFormat>>,
    pub folders: Arc<dyn FolderStore>,
    pub elements: Arc<dyn ElementCatalog>,
    pub roles: Arc<dyn RoleCatalog>,
}

/// Concrete in-memory stores, kept so callers can seed and inspect them
#[derive(Debug, Clone, Default)]
pub struct MemoryServices {
    pub object_store: Arc<MemoryObjectStore>,
    pub relational: Arc<MemoryRelationalStore>,
    pub templates: Arc<MemoryDesignStore<Template>>,
    pub slots: Arc<MemoryDesignStore<Slot>>,
    pub sites: Arc<MemoryDesignStore<Site>>,
    pub content_types: Arc<MemoryDesignStore<ContentType>>,
    pub searches: Arc<MemoryDesignStore<Search>>,
    pub display_formats: Arc<MemoryDesignStore<DisplayFormat>>,
    pub folders: Arc<MemoryFolderStore>,
    pub elements: Arc<MemoryElementCatalog>,
    pub roles: Arc<MemoryRoleCatalog>,
}

impl MemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object view sharing the same stores
    pub fn services(&self) -> Services {
        Services {
            object_store: self.object_store.clone(),
            relational: self.relational.clone(),
            templates: self.templates.clone(),
            slots: self.slots.clone(),
            sites: self.sites.clone(),
            content_types: self.content_types.clone(),
            searches: self.searches.clone(),
            display_formats: self.display_formats.clone(),
            folders: self.folders.clone(),
            elements: self.elements.clone(),
            roles: self.roles.clone(),
        }
    }
}
