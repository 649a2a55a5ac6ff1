//! Models module
//!
//! Defines the data structures exchanged between handlers, collaborators and
//! the install driver.

pub mod dependency;
pub mod dependency_data;
pub mod dependency_def;
pub mod dependency_file;
pub mod design;
pub mod enums;
pub mod extension;
pub mod folder;
pub mod id_map;
pub mod pair_id;

pub use dependency::{Dependency, parse_numeric_id};
pub use dependency_data::{ColumnDef, DependencyData, Row, SelectFilter, TableSchema};
pub use dependency_def::{DependencyDef, DependencyMap, HandlerKind};
pub use dependency_file::{DependencyFile, ExportedFile};
pub use design::{
    ContentType, DesignObject, DisplayFormat, Search, Site, Slot, SlotAssociation, Template,
};
pub use enums::*;
pub use extension::ExtensionRef;
pub use folder::{Folder, FolderPath, FolderSummary};
pub use id_map::{IdMap, IdMapKey, IdMapping};
pub use pair_id::PairDependencyId;
