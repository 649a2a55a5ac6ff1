//! Dependency handlers
//!
//! One handler per object type knows how to enumerate live objects of that
//! type, discover their child dependencies, serialize them for a package and
//! install them from an archive on another server. Shared behaviour lives in
//! capability modules rather than a base type:
//! - `id_mapping`: id map lookups, target id transforms and row actions
//! - `txn`: transaction log entries
//! - `table_transfer`: in-memory id blocks and row rewriting
//! - `app_support`: path resolution and locked application file writes
//! - `design_support`: repository lookups and the design object install pipeline

pub mod app_support;
pub mod application;
pub mod content_type;
pub mod design_support;
pub mod display_format;
pub mod element;
pub mod exit;
pub mod folder;
pub mod id_mapping;
pub mod registry;
pub mod search;
pub mod site;
pub mod slot;
pub mod stylesheet;
pub mod support_file;
pub mod table_transfer;
pub mod template;
pub mod txn;
pub mod workflow;
pub mod workflow_element;

use crate::context::ImportCtx;
use crate::error::{DeployError, DeployResult};
use crate::models::{Dependency, ExportedFile, IdMap, ObjectType};
use crate::services::{ArchiveHandler, SecurityToken};

pub use registry::HandlerRegistry;

/// Result of installing one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// The handler decided not to install; the reason is reported
    Skipped(String),
}

/// Contract every object type handler implements
///
/// Handlers are stateless apart from memoized lookups. The registry is passed
/// to every call so a handler can reach the backing stores, the dependency
/// definitions and the handlers of other types.
pub trait DependencyHandler: Send + Sync {
    fn object_type(&self) -> ObjectType;

    /// Direct children of an expanded dependency
    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>>;

    /// Every live instance of the type
    fn get_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
    ) -> DeployResult<Vec<Dependency>>;

    /// Point lookup; `Ok(None)` when the object does not exist
    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>>;

    /// Serialized representation of the dependency for a package
    fn get_dependency_files(
        &self,
        _reg: &HandlerRegistry,
        _tok: &SecurityToken,
        _dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        Ok(Vec::new())
    }

    /// Install the dependency's files from an archive
    fn install_dependency_files(
        &self,
        _reg: &HandlerRegistry,
        _tok: &SecurityToken,
        _archive: &dyn ArchiveHandler,
        _dep: &Dependency,
        _ctx: &mut ImportCtx,
    ) -> DeployResult<InstallOutcome> {
        Err(DeployError::Unsupported {
            operation: "install_dependency_files",
            object_type: self.object_type(),
        })
    }

    /// Reserve a target id for a new object
    fn reserve_new_id(
        &self,
        reg: &HandlerRegistry,
        dep: &Dependency,
        id_map: &mut IdMap,
    ) -> DeployResult<()> {
        id_mapping::reserve_target_id(reg, dep, id_map)
    }

    /// Install after every non-deferred dependency
    fn should_defer_installation(&self) -> bool {
        false
    }

    fn does_dependency_exist(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<bool> {
        Ok(self.get_dependency(reg, tok, id)?.is_some())
    }

    /// Map ids through another type's mappings
    fn delegates_id_mapping(&self) -> bool {
        false
    }

    fn id_mapping_type(&self) -> ObjectType {
        self.object_type()
    }

    fn parent_id_mapping_type(&self) -> Option<ObjectType> {
        None
    }

    /// Source id to look up when mapping is delegated; `parent` is the
    /// owning dependency when the caller knows it
    fn source_for_id_mapping(
        &self,
        _reg: &HandlerRegistry,
        id: &str,
        _parent: Option<(&str, ObjectType)>,
    ) -> DeployResult<String> {
        Ok(id.to_string())
    }
}

/// Keep the first occurrence of every dependency key
pub(crate) fn dedup_dependencies(deps: Vec<Dependency>) -> Vec<Dependency> {
    let mut seen = std::collections::HashSet::new();
    deps.into_iter().filter(|d| seen.insert(d.key())).collect()
}
