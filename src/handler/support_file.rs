//! Support file handler
//!
//! Support files are non-stylesheet files stored under an application,
//! identified as `app/path/to/file`.

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::app_support::{is_stylesheet_path, split_app_path, with_application_lock};
use crate::handler::id_mapping::action_for_existence;
use crate::handler::txn::{ELEMENT_FILE, add_transaction_log_entry};
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome};
use crate::models::{Dependency, DependencyFileType, ExportedFile, ObjectType};
use crate::services::archive::require_file;
use crate::services::{ArchiveHandler, SecurityToken};
use tracing::info;

pub struct SupportFileHandler;

impl DependencyHandler for SupportFileHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::SupportFile
    }

    fn get_child_dependencies(
        &self,
        _reg: &HandlerRegistry,
        _tok: &SecurityToken,
        _dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        Ok(Vec::new())
    }

    fn get_dependencies(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
    ) -> DeployResult<Vec<Dependency>> {
        let store = &reg.services().object_store;
        let mut deps = Vec::new();
        for app in store.list_applications()? {
            for path in store.list_application_files(&app)? {
                if is_stylesheet_path(&path) {
                    continue;
                }
                let id = format!("{}/{}", app, path);
                deps.push(reg.new_dependency(ObjectType::SupportFile, id.clone(), id)?);
            }
        }
        Ok(deps)
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        let (app, path) = split_app_path(id)?;
        if !reg
            .services()
            .object_store
            .application_file_exists(app, path)?
        {
            return Ok(None);
        }
        Ok(Some(reg.new_dependency(ObjectType::SupportFile, id, id)?))
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let (app, path) = split_app_path(&dep.dependency_id)?;
        let data = reg
            .services()
            .object_store
            .load_application_file(app, path)?;
        Ok(vec![
            ExportedFile::new(DependencyFileType::SupportFile, data).with_original_path(path),
        ])
    }

    fn install_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        archive: &dyn ArchiveHandler,
        dep: &Dependency,
        ctx: &mut ImportCtx,
    ) -> DeployResult<InstallOutcome> {
        let file = require_file(archive, dep, DependencyFileType::SupportFile)?;
        let data = archive.get_file_data(&file)?;
        install_application_file(reg, ctx, dep, &data)?;
        Ok(InstallOutcome::Installed)
    }
}

/// Write a file under its application while holding the file lock, then log
pub(crate) fn install_application_file(
    reg: &HandlerRegistry,
    ctx: &mut ImportCtx,
    dep: &Dependency,
    data: &[u8],
) -> DeployResult<()> {
    let (app, path) = split_app_path(&dep.dependency_id)?;
    let store = &reg.services().object_store;
    let existed = store.application_file_exists(app, path)?;

    with_application_lock(reg, app, path, |lock| {
        store.save_application_file(app, path, data, lock)?;
        Ok(())
    })?;
    info!("Installed {} {}", dep.object_type, dep.dependency_id);

    add_transaction_log_entry(
        reg,
        ctx,
        dep,
        path,
        ELEMENT_FILE,
        action_for_existence(existed),
    )
}
