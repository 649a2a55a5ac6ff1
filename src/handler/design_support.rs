//! Design object support: repository lookups and the install pipeline shared
//! by templates, slots, sites, content types, searches and display formats

use crate::context::ImportCtx;
use crate::error::{DeployError, DeployResult};
use crate::handler::id_mapping::{get_row_action, numeric_target_id_for};
use crate::handler::txn::{ELEMENT_OBJECT, add_transaction_log_entry};
use crate::handler::{HandlerRegistry, InstallOutcome};
use crate::models::design::{rehydrate, to_xml};
use crate::models::{
    Dependency, DependencyFileType, DesignObject, ExportedFile, ObjectType, RowAction,
    parse_numeric_id,
};
use crate::services::archive::{read_text, require_file};
use crate::services::{ArchiveHandler, DesignStore};
use tracing::{debug, info};

/// Look a design object up by the numeric id carried in a dependency id
pub fn find_by_dependency_id<T: DesignObject>(
    store: &dyn DesignStore<T>,
    object_type: ObjectType,
    id: &str,
) -> DeployResult<Option<T>> {
    let id = parse_numeric_id(object_type, id)?;
    Ok(store.find(id)?)
}

/// The object behind a dependency being exported; absence is an error
pub fn load_for_export<T: DesignObject>(
    store: &dyn DesignStore<T>,
    dep: &Dependency,
) -> DeployResult<T> {
    find_by_dependency_id(store, dep.object_type, &dep.dependency_id)?
        .ok_or_else(|| DeployError::not_found(dep.object_type, &dep.dependency_id))
}

/// Service-generated XML file for a design object
pub fn service_xml_file<T: DesignObject>(object: &T) -> DeployResult<ExportedFile> {
    Ok(ExportedFile::new(
        DependencyFileType::ServiceGeneratedXml,
        to_xml(object)?,
    ))
}

/// Install a design object from its service-generated XML
pub fn install_design_object<T, F>(
    reg: &HandlerRegistry,
    store: &dyn DesignStore<T>,
    archive: &dyn ArchiveHandler,
    dep: &Dependency,
    ctx: &mut ImportCtx,
    transform: F,
) -> DeployResult<InstallOutcome>
where
    T: DesignObject,
    F: FnOnce(&mut T, &mut ImportCtx) -> DeployResult<InstallOutcome>,
{
    let file = require_file(archive, dep, DependencyFileType::ServiceGeneratedXml)?;
    let xml = read_text(archive, &file, DependencyFileType::ServiceGeneratedXml)?;
    let action = get_row_action(reg, ctx, dep)?;
    install_design_xml(reg, store, &xml, dep, ctx, action, transform)
}

/// Rehydrate, transform, save and log a design object
///
/// The object is rehydrated onto the target's current instance (or a fresh
/// one) and given its target id before `transform` rewrites its references.
/// `transform` may veto the install by returning [`InstallOutcome::Skipped`];
/// nothing is saved or logged in that case. `action` must be computed before
/// any other element of the dependency is logged.
pub fn install_design_xml<T, F>(
    reg: &HandlerRegistry,
    store: &dyn DesignStore<T>,
    xml: &str,
    dep: &Dependency,
    ctx: &mut ImportCtx,
    action: RowAction,
    transform: F,
) -> DeployResult<InstallOutcome>
where
    T: DesignObject,
    F: FnOnce(&mut T, &mut ImportCtx) -> DeployResult<InstallOutcome>,
{
    let target_id = numeric_target_id_for(reg, ctx, dep)?;
    let existing = store.find(target_id)?;
    debug!(
        "Installing {} {} as {} ({})",
        dep.object_type,
        dep.dependency_id,
        target_id,
        if existing.is_some() { "update" } else { "new" }
    );

    let mut object: T = rehydrate(existing, xml)?;
    object.set_id(target_id);

    if let InstallOutcome::Skipped(reason) = transform(&mut object, ctx)? {
        return Ok(InstallOutcome::Skipped(reason));
    }

    let saved = store.save(&object)?;
    info!("Installed {} '{}' ({})", dep.object_type, saved.name(), saved.id());

    add_transaction_log_entry(reg, ctx, dep, saved.name(), ELEMENT_OBJECT, action)?;
    Ok(InstallOutcome::Installed)
}
