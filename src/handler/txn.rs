//! Transaction log entries for installed elements

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::HandlerRegistry;
use crate::handler::id_mapping;
use crate::models::{Dependency, RowAction};
use crate::services::TxnLogEntry;
use chrono::Utc;
use tracing::debug;

/// Element type recorded for relational tables
pub const ELEMENT_TABLE: &str = "TABLE";
/// Element type recorded for files in the object store
pub const ELEMENT_FILE: &str = "FILE";
/// Element type recorded for design objects and applications
pub const ELEMENT_OBJECT: &str = "OBJECT";

/// Log an installed element of a dependency
///
/// The target id is the dependency's mapped id (its own id without an id
/// map). The dependency's new-object flag is cleared afterwards, so log every
/// element of one dependency with an action computed before the first call.
pub fn add_transaction_log_entry(
    reg: &HandlerRegistry,
    ctx: &mut ImportCtx,
    dep: &Dependency,
    element_name: &str,
    element_type: &str,
    action: RowAction,
) -> DeployResult<()> {
    let target_id = id_mapping::target_id_for(reg, ctx, dep)?;
    add_transaction_log_entry_by_guid(ctx, dep, &target_id, element_name, element_type, action)?;
    id_mapping::mark_installed(reg, ctx, dep)
}

/// Log an installed element with an explicit target id
pub fn add_transaction_log_entry_by_guid(
    ctx: &mut ImportCtx,
    dep: &Dependency,
    target_id: &str,
    element_name: &str,
    element_type: &str,
    action: RowAction,
) -> DeployResult<()> {
    let entry = TxnLogEntry {
        run_id: ctx.run_id(),
        sequence: ctx.next_sequence(),
        dependency_key: dep.key(),
        dependency_name: dep.display_name.clone(),
        object_type: dep.object_type,
        element_id: target_id.to_string(),
        element_name: element_name.to_string(),
        element_type: element_type.to_string(),
        action,
        logged_at: Utc::now(),
    };
    debug!(
        "{} {} {} ({})",
        action, element_type, element_name, entry.dependency_key
    );
    ctx.log().add_entry(entry)?;
    Ok(())
}
