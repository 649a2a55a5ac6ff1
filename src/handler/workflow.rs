//! Workflow handler
//!
//! A workflow is stored across eight relational tables, all keyed by
//! `WORKFLOWAPPID`. It travels as one `DBMS_DATA` file per non-empty table.
//!
//! Install replaces the workflow's child rows wholesale. Every id column is
//! rewritten first: workflow, state and transition ids go through the id map
//! and must be mapped when one is active; role and notification ids have no
//! allocator and are handed out from in-memory blocks scoped to the target
//! workflow. Only then are the rows of every table except `WORKFLOWAPPS`
//! deleted for the target workflow id and the incoming rows upserted.

use crate::context::ImportCtx;
use crate::error::{DeployError, DeployResult};
use crate::handler::id_mapping::{get_row_action, mark_installed, target_id_for, transform_id};
use crate::handler::table_transfer::{BlockContext, IdBlock, reserve_block, rewrite_column};
use crate::handler::txn::{ELEMENT_TABLE, add_transaction_log_entry_by_guid};
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome};
use crate::models::{
    ColumnDef, Dependency, DependencyData, DependencyFileType, ExportedFile, ObjectType,
    PairDependencyId, Row, SelectFilter, TableSchema, parse_numeric_id,
};
use crate::services::archive::{get_files_by_type, read_text};
use crate::services::{ArchiveHandler, SecurityToken};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use tracing::{debug, info};

pub const WORKFLOW_TABLE: &str = "WORKFLOWAPPS";
pub const STATES_TABLE: &str = "STATES";
pub const TRANSITIONS_TABLE: &str = "TRANSITIONS";
pub const ROLES_TABLE: &str = "ROLES";
pub const NOTIFICATIONS_TABLE: &str = "NOTIFICATIONS";
pub const STATE_ROLES_TABLE: &str = "STATEROLES";
pub const TRANSITION_ROLES_TABLE: &str = "TRANSITIONROLES";
pub const TRANSITION_NOTIFICATIONS_TABLE: &str = "TRANSITIONNOTIFICATIONS";

/// Every workflow table, parent tables first
pub const WORKFLOW_TABLES: [&str; 8] = [
    WORKFLOW_TABLE,
    STATES_TABLE,
    TRANSITIONS_TABLE,
    ROLES_TABLE,
    NOTIFICATIONS_TABLE,
    STATE_ROLES_TABLE,
    TRANSITION_ROLES_TABLE,
    TRANSITION_NOTIFICATIONS_TABLE,
];

pub const WORKFLOW_ID: &str = "WORKFLOWAPPID";
pub const WORKFLOW_NAME: &str = "WORKFLOWAPPNAME";
pub const STATE_ID: &str = "STATEID";
pub const STATE_NAME: &str = "STATENAME";
pub const TRANSITION_ID: &str = "TRANSITIONID";
pub const TRANSITION_LABEL: &str = "TRANSITIONLABEL";
pub const ROLE_ID: &str = "ROLEID";
pub const ROLE_NAME: &str = "ROLENAME";
pub const NOTIFICATION_ID: &str = "NOTIFICATIONID";

/// Columns holding a state id, per table
const STATE_COLUMNS: [(&str, &str); 5] = [
    (WORKFLOW_TABLE, "INITIALSTATEID"),
    (STATES_TABLE, STATE_ID),
    (TRANSITIONS_TABLE, "TRANSITIONFROMSTATEID"),
    (TRANSITIONS_TABLE, "TRANSITIONTOSTATEID"),
    (STATE_ROLES_TABLE, STATE_ID),
];

/// Columns holding a transition id, per table
const TRANSITION_COLUMNS: [(&str, &str); 3] = [
    (TRANSITIONS_TABLE, TRANSITION_ID),
    (TRANSITION_ROLES_TABLE, TRANSITION_ID),
    (TRANSITION_NOTIFICATIONS_TABLE, TRANSITION_ID),
];

/// Columns holding a role id, per table
const ROLE_COLUMNS: [(&str, &str); 3] = [
    (ROLES_TABLE, ROLE_ID),
    (STATE_ROLES_TABLE, ROLE_ID),
    (TRANSITION_ROLES_TABLE, "TRANSITIONROLEID"),
];

/// Columns holding a notification id, per table
const NOTIFICATION_COLUMNS: [(&str, &str); 2] = [
    (NOTIFICATIONS_TABLE, NOTIFICATION_ID),
    (TRANSITION_NOTIFICATIONS_TABLE, NOTIFICATION_ID),
];

/// Built-in definitions of the workflow tables
pub fn builtin_schemas() -> Vec<TableSchema> {
    let int = |name: &str| ColumnDef::new(name, "INTEGER").not_null();
    let text = |name: &str| ColumnDef::new(name, "VARCHAR");
    vec![
        TableSchema::new(
            WORKFLOW_TABLE,
            vec![int(WORKFLOW_ID), text(WORKFLOW_NAME), ColumnDef::new("INITIALSTATEID", "INTEGER")],
            &[WORKFLOW_ID],
        ),
        TableSchema::new(
            STATES_TABLE,
            vec![int(WORKFLOW_ID), int(STATE_ID), text(STATE_NAME)],
            &[WORKFLOW_ID, STATE_ID],
        ),
        TableSchema::new(
            TRANSITIONS_TABLE,
            vec![
                int(WORKFLOW_ID),
                int(TRANSITION_ID),
                text(TRANSITION_LABEL),
                int("TRANSITIONFROMSTATEID"),
                int("TRANSITIONTOSTATEID"),
            ],
            &[WORKFLOW_ID, TRANSITION_ID],
        ),
        TableSchema::new(
            ROLES_TABLE,
            vec![int(WORKFLOW_ID), int(ROLE_ID), text(ROLE_NAME)],
            &[WORKFLOW_ID, ROLE_ID],
        ),
        TableSchema::new(
            NOTIFICATIONS_TABLE,
            vec![int(WORKFLOW_ID), int(NOTIFICATION_ID), text("SUBJECT")],
            &[WORKFLOW_ID, NOTIFICATION_ID],
        ),
        TableSchema::new(
            STATE_ROLES_TABLE,
            vec![int(WORKFLOW_ID), int(STATE_ID), int(ROLE_ID), text("ASSIGNMENTTYPE")],
            &[WORKFLOW_ID, STATE_ID, ROLE_ID],
        ),
        TableSchema::new(
            TRANSITION_ROLES_TABLE,
            vec![int(WORKFLOW_ID), int(TRANSITION_ID), int("TRANSITIONROLEID")],
            &[WORKFLOW_ID, TRANSITION_ID, "TRANSITIONROLEID"],
        ),
        TableSchema::new(
            TRANSITION_NOTIFICATIONS_TABLE,
            vec![int(WORKFLOW_ID), int(TRANSITION_ID), int(NOTIFICATION_ID)],
            &[WORKFLOW_ID, TRANSITION_ID, NOTIFICATION_ID],
        ),
    ]
}

fn workflow_filter(workflow_id: &str) -> SelectFilter {
    SelectFilter::equals(WORKFLOW_ID, workflow_id)
}

pub struct WorkflowHandler {
    /// Table schemas as the target reports them, loaded once
    schemas: OnceCell<HashMap<String, TableSchema>>,
}

impl Default for WorkflowHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowHandler {
    pub fn new() -> Self {
        Self {
            schemas: OnceCell::new(),
        }
    }

    fn schemas(&self, reg: &HandlerRegistry) -> DeployResult<&HashMap<String, TableSchema>> {
        self.schemas.get_or_try_init(|| {
            let mut schemas = HashMap::new();
            for builtin in builtin_schemas() {
                let schema = reg
                    .services()
                    .relational
                    .table_schema(&builtin.name)?
                    .unwrap_or(builtin);
                schemas.insert(schema.name.clone(), schema);
            }
            debug!("Loaded {} workflow table schemas", schemas.len());
            Ok::<_, DeployError>(schemas)
        })
    }

    fn schema(&self, reg: &HandlerRegistry, table: &str) -> DeployResult<TableSchema> {
        self.schemas(reg)?
            .get(table)
            .cloned()
            .ok_or_else(|| DeployError::InvalidArgument(format!("{} is not a workflow table", table)))
    }

    fn workflow_row(&self, reg: &HandlerRegistry, id: &str) -> DeployResult<Option<Row>> {
        Ok(reg
            .services()
            .relational
            .select(WORKFLOW_TABLE, Some(&workflow_filter(id)))?
            .into_iter()
            .next())
    }

    fn to_dependency(&self, reg: &HandlerRegistry, row: &Row) -> DeployResult<Option<Dependency>> {
        let Some(id) = row.get(WORKFLOW_ID) else {
            return Ok(None);
        };
        let name = row.get(WORKFLOW_NAME).cloned().unwrap_or_else(|| id.clone());
        Ok(Some(reg.new_dependency(ObjectType::Workflow, id.clone(), name)?))
    }

    /// State or transition children of a workflow
    fn element_children(
        &self,
        reg: &HandlerRegistry,
        dep: &Dependency,
        object_type: ObjectType,
        out: &mut Vec<Dependency>,
    ) -> DeployResult<()> {
        let (table, id_column, name_column) = element_columns(object_type)?;
        let rows = reg
            .services()
            .relational
            .select(table, Some(&workflow_filter(&dep.dependency_id)))?;
        for row in rows {
            let Some(child_id) = row.get(id_column) else {
                continue;
            };
            let pair = PairDependencyId::new(dep.dependency_id.clone(), child_id.clone())?;
            let name = row.get(name_column).cloned().unwrap_or_else(|| child_id.clone());
            out.push(reg.new_child_dependency(object_type, dep, pair.format(), name)?);
        }
        Ok(())
    }
}

/// Table, id column and name column of a workflow element type
pub fn element_columns(
    object_type: ObjectType,
) -> DeployResult<(&'static str, &'static str, &'static str)> {
    match object_type {
        ObjectType::WorkflowState => Ok((STATES_TABLE, STATE_ID, STATE_NAME)),
        ObjectType::WorkflowTransition => Ok((TRANSITIONS_TABLE, TRANSITION_ID, TRANSITION_LABEL)),
        other => Err(DeployError::InvalidArgument(format!(
            "{} is not a workflow element type",
            other
        ))),
    }
}

/// Target id of a state or transition referenced by a workflow row; blank
/// references stay as they are
fn element_target(
    reg: &HandlerRegistry,
    ctx: &ImportCtx,
    object_type: ObjectType,
    source_id: &str,
    parent: Option<(&str, ObjectType)>,
) -> DeployResult<Option<String>> {
    if source_id.trim().is_empty() {
        return Ok(None);
    }
    transform_id(reg, ctx, object_type, source_id.trim(), parent).map(Some)
}

/// Tables of an incoming workflow, keyed by table name
struct WorkflowTables {
    tables: HashMap<String, DependencyData>,
}

impl WorkflowTables {
    fn read(archive: &dyn ArchiveHandler, dep: &Dependency) -> DeployResult<Self> {
        let mut tables = HashMap::new();
        for file in get_files_by_type(archive, dep, DependencyFileType::DbmsData)? {
            let json = read_text(archive, &file, DependencyFileType::DbmsData)?;
            let data: DependencyData = serde_json::from_str(&json)?;
            if !WORKFLOW_TABLES.contains(&data.table_name()) {
                return Err(DeployError::InvalidArgument(format!(
                    "{} is not a workflow table",
                    data.table_name()
                )));
            }
            tables.insert(data.table_name().to_string(), data);
        }
        if !tables.contains_key(WORKFLOW_TABLE) {
            return Err(DeployError::MissingFileType {
                dependency: dep.key(),
                file_type: DependencyFileType::DbmsData,
            });
        }
        Ok(Self { tables })
    }

    fn get(&self, table: &str) -> Option<&DependencyData> {
        self.tables.get(table)
    }

    fn rows_mut(&mut self, table: &str) -> Option<&mut [Row]> {
        self.tables.get_mut(table).map(|d| d.rows.as_mut_slice())
    }

    /// Fresh ids within the target workflow for every distinct value of a
    /// column in its owning table
    fn reserve(
        &self,
        reg: &HandlerRegistry,
        ctx: &mut ImportCtx,
        table: &str,
        column: &str,
        workflow_id: &str,
    ) -> DeployResult<IdBlock> {
        let sources: Vec<&DependencyData> = self.get(table).into_iter().collect();
        let scope = Some(BlockContext::new(WORKFLOW_ID, workflow_id));
        let block = reserve_block(reg, ctx, table, column, scope, &sources, &[column])?;
        debug!("Reserved {} ids for {}.{}", block.len(), table, column);
        Ok(block)
    }

    fn remap_block(&mut self, columns: &[(&str, &str)], block: &IdBlock) -> DeployResult<()> {
        for &(table, column) in columns {
            if let Some(rows) = self.rows_mut(table) {
                rewrite_column(rows, column, |v| Ok(block.get(v).map(str::to_string)))?;
            }
        }
        Ok(())
    }
}

impl DependencyHandler for WorkflowHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::Workflow
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let mut children = Vec::new();
        self.element_children(reg, dep, ObjectType::WorkflowState, &mut children)?;
        self.element_children(reg, dep, ObjectType::WorkflowTransition, &mut children)?;
        Ok(children)
    }

    fn get_dependencies(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
    ) -> DeployResult<Vec<Dependency>> {
        let mut deps = Vec::new();
        for row in reg.services().relational.select(WORKFLOW_TABLE, None)? {
            if let Some(dep) = self.to_dependency(reg, &row)? {
                deps.push(dep);
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
        parse_numeric_id(ObjectType::Workflow, id)?;
        match self.workflow_row(reg, id.trim())? {
            Some(row) => self.to_dependency(reg, &row),
            None => Ok(None),
        }
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let filter = workflow_filter(&dep.dependency_id);
        let mut files = Vec::new();
        for table in WORKFLOW_TABLES {
            let rows = reg.services().relational.select(table, Some(&filter))?;
            if rows.is_empty() {
                continue;
            }
            let data = DependencyData::new(self.schema(reg, table)?, rows);
            files.push(
                ExportedFile::new(DependencyFileType::DbmsData, serde_json::to_vec_pretty(&data)?)
                    .with_original_path(table),
            );
        }
        if files.is_empty() {
            return Err(DeployError::not_found(ObjectType::Workflow, &dep.dependency_id));
        }
        Ok(files)
    }

    fn install_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        archive: &dyn ArchiveHandler,
        dep: &Dependency,
        ctx: &mut ImportCtx,
    ) -> DeployResult<InstallOutcome> {
        let mut tables = WorkflowTables::read(archive, dep)?;
        let action = get_row_action(reg, ctx, dep)?;
        let source_id = dep.dependency_id.clone();
        let target_id = target_id_for(reg, ctx, dep)?;
        let relational = &reg.services().relational;

        let roles = tables.reserve(reg, ctx, ROLES_TABLE, ROLE_ID, &target_id)?;
        let notifications =
            tables.reserve(reg, ctx, NOTIFICATIONS_TABLE, NOTIFICATION_ID, &target_id)?;

        let parent = Some((source_id.as_str(), ObjectType::Workflow));
        for table in WORKFLOW_TABLES {
            if let Some(rows) = tables.rows_mut(table) {
                rewrite_column(rows, WORKFLOW_ID, |_| Ok(Some(target_id.clone())))?;
            }
        }
        for (table, column) in STATE_COLUMNS {
            if let Some(rows) = tables.rows_mut(table) {
                rewrite_column(rows, column, |v| {
                    element_target(reg, ctx, ObjectType::WorkflowState, v, parent)
                })?;
            }
        }
        for (table, column) in TRANSITION_COLUMNS {
            if let Some(rows) = tables.rows_mut(table) {
                rewrite_column(rows, column, |v| {
                    element_target(reg, ctx, ObjectType::WorkflowTransition, v, parent)
                })?;
            }
        }
        tables.remap_block(&ROLE_COLUMNS, &roles)?;
        tables.remap_block(&NOTIFICATION_COLUMNS, &notifications)?;

        let filter = workflow_filter(&target_id);
        for table in WORKFLOW_TABLES.iter().skip(1) {
            let deleted = relational.delete_rows(table, &filter)?;
            if deleted > 0 {
                debug!("Deleted {} rows from {} for workflow {}", deleted, table, target_id);
            }
        }

        for table in WORKFLOW_TABLES {
            let Some(data) = tables.get(table) else {
                continue;
            };
            if data.is_empty() {
                continue;
            }
            let written = relational.process_table(data)?;
            debug!("Wrote {} rows to {}", written, table);
            add_transaction_log_entry_by_guid(ctx, dep, &target_id, table, ELEMENT_TABLE, action)?;
        }
        mark_installed(reg, ctx, dep)?;

        if let Some(data) = tables.get(ROLES_TABLE) {
            for row in &data.rows {
                let Some(name) = row.get(ROLE_NAME).filter(|n| !n.trim().is_empty()) else {
                    continue;
                };
                if !reg.services().roles.role_exists(name)? {
                    reg.services().roles.create_role(name)?;
                    info!("Created role '{}' for workflow {}", name, dep.display_name);
                }
            }
        }

        info!("Installed workflow '{}' as {}", dep.display_name, target_id);
        Ok(InstallOutcome::Installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_schemas_cover_every_table() {
        let schemas = builtin_schemas();
        assert_eq!(schemas.len(), WORKFLOW_TABLES.len());
        for table in WORKFLOW_TABLES {
            let schema = schemas.iter().find(|s| s.name == table).unwrap();
            assert!(schema.column(WORKFLOW_ID).is_some(), "{} lacks {}", table, WORKFLOW_ID);
            assert!(!schema.primary_key.is_empty());
        }
    }

    #[test]
    fn remapped_columns_exist_in_their_tables() {
        let schemas = builtin_schemas();
        let all = STATE_COLUMNS
            .iter()
            .chain(TRANSITION_COLUMNS.iter())
            .chain(ROLE_COLUMNS.iter())
            .chain(NOTIFICATION_COLUMNS.iter());
        for (table, column) in all {
            let schema = schemas.iter().find(|s| s.name == *table).unwrap();
            assert!(schema.column(column).is_some(), "{}.{}", table, column);
        }
    }
}
