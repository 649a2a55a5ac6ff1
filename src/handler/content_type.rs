//! Content type handler
//!
//! A content type ties together its content editor application, the
//! workflows it may enter, its shared field groups, an icon, an ACL and the
//! templates that render it. Its definition travels as a `NODE_DEFINITION`
//! file and its backing table, when it has local fields, as a `DBMS_SCHEMA`
//! file.

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::app_support::normalize_path;
use crate::handler::design_support::{find_by_dependency_id, install_design_xml, load_for_export};
use crate::handler::id_mapping::{
    action_for_existence, get_row_action, resolve_associations, resolve_numeric_association,
    target_id_for,
};
use crate::handler::template::{TEMPLATE_TYPES, template_dependency};
use crate::handler::txn::{ELEMENT_TABLE, add_transaction_log_entry_by_guid};
use crate::handler::workflow::{WORKFLOW_ID, WORKFLOW_NAME, WORKFLOW_TABLE};
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome, dedup_dependencies};
use crate::models::design::to_xml;
use crate::models::{
    ContentType, Dependency, DependencyFileType, ExportedFile, ObjectType, SelectFilter,
    TableSchema, parse_numeric_id,
};
use crate::services::archive::{get_files_by_type, read_text, require_file};
use crate::services::{ArchiveHandler, SecurityToken};
use tracing::debug;

pub struct ContentTypeHandler;

impl ContentTypeHandler {
    /// Merge the incoming backing table into the target's, never dropping a
    /// column
    fn install_schema(
        &self,
        reg: &HandlerRegistry,
        archive: &dyn ArchiveHandler,
        dep: &Dependency,
        ctx: &mut ImportCtx,
    ) -> DeployResult<()> {
        let files = get_files_by_type(archive, dep, DependencyFileType::DbmsSchema)?;
        if files.is_empty() {
            return Ok(());
        }
        let target_id = target_id_for(reg, ctx, dep)?;
        let relational = &reg.services().relational;
        for file in files {
            let incoming: TableSchema =
                serde_json::from_str(&read_text(archive, &file, DependencyFileType::DbmsSchema)?)?;
            let existing = relational.table_schema(&incoming.name)?;
            let action = action_for_existence(existing.is_some());
            let merged = match existing {
                Some(current) => current.merge(&incoming),
                None => incoming,
            };
            relational.alter_table(&merged)?;
            debug!("Applied schema of {} ({} columns)", merged.name, merged.columns.len());
            add_transaction_log_entry_by_guid(
                ctx,
                dep,
                &target_id,
                &merged.name,
                ELEMENT_TABLE,
                action,
            )?;
        }
        Ok(())
    }
}

/// Resolve allowed and default workflows, falling back when the default does
/// not resolve: first allowed workflow, then the target's global default
/// workflow, else the content type is disabled
fn resolve_workflows(
    reg: &HandlerRegistry,
    tok: &SecurityToken,
    ctx: &mut ImportCtx,
    dep: &Dependency,
    content_type: &mut ContentType,
) -> DeployResult<()> {
    let mut allowed = resolve_associations(
        reg,
        tok,
        ctx,
        dep,
        &[ObjectType::Workflow],
        &content_type.workflow_ids,
    )?;

    let mut default = match content_type.default_workflow_id {
        Some(id) => resolve_numeric_association(reg, tok, ctx, &[ObjectType::Workflow], id)?
            .map(|(target, _)| target),
        None => None,
    };
    if default.is_none() {
        default = allowed.first().copied();
    }
    if default.is_none() {
        default = global_default_workflow(reg)?;
    }

    match default {
        Some(id) => {
            if !allowed.contains(&id) {
                allowed.push(id);
            }
            content_type.default_workflow_id = Some(id);
        }
        None => {
            content_type.default_workflow_id = None;
            content_type.enabled = false;
            ctx.add_warning(format!(
                "Content type '{}' has no workflow on the target and was disabled",
                content_type.name
            ));
        }
    }
    content_type.workflow_ids = allowed;
    Ok(())
}

/// Target workflow named by the configured default workflow
fn global_default_workflow(reg: &HandlerRegistry) -> DeployResult<Option<u64>> {
    let name = &reg.config().defaults.workflow;
    let filter = SelectFilter::equals(WORKFLOW_NAME, name.as_str());
    let rows = reg.services().relational.select(WORKFLOW_TABLE, Some(&filter))?;
    match rows.first().and_then(|row| row.get(WORKFLOW_ID)) {
        Some(id) => Ok(Some(parse_numeric_id(ObjectType::Workflow, id)?)),
        None => {
            debug!("Default workflow '{}' does not exist on the target", name);
            Ok(None)
        }
    }
}

impl DependencyHandler for ContentTypeHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::ContentType
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let content_type = load_for_export(reg.services().content_types.as_ref(), dep)?;
        let mut children = Vec::new();

        if let Some(mut editor) =
            reg.get_dependency(tok, ObjectType::ContentEditor, &content_type.editor_app)?
        {
            editor.set_parent(dep.dependency_id.clone(), ObjectType::ContentType);
            children.push(editor);
        }

        let workflows = content_type
            .default_workflow_id
            .iter()
            .chain(content_type.workflow_ids.iter());
        for id in workflows {
            if let Some(workflow) = reg.get_dependency(tok, ObjectType::Workflow, &id.to_string())? {
                children.push(workflow);
            }
        }

        for group in &content_type.shared_groups {
            if let Some(shared) = reg.get_dependency(tok, ObjectType::SharedGroup, group)? {
                children.push(shared);
            }
        }

        if let Some(icon) = content_type.icon_path.as_deref()
            && let Some(path) = normalize_path(icon, &reg.config().paths.server_root)
            && path.contains('/')
            && let Some(file) = reg.get_dependency(tok, ObjectType::SupportFile, &path)?
        {
            children.push(file);
        }

        if let Some(acl_id) = content_type.acl_id
            && let Some(acl) = reg.get_dependency(tok, ObjectType::Acl, &acl_id.to_string())?
        {
            children.push(acl);
        }

        for &template_id in &content_type.template_ids {
            if let Some(template) = template_dependency(reg, template_id)? {
                children.push(template);
            }
        }

        Ok(dedup_dependencies(children))
    }

    fn get_dependencies(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
    ) -> DeployResult<Vec<Dependency>> {
        reg.services()
            .content_types
            .list()?
            .into_iter()
            .map(|ct| reg.new_dependency(ObjectType::ContentType, ct.id.to_string(), ct.name))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        find_by_dependency_id(
            reg.services().content_types.as_ref(),
            ObjectType::ContentType,
            id,
        )?
        .map(|ct| reg.new_dependency(ObjectType::ContentType, ct.id.to_string(), ct.name))
        .transpose()
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let content_type = load_for_export(reg.services().content_types.as_ref(), dep)?;
        let mut files = vec![ExportedFile::new(
            DependencyFileType::NodeDefinition,
            to_xml(&content_type)?,
        )];
        if let Some(table) = content_type.table_name.as_deref()
            && let Some(schema) = reg.services().relational.table_schema(table)?
        {
            files.push(
                ExportedFile::new(
                    DependencyFileType::DbmsSchema,
                    serde_json::to_vec_pretty(&schema)?,
                )
                .with_original_path(table),
            );
        }
        Ok(files)
    }

    fn install_dependency_files(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        archive: &dyn ArchiveHandler,
        dep: &Dependency,
        ctx: &mut ImportCtx,
    ) -> DeployResult<InstallOutcome> {
        let file = require_file(archive, dep, DependencyFileType::NodeDefinition)?;
        let xml = read_text(archive, &file, DependencyFileType::NodeDefinition)?;
        let action = get_row_action(reg, ctx, dep)?;

        self.install_schema(reg, archive, dep, ctx)?;

        install_design_xml(
            reg,
            reg.services().content_types.as_ref(),
            &xml,
            dep,
            ctx,
            action,
            |content_type: &mut ContentType, ctx: &mut ImportCtx| {
                resolve_workflows(reg, tok, ctx, dep, content_type)?;
                content_type.template_ids = resolve_associations(
                    reg,
                    tok,
                    ctx,
                    dep,
                    &TEMPLATE_TYPES,
                    &content_type.template_ids,
                )?;
                if let Some(acl_id) = content_type.acl_id {
                    let resolved =
                        resolve_numeric_association(reg, tok, ctx, &[ObjectType::Acl], acl_id)?;
                    if resolved.is_none() {
                        ctx.add_warning(format!(
                            "Dropped ACL {} of content type '{}' which does not exist on the target",
                            acl_id, content_type.name
                        ));
                    }
                    content_type.acl_id = resolved.map(|(id, _)| id);
                }
                let mut groups = Vec::with_capacity(content_type.shared_groups.len());
                for group in &content_type.shared_groups {
                    if reg
                        .handler(ObjectType::SharedGroup)?
                        .does_dependency_exist(reg, tok, group)?
                    {
                        groups.push(group.clone());
                    } else {
                        ctx.add_warning(format!(
                            "Dropped shared group '{}' of content type '{}' which does not exist on the target",
                            group, content_type.name
                        ));
                    }
                }
                content_type.shared_groups = groups;
                Ok(InstallOutcome::Installed)
            },
        )
    }

    fn should_defer_installation(&self) -> bool {
        true
    }
}
