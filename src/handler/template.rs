//! Template and variant handler
//!
//! Templates and legacy variants share one repository and are told apart by
//! the `is_variant` flag. A template depends on the slots it contains and on
//! its global template.

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::design_support::{
    find_by_dependency_id, install_design_object, load_for_export, service_xml_file,
};
use crate::handler::id_mapping::{resolve_associations, resolve_numeric_association};
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome};
use crate::models::{Dependency, ExportedFile, ObjectType, Template};
use crate::services::{ArchiveHandler, SecurityToken};

/// Types a template reference may resolve as
pub const TEMPLATE_TYPES: [ObjectType; 2] = [ObjectType::Template, ObjectType::Variant];

pub struct TemplateHandler {
    object_type: ObjectType,
}

impl TemplateHandler {
    pub fn new(object_type: ObjectType) -> Self {
        Self { object_type }
    }

    fn is_variant(&self) -> bool {
        self.object_type == ObjectType::Variant
    }
}

/// Dependency for a template id, typed as template or variant by the stored
/// object; `None` when the target has no such template
pub fn template_dependency(reg: &HandlerRegistry, id: u64) -> DeployResult<Option<Dependency>> {
    let Some(template) = reg.services().templates.find(id)? else {
        return Ok(None);
    };
    let object_type = template_type(&template);
    Ok(Some(reg.new_dependency(
        object_type,
        template.id.to_string(),
        template.name,
    )?))
}

fn template_type(template: &Template) -> ObjectType {
    if template.is_variant {
        ObjectType::Variant
    } else {
        ObjectType::Template
    }
}

impl DependencyHandler for TemplateHandler {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let template = load_for_export(reg.services().templates.as_ref(), dep)?;
        let mut children = Vec::new();
        for slot_id in &template.slot_ids {
            if let Some(slot) = reg.get_dependency(tok, ObjectType::Slot, &slot_id.to_string())? {
                children.push(slot);
            }
        }
        if let Some(global_id) = template.global_template_id
            && global_id != template.id
            && let Some(global) = template_dependency(reg, global_id)?
        {
            children.push(global);
        }
        Ok(children)
    }

    fn get_dependencies(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
    ) -> DeployResult<Vec<Dependency>> {
        reg.services()
            .templates
            .list()?
            .into_iter()
            .filter(|t| t.is_variant == self.is_variant())
            .map(|t| reg.new_dependency(self.object_type, t.id.to_string(), t.name))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        find_by_dependency_id(reg.services().templates.as_ref(), self.object_type, id)?
            .filter(|t| t.is_variant == self.is_variant())
            .map(|t| reg.new_dependency(self.object_type, t.id.to_string(), t.name))
            .transpose()
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let template = load_for_export(reg.services().templates.as_ref(), dep)?;
        Ok(vec![service_xml_file(&template)?])
    }

    fn install_dependency_files(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        archive: &dyn ArchiveHandler,
        dep: &Dependency,
        ctx: &mut ImportCtx,
    ) -> DeployResult<InstallOutcome> {
        install_design_object(
            reg,
            reg.services().templates.as_ref(),
            archive,
            dep,
            ctx,
            |template: &mut Template, ctx: &mut ImportCtx| {
                template.is_variant = self.is_variant();
                template.slot_ids =
                    resolve_associations(reg, tok, ctx, dep, &[ObjectType::Slot], &template.slot_ids)?;
                if let Some(global_id) = template.global_template_id {
                    let resolved =
                        resolve_numeric_association(reg, tok, ctx, &TEMPLATE_TYPES, global_id)?;
                    if resolved.is_none() {
                        ctx.add_warning(format!(
                            "Dropped global template {} of {} '{}' which does not exist on the target",
                            global_id, dep.object_type, dep.display_name
                        ));
                    }
                    template.global_template_id = resolved.map(|(id, _)| id);
                }
                Ok(InstallOutcome::Installed)
            },
        )
    }
}
