//! Slot handler
//!
//! A slot's allowed content is a list of content type/template pairs. Both
//! sides become child dependencies, and on install a pair survives only when
//! both sides resolve on the target.

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::design_support::{
    find_by_dependency_id, install_design_object, load_for_export, service_xml_file,
};
use crate::handler::id_mapping::resolve_numeric_association;
use crate::handler::template::{TEMPLATE_TYPES, template_dependency};
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome, dedup_dependencies};
use crate::models::{Dependency, ExportedFile, ObjectType, Slot, SlotAssociation};
use crate::services::{ArchiveHandler, SecurityToken};

pub struct SlotHandler;

impl DependencyHandler for SlotHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::Slot
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let slot = load_for_export(reg.services().slots.as_ref(), dep)?;
        let mut children = Vec::new();
        for association in &slot.associations {
            if let Some(ct) = reg.get_dependency(
                tok,
                ObjectType::ContentType,
                &association.content_type_id.to_string(),
            )? {
                children.push(ct);
            }
            if let Some(template) = template_dependency(reg, association.template_id)? {
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
            .slots
            .list()?
            .into_iter()
            .map(|s| reg.new_dependency(ObjectType::Slot, s.id.to_string(), s.name))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        find_by_dependency_id(reg.services().slots.as_ref(), ObjectType::Slot, id)?
            .map(|s| reg.new_dependency(ObjectType::Slot, s.id.to_string(), s.name))
            .transpose()
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let slot = load_for_export(reg.services().slots.as_ref(), dep)?;
        Ok(vec![service_xml_file(&slot)?])
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
            reg.services().slots.as_ref(),
            archive,
            dep,
            ctx,
            |slot: &mut Slot, ctx: &mut ImportCtx| {
                let mut kept = Vec::with_capacity(slot.associations.len());
                for association in &slot.associations {
                    let content_type = resolve_numeric_association(
                        reg,
                        tok,
                        ctx,
                        &[ObjectType::ContentType],
                        association.content_type_id,
                    )?;
                    let template = resolve_numeric_association(
                        reg,
                        tok,
                        ctx,
                        &TEMPLATE_TYPES,
                        association.template_id,
                    )?;
                    match (content_type, template) {
                        (Some((content_type_id, _)), Some((template_id, _))) => {
                            kept.push(SlotAssociation {
                                content_type_id,
                                template_id,
                            })
                        }
                        _ => ctx.add_warning(format!(
                            "Dropped association of content type {} and template {} from slot '{}'",
                            association.content_type_id, association.template_id, dep.display_name
                        )),
                    }
                }
                slot.associations = kept;
                Ok(InstallOutcome::Installed)
            },
        )
    }
}
