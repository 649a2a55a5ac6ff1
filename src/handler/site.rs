//! Site handler
//!
//! Sites reference the templates they publish, their publishing contexts and
//! the folder tree they are rooted at. They are installed after everything
//! else so those references can be resolved.

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::design_support::{
    find_by_dependency_id, install_design_object, load_for_export, service_xml_file,
};
use crate::handler::id_mapping::resolve_associations;
use crate::handler::template::{TEMPLATE_TYPES, template_dependency};
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome, dedup_dependencies};
use crate::models::{Dependency, ExportedFile, ObjectType, Site};
use crate::services::{ArchiveHandler, SecurityToken};

pub struct SiteHandler;

impl DependencyHandler for SiteHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::Site
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let site = load_for_export(reg.services().sites.as_ref(), dep)?;
        let mut children = Vec::new();
        for &template_id in &site.template_ids {
            if let Some(template) = template_dependency(reg, template_id)? {
                children.push(template);
            }
        }
        for context_id in &site.context_ids {
            if let Some(context) =
                reg.get_dependency(tok, ObjectType::Context, &context_id.to_string())?
            {
                children.push(context);
            }
        }
        if let Some(root) = site.folder_root.as_deref().filter(|r| !r.trim().is_empty())
            && let Some(folder) = reg.get_dependency(tok, ObjectType::Folder, root)?
        {
            children.push(folder);
        }
        Ok(dedup_dependencies(children))
    }

    fn get_dependencies(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
    ) -> DeployResult<Vec<Dependency>> {
        reg.services()
            .sites
            .list()?
            .into_iter()
            .map(|s| reg.new_dependency(ObjectType::Site, s.id.to_string(), s.name))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        find_by_dependency_id(reg.services().sites.as_ref(), ObjectType::Site, id)?
            .map(|s| reg.new_dependency(ObjectType::Site, s.id.to_string(), s.name))
            .transpose()
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let site = load_for_export(reg.services().sites.as_ref(), dep)?;
        Ok(vec![service_xml_file(&site)?])
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
            reg.services().sites.as_ref(),
            archive,
            dep,
            ctx,
            |site: &mut Site, ctx: &mut ImportCtx| {
                site.template_ids =
                    resolve_associations(reg, tok, ctx, dep, &TEMPLATE_TYPES, &site.template_ids)?;
                site.context_ids = resolve_associations(
                    reg,
                    tok,
                    ctx,
                    dep,
                    &[ObjectType::Context],
                    &site.context_ids,
                )?;
                Ok(InstallOutcome::Installed)
            },
        )
    }

    fn should_defer_installation(&self) -> bool {
        true
    }
}
