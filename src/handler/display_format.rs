//! Display format handler

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::design_support::{
    find_by_dependency_id, install_design_object, load_for_export, service_xml_file,
};
use crate::handler::id_mapping::resolve_associations;
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome};
use crate::models::{Dependency, DisplayFormat, ExportedFile, ObjectType};
use crate::services::{ArchiveHandler, SecurityToken};

pub struct DisplayFormatHandler;

impl DependencyHandler for DisplayFormatHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::DisplayFormat
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let format = load_for_export(reg.services().display_formats.as_ref(), dep)?;
        let mut children = Vec::new();
        for id in &format.community_ids {
            if let Some(community) =
                reg.get_dependency(tok, ObjectType::Community, &id.to_string())?
            {
                children.push(community);
            }
        }
        Ok(children)
    }

    fn get_dependencies(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
    ) -> DeployResult<Vec<Dependency>> {
        reg.services()
            .display_formats
            .list()?
            .into_iter()
            .map(|f| reg.new_dependency(ObjectType::DisplayFormat, f.id.to_string(), f.name))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        find_by_dependency_id(
            reg.services().display_formats.as_ref(),
            ObjectType::DisplayFormat,
            id,
        )?
        .map(|f| reg.new_dependency(ObjectType::DisplayFormat, f.id.to_string(), f.name))
        .transpose()
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let format = load_for_export(reg.services().display_formats.as_ref(), dep)?;
        Ok(vec![service_xml_file(&format)?])
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
            reg.services().display_formats.as_ref(),
            archive,
            dep,
            ctx,
            |format: &mut DisplayFormat, ctx: &mut ImportCtx| {
                format.community_ids = resolve_associations(
                    reg,
                    tok,
                    ctx,
                    dep,
                    &[ObjectType::Community],
                    &format.community_ids,
                )?;
                Ok(InstallOutcome::Installed)
            },
        )
    }
}
