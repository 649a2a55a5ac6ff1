//! Search and view handler
//!
//! Searches and views share a repository and differ by the `is_view` flag.
//! Each needs a display format on the target. A display format mapped in the
//! id map resolves to its target id whether or not it is installed yet; an
//! unmapped one resolves to itself when the target has it. Otherwise the
//! install falls back to a display format of the same name, then the
//! configured default, then the first one the target has; with no display
//! format at all the install is skipped.

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::design_support::{
    find_by_dependency_id, install_design_object, load_for_export, service_xml_file,
};
use crate::handler::id_mapping::{reference_key, resolve_associations, transform_optional};
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome, dedup_dependencies};
use crate::models::{Dependency, ExportedFile, IdMapping, ObjectType, Search, parse_numeric_id};
use crate::services::{ArchiveHandler, SecurityToken};
use tracing::debug;

pub struct SearchHandler {
    object_type: ObjectType,
}

impl SearchHandler {
    pub fn new(object_type: ObjectType) -> Self {
        Self { object_type }
    }

    fn is_view(&self) -> bool {
        self.object_type == ObjectType::View
    }
}

/// Target id and name of a search's display format
#[derive(Debug, Clone, PartialEq, Eq)]
struct FormatRef {
    id: u64,
    name: String,
}

/// Target display format for a search, by precedence
fn resolve_display_format(
    reg: &HandlerRegistry,
    ctx: &mut ImportCtx,
    search: &Search,
) -> DeployResult<Option<FormatRef>> {
    let store = &reg.services().display_formats;

    if let Some(id) = search.display_format_id {
        let source = id.to_string();
        if ctx.id_map().is_some()
            && let Some(target) =
                transform_optional(reg, ctx, ObjectType::DisplayFormat, &source, None)?
        {
            let target_id = parse_numeric_id(ObjectType::DisplayFormat, &target)?;
            let key = reference_key(reg, ObjectType::DisplayFormat, &source, None)?;
            let mapped_name = ctx
                .id_map()
                .and_then(|map| map.get_mapping(&key))
                .and_then(IdMapping::target_name)
                .map(str::to_string);
            let name = match mapped_name {
                Some(name) => name,
                None => match store.find(target_id)? {
                    Some(format) => format.name,
                    None => search.display_format_name.clone().unwrap_or_default(),
                },
            };
            return Ok(Some(FormatRef { id: target_id, name }));
        }
        if let Some(format) = store.find(id)? {
            return Ok(Some(FormatRef {
                id: format.id,
                name: format.name,
            }));
        }
    }

    if let Some(name) = search.display_format_name.as_deref()
        && let Some(format) = store.find_by_name(name)?
    {
        debug!("Display format of '{}' matched by name '{}'", search.name, name);
        return Ok(Some(FormatRef {
            id: format.id,
            name: format.name,
        }));
    }

    let default_name = &reg.config().defaults.display_format;
    let fallback = match store.find_by_name(default_name)? {
        Some(format) => Some(format),
        None => store.list()?.into_iter().next(),
    };
    if let Some(format) = &fallback {
        ctx.add_warning(format!(
            "Search '{}' uses display format '{}' because its own does not exist on the target",
            search.name, format.name
        ));
    }
    Ok(fallback.map(|format| FormatRef {
        id: format.id,
        name: format.name,
    }))
}

impl DependencyHandler for SearchHandler {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let search = load_for_export(reg.services().searches.as_ref(), dep)?;
        let mut children = Vec::new();
        if let Some(id) = search.display_format_id
            && let Some(format) =
                reg.get_dependency(tok, ObjectType::DisplayFormat, &id.to_string())?
        {
            children.push(format);
        }
        for community_id in &search.community_ids {
            if let Some(community) =
                reg.get_dependency(tok, ObjectType::Community, &community_id.to_string())?
            {
                children.push(community);
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
            .searches
            .list()?
            .into_iter()
            .filter(|s| s.is_view == self.is_view())
            .map(|s| reg.new_dependency(self.object_type, s.id.to_string(), s.name))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        find_by_dependency_id(reg.services().searches.as_ref(), self.object_type, id)?
            .filter(|s| s.is_view == self.is_view())
            .map(|s| reg.new_dependency(self.object_type, s.id.to_string(), s.name))
            .transpose()
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let mut search = load_for_export(reg.services().searches.as_ref(), dep)?;
        if search.display_format_name.is_none()
            && let Some(id) = search.display_format_id
            && let Some(format) = reg.services().display_formats.find(id)?
        {
            search.display_format_name = Some(format.name);
        }
        Ok(vec![service_xml_file(&search)?])
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
            reg.services().searches.as_ref(),
            archive,
            dep,
            ctx,
            |search: &mut Search, ctx: &mut ImportCtx| {
                search.is_view = self.is_view();
                let Some(format) = resolve_display_format(reg, ctx, search)? else {
                    let reason = format!(
                        "No display format is available on the target for {} '{}'",
                        dep.object_type, search.name
                    );
                    ctx.add_warning(reason.clone());
                    return Ok(InstallOutcome::Skipped(reason));
                };
                search.display_format_id = Some(format.id);
                search.display_format_name = Some(format.name);
                search.community_ids = resolve_associations(
                    reg,
                    tok,
                    ctx,
                    dep,
                    &[ObjectType::Community],
                    &search.community_ids,
                )?;
                Ok(InstallOutcome::Installed)
            },
        )
    }
}
