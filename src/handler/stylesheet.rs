//! Stylesheet handler
//!
//! Stylesheets are `.xsl` files under an application. Their children are the
//! stylesheets they include or import, the global templates they call and the
//! resources named by `concat($var, 'literal')` expressions.

use crate::context::ImportCtx;
use crate::error::{DeployError, DeployResult};
use crate::handler::app_support::{
    get_dep_from_path, is_stylesheet_path, split_app_path,
};
use crate::handler::support_file::install_application_file;
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome, dedup_dependencies};
use crate::models::{Dependency, DependencyFileType, ExportedFile, ObjectType};
use crate::services::archive::require_file;
use crate::services::{ArchiveHandler, SecurityToken};
use crate::xml::XmlElement;
use crate::xml::stylesheet::{
    GlobalTemplateRef, concat_paths, global_template_refs, include_hrefs, variable_table,
};
use tracing::debug;

pub struct StylesheetHandler;

impl StylesheetHandler {
    fn load(&self, reg: &HandlerRegistry, id: &str) -> DeployResult<XmlElement> {
        let (app, path) = split_app_path(id)?;
        let bytes = reg
            .services()
            .object_store
            .load_application_file(app, path)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            DeployError::unexpected(format!("Stylesheet {} is not valid UTF-8: {}", id, e))
        })?;
        XmlElement::parse(&text)
    }

    fn include_children(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        id: &str,
        root: &XmlElement,
        out: &mut Vec<Dependency>,
    ) -> DeployResult<()> {
        for href in include_hrefs(root) {
            let href = href.strip_prefix("file:").unwrap_or(&href);
            let resolved = if href.contains('/') {
                get_dep_from_path(reg, tok, href)?
            } else {
                let sibling = match id.rsplit_once('/') {
                    Some((dir, _)) => format!("{}/{}", dir, href),
                    None => href.to_string(),
                };
                reg.get_dependency(tok, ObjectType::Stylesheet, &sibling)?
            };
            match resolved {
                Some(dep) => out.push(dep),
                None => debug!("Included stylesheet {} not found", href),
            }
        }
        Ok(())
    }

    fn global_template_children(
        &self,
        reg: &HandlerRegistry,
        root: &XmlElement,
        out: &mut Vec<Dependency>,
    ) -> DeployResult<()> {
        let conventions = &reg.config().global_templates;
        for found in global_template_refs(root, conventions) {
            match found {
                GlobalTemplateRef::Dispatcher => {
                    let id = format!(
                        "{}/{}/{}.xsl",
                        conventions.application, conventions.directory, conventions.dispatcher
                    );
                    out.push(reg.new_dependency(ObjectType::Stylesheet, id.clone(), id)?);
                }
                GlobalTemplateRef::Legacy(base) => {
                    let path = format!("{}/{}.xsl", conventions.directory, base);
                    if reg
                        .services()
                        .object_store
                        .application_file_exists(&conventions.application, &path)?
                    {
                        let id = format!("{}/{}", conventions.application, path);
                        out.push(reg.new_dependency(ObjectType::Stylesheet, id.clone(), id)?);
                    }
                }
            }
        }
        Ok(())
    }
}

impl DependencyHandler for StylesheetHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::Stylesheet
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let root = self.load(reg, &dep.dependency_id)?;
        let mut children = Vec::new();
        self.include_children(reg, tok, &dep.dependency_id, &root, &mut children)?;
        self.global_template_children(reg, &root, &mut children)?;

        let variables = variable_table(&root);
        for path in concat_paths(&root, &variables) {
            if let Some(child) = get_dep_from_path(reg, tok, &path)? {
                children.push(child);
            }
        }

        let own_key = dep.key();
        children.retain(|c| c.key() != own_key);
        Ok(dedup_dependencies(children))
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
                    let id = format!("{}/{}", app, path);
                    deps.push(reg.new_dependency(ObjectType::Stylesheet, id.clone(), id)?);
                }
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
        if !is_stylesheet_path(path)
            || !reg
                .services()
                .object_store
                .application_file_exists(app, path)?
        {
            return Ok(None);
        }
        Ok(Some(reg.new_dependency(ObjectType::Stylesheet, id, id)?))
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
            ExportedFile::new(DependencyFileType::ApplicationFile, data).with_original_path(path),
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
        let file = require_file(archive, dep, DependencyFileType::ApplicationFile)?;
        let data = archive.get_file_data(&file)?;
        install_application_file(reg, ctx, dep, &data)?;
        Ok(InstallOutcome::Installed)
    }
}
