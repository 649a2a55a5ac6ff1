//! Application and content editor handler
//!
//! Applications are XML documents in the object store. Discovery walks the
//! document for extension calls, URL requests and text literals, adds the
//! files stored under the application and, for types that scan ID types, the
//! objects named by the application's ID-type definitions.
//!
//! A content editor is the application behind a content type. It maps its
//! ids through the content type it belongs to.

use crate::context::ImportCtx;
use crate::error::{DeployError, DeployResult};
use crate::handler::app_support::{get_dep_from_path, is_stylesheet_path, with_application_lock};
use crate::handler::id_mapping::{action_for_existence, get_row_action, transform_optional};
use crate::handler::txn::{ELEMENT_OBJECT, add_transaction_log_entry};
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome, dedup_dependencies};
use crate::models::{
    Dependency, DependencyFileType, ExportedFile, ExtensionRef, ObjectType,
};
use crate::services::archive::{get_files_by_type, read_text, require_file};
use crate::services::{ArchiveHandler, IdTypeEntry, SecurityToken};
use crate::xml::{WildcardPattern, XmlElement};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// Archive path of the ID-type definitions packaged with an application
pub const ID_TYPES_PATH: &str = "META-INF/idtypes.json";

static MAKE_LINK_EXITS: Lazy<WildcardPattern> =
    Lazy::new(|| WildcardPattern::new("sys_Make*Link*").expect("Invalid pattern"));

const EXTENSION_CALL: &str = "PSXExtensionCall";
const EXTENSION_PARAM: &str = "PSXExtensionParamValue";
const URL_REQUEST: &str = "PSXUrlRequest";
const TEXT_LITERAL: &str = "PSXTextLiteral";

pub struct ApplicationHandler {
    object_type: ObjectType,
    /// ID-type definitions per application, loaded once
    id_types: Mutex<HashMap<String, Vec<IdTypeEntry>>>,
}

impl ApplicationHandler {
    pub fn application() -> Self {
        Self::new(ObjectType::Application)
    }

    pub fn content_editor() -> Self {
        Self::new(ObjectType::ContentEditor)
    }

    fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            id_types: Mutex::new(HashMap::new()),
        }
    }

    fn is_content_editor(&self) -> bool {
        self.object_type == ObjectType::ContentEditor
    }

    fn load_id_types(&self, reg: &HandlerRegistry, app: &str) -> DeployResult<Vec<IdTypeEntry>> {
        let mut cache = self
            .id_types
            .lock()
            .map_err(|_| DeployError::unexpected("ID type cache lock poisoned"))?;
        if let Some(entries) = cache.get(app) {
            return Ok(entries.clone());
        }
        let entries = reg.services().object_store.load_id_types(app)?;
        cache.insert(app.to_string(), entries.clone());
        Ok(entries)
    }

    /// Names of applications that back a content type
    fn editor_apps(&self, reg: &HandlerRegistry) -> DeployResult<Vec<String>> {
        Ok(reg
            .services()
            .content_types
            .list()?
            .into_iter()
            .map(|ct| ct.editor_app)
            .collect())
    }

    fn extension_children(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        root: &XmlElement,
        out: &mut Vec<Dependency>,
    ) -> DeployResult<()> {
        for call in root.find_all(EXTENSION_CALL) {
            let Some(name) = call.child("name").map(|n| n.text()) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if let Some(exit) = reg.get_dependency(tok, ObjectType::Exit, name)? {
                out.push(exit);
            }

            let Ok(ext) = ExtensionRef::parse(name) else {
                continue;
            };
            if !MAKE_LINK_EXITS.is_match(&ext.name) {
                continue;
            }
            if let Some(app) = linked_application(call)
                && let Some(dep) = reg.get_dependency(tok, ObjectType::Application, &app)?
            {
                out.push(dep);
            }
        }
        Ok(())
    }

    fn path_children(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        root: &XmlElement,
        out: &mut Vec<Dependency>,
    ) -> DeployResult<()> {
        for request in root.find_all(URL_REQUEST) {
            if let Some(href) = request.attr("href")
                && let Some(dep) = get_dep_from_path(reg, tok, href)?
            {
                out.push(dep);
            }
        }
        for literal in root.find_all(TEXT_LITERAL) {
            let Some(text) = literal.child("text").map(|t| t.text()) else {
                continue;
            };
            if !text.contains('/') {
                continue;
            }
            if let Some(dep) = get_dep_from_path(reg, tok, &text)? {
                out.push(dep);
            }
        }
        Ok(())
    }

    fn file_children(
        &self,
        reg: &HandlerRegistry,
        app: &str,
        out: &mut Vec<Dependency>,
    ) -> DeployResult<()> {
        for path in reg.services().object_store.list_application_files(app)? {
            let id = format!("{}/{}", app, path);
            let object_type = if is_stylesheet_path(&path) {
                ObjectType::Stylesheet
            } else {
                ObjectType::SupportFile
            };
            out.push(reg.new_dependency(object_type, id.clone(), id)?);
        }
        Ok(())
    }

    fn id_type_children(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        app: &str,
        out: &mut Vec<Dependency>,
    ) -> DeployResult<()> {
        for entry in self.load_id_types(reg, app)? {
            if !reg
                .map()
                .is_child_type_supported(self.object_type, entry.object_type)
            {
                continue;
            }
            if let Some(dep) = reg.get_dependency(tok, entry.object_type, &entry.value)? {
                out.push(dep);
            }
        }
        Ok(())
    }
}

/// File name the application document is locked under
fn application_document(app: &str) -> String {
    format!("{}.xml", app)
}

/// Application named by the first parameter of a link-building exit call:
/// the segment after a leading `..`
fn linked_application(call: &XmlElement) -> Option<String> {
    let param = call.find_all(EXTENSION_PARAM).into_iter().next()?;
    let text = param.find_all("text").into_iter().next()?.text();
    let mut segments = text.trim().split('/');
    if segments.next()? != ".." {
        return None;
    }
    segments
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Rewrite tagged literals to target ids
///
/// Literals without a mapping are left alone and reported as warnings.
fn transform_id_types(
    reg: &HandlerRegistry,
    ctx: &mut ImportCtx,
    root: &mut XmlElement,
    entries: &mut [IdTypeEntry],
) -> DeployResult<()> {
    for entry in entries.iter_mut() {
        let Some(target) = transform_optional(reg, ctx, entry.object_type, &entry.value, None)?
        else {
            ctx.add_warning(format!(
                "ID type literal {} in <{}> has no {} mapping and was left unchanged",
                entry.value, entry.element, entry.object_type
            ));
            continue;
        };
        if target == entry.value {
            continue;
        }
        let element = entry.element.clone();
        let source = entry.value.clone();
        root.visit_mut(&mut |e: &mut XmlElement| {
            if e.name == element && e.text().trim() == source {
                e.set_text(&target);
            }
        });
        entry.value = target;
    }
    Ok(())
}

impl DependencyHandler for ApplicationHandler {
    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let app = dep.dependency_id.as_str();
        let xml = reg.services().object_store.load_application(app)?;
        let root = XmlElement::parse(&xml)?;

        let mut children = Vec::new();
        self.extension_children(reg, tok, &root, &mut children)?;
        self.path_children(reg, tok, &root, &mut children)?;
        self.file_children(reg, app, &mut children)?;
        if dep.supports_id_types {
            self.id_type_children(reg, tok, app, &mut children)?;
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
        let editors = self.editor_apps(reg)?;
        reg.services()
            .object_store
            .list_applications()?
            .into_iter()
            .filter(|app| editors.contains(app) == self.is_content_editor())
            .map(|app| reg.new_dependency(self.object_type, app.clone(), app))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        if !reg.services().object_store.application_exists(id)? {
            return Ok(None);
        }
        if self.is_content_editor() && !self.editor_apps(reg)?.iter().any(|a| a == id) {
            return Ok(None);
        }
        Ok(Some(reg.new_dependency(self.object_type, id, id)?))
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let store = &reg.services().object_store;
        let app = dep.dependency_id.as_str();
        let mut files = vec![ExportedFile::new(
            DependencyFileType::ApplicationXml,
            store.load_application(app)?,
        )];
        let id_types = self.load_id_types(reg, app)?;
        if !id_types.is_empty() {
            files.push(
                ExportedFile::new(
                    DependencyFileType::ApplicationFile,
                    serde_json::to_vec_pretty(&id_types)?,
                )
                .with_original_path(ID_TYPES_PATH),
            );
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
        let app = dep.dependency_id.as_str();
        let file = require_file(archive, dep, DependencyFileType::ApplicationXml)?;
        let mut root = XmlElement::parse(&read_text(
            archive,
            &file,
            DependencyFileType::ApplicationXml,
        )?)?;

        let mut id_types: Vec<IdTypeEntry> = Vec::new();
        for file in get_files_by_type(archive, dep, DependencyFileType::ApplicationFile)? {
            if file.original_path.as_deref() == Some(ID_TYPES_PATH) {
                let json = read_text(archive, &file, DependencyFileType::ApplicationFile)?;
                id_types = serde_json::from_str(&json)?;
            }
        }
        transform_id_types(reg, ctx, &mut root, &mut id_types)?;

        let store = &reg.services().object_store;
        let existed = store.application_exists(app)?;
        let action = if dep.supports_id_mapping {
            get_row_action(reg, ctx, dep)?
        } else {
            action_for_existence(existed)
        };

        let xml = root.to_xml()?;
        with_application_lock(reg, app, &application_document(app), |_| {
            store.save_application(app, &xml)?;
            if !id_types.is_empty() {
                store.save_id_types(app, &id_types)?;
            }
            Ok(())
        })?;
        info!("Installed {} {}", self.object_type, app);

        add_transaction_log_entry(reg, ctx, dep, app, ELEMENT_OBJECT, action)?;
        Ok(InstallOutcome::Installed)
    }

    fn should_defer_installation(&self) -> bool {
        true
    }

    fn delegates_id_mapping(&self) -> bool {
        self.is_content_editor()
    }

    fn id_mapping_type(&self) -> ObjectType {
        if self.is_content_editor() {
            ObjectType::ContentType
        } else {
            self.object_type
        }
    }

    /// The content type owning the editor: the known parent, else the content
    /// type whose editor application carries this name
    fn source_for_id_mapping(
        &self,
        reg: &HandlerRegistry,
        id: &str,
        parent: Option<(&str, ObjectType)>,
    ) -> DeployResult<String> {
        if !self.is_content_editor() {
            return Ok(id.to_string());
        }
        if let Some((parent_id, ObjectType::ContentType)) = parent {
            return Ok(parent_id.to_string());
        }
        let owner = reg
            .services()
            .content_types
            .list()?
            .into_iter()
            .find(|ct| ct.editor_app == id)
            .ok_or_else(|| DeployError::not_found(ObjectType::ContentType, id))?;
        debug!("Content editor {} maps through content type {}", id, owner.id);
        Ok(owner.id.to_string())
    }
}
