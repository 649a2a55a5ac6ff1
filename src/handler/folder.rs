//! Folder handler
//!
//! Folders are addressed by path. A folder's children are its immediate
//! child folders, its community and its display format. Installing a folder
//! creates any missing ancestors first.

use crate::context::ImportCtx;
use crate::error::{DeployError, DeployResult};
use crate::handler::id_mapping::{action_for_existence, resolve_numeric_association};
use crate::handler::txn::{ELEMENT_OBJECT, add_transaction_log_entry};
use crate::handler::{DependencyHandler, HandlerRegistry, InstallOutcome};
use crate::models::{Dependency, DependencyFileType, ExportedFile, Folder, FolderPath, ObjectType};
use crate::services::archive::{read_text, require_file};
use crate::services::{ArchiveHandler, SecurityToken};
use tracing::{debug, info};

const FOLDER_ROOT: &str = "Folder";

pub struct FolderHandler;

impl FolderHandler {
    fn to_dependency(&self, reg: &HandlerRegistry, path: &FolderPath) -> DeployResult<Dependency> {
        let name = path.name().unwrap_or_default().to_string();
        reg.new_dependency(ObjectType::Folder, path.to_string(), name)
    }

    fn load(&self, reg: &HandlerRegistry, dep: &Dependency) -> DeployResult<(FolderPath, Folder)> {
        let path = FolderPath::parse(&dep.dependency_id);
        let folder = reg
            .services()
            .folders
            .find_folder(&path)?
            .ok_or_else(|| DeployError::not_found(ObjectType::Folder, &dep.dependency_id))?;
        Ok((path, folder))
    }

    /// Create every missing ancestor of `path` as a plain folder
    fn ensure_ancestors(&self, reg: &HandlerRegistry, path: &FolderPath) -> DeployResult<()> {
        let folders = &reg.services().folders;
        let mut current = FolderPath::root();
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        for name in parent.names() {
            current = current.child(name)?;
            if folders.find_folder(&current)?.is_none() {
                folders.save_folder(&current, &Folder::new(name.clone()))?;
                debug!("Created missing folder {}", current);
            }
        }
        Ok(())
    }
}

/// Serialize a folder for a package
pub fn folder_to_xml(folder: &Folder) -> DeployResult<String> {
    quick_xml::se::to_string_with_root(FOLDER_ROOT, folder)
        .map_err(|e| DeployError::Unexpected(format!("Failed to serialize folder: {}", e)))
}

/// Parse a packaged folder
pub fn folder_from_xml(xml: &str) -> DeployResult<Folder> {
    quick_xml::de::from_str(xml)
        .map_err(|e| DeployError::Unexpected(format!("Failed to parse folder: {}", e)))
}

impl DependencyHandler for FolderHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::Folder
    }

    fn get_child_dependencies(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let (path, folder) = self.load(reg, dep)?;
        let mut children = Vec::new();
        for summary in reg.services().folders.child_folders(&path)? {
            children.push(reg.new_dependency(
                ObjectType::Folder,
                summary.path.to_string(),
                summary.name,
            )?);
        }
        if let Some(id) = folder.community_id
            && let Some(community) =
                reg.get_dependency(tok, ObjectType::Community, &id.to_string())?
        {
            children.push(community);
        }
        if let Some(id) = folder.display_format_id
            && let Some(format) =
                reg.get_dependency(tok, ObjectType::DisplayFormat, &id.to_string())?
        {
            children.push(format);
        }
        Ok(children)
    }

    fn get_dependencies(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
    ) -> DeployResult<Vec<Dependency>> {
        reg.services()
            .folders
            .folder_paths()?
            .iter()
            .filter(|path| !path.is_root())
            .map(|path| self.to_dependency(reg, path))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        let path = FolderPath::parse(id);
        if path.is_root() {
            return Ok(None);
        }
        match reg.services().folders.find_folder(&path)? {
            Some(_) => Ok(Some(self.to_dependency(reg, &path)?)),
            None => Ok(None),
        }
    }

    fn get_dependency_files(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<ExportedFile>> {
        let (_, folder) = self.load(reg, dep)?;
        Ok(vec![ExportedFile::new(
            DependencyFileType::ServiceGeneratedXml,
            folder_to_xml(&folder)?,
        )])
    }

    fn install_dependency_files(
        &self,
        reg: &HandlerRegistry,
        tok: &SecurityToken,
        archive: &dyn ArchiveHandler,
        dep: &Dependency,
        ctx: &mut ImportCtx,
    ) -> DeployResult<InstallOutcome> {
        let file = require_file(archive, dep, DependencyFileType::ServiceGeneratedXml)?;
        let mut folder =
            folder_from_xml(&read_text(archive, &file, DependencyFileType::ServiceGeneratedXml)?)?;

        let path = FolderPath::parse(&dep.dependency_id);
        if path.is_root() {
            return Err(DeployError::InvalidArgument(
                "The root folder cannot be installed".to_string(),
            ));
        }
        if let Some(name) = path.name() {
            folder.name = name.to_string();
        }

        if let Some(id) = folder.community_id {
            let resolved = resolve_numeric_association(reg, tok, ctx, &[ObjectType::Community], id)?;
            if resolved.is_none() {
                ctx.add_warning(format!(
                    "Dropped community {} of folder {} which does not exist on the target",
                    id, path
                ));
            }
            folder.community_id = resolved.map(|(target, _)| target);
        }
        if let Some(id) = folder.display_format_id {
            let resolved =
                resolve_numeric_association(reg, tok, ctx, &[ObjectType::DisplayFormat], id)?;
            if resolved.is_none() {
                ctx.add_warning(format!(
                    "Dropped display format {} of folder {} which does not exist on the target",
                    id, path
                ));
            }
            folder.display_format_id = resolved.map(|(target, _)| target);
        }

        let folders = &reg.services().folders;
        let existed = folders.find_folder(&path)?.is_some();
        self.ensure_ancestors(reg, &path)?;
        folders.save_folder(&path, &folder)?;
        info!("Installed folder {}", path);

        add_transaction_log_entry(
            reg,
            ctx,
            dep,
            &path.to_string(),
            ELEMENT_OBJECT,
            action_for_existence(existed),
        )?;
        Ok(InstallOutcome::Installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_xml_round_trip() {
        let mut folder = Folder::new("Files");
        folder.community_id = Some(10);
        let xml = folder_to_xml(&folder).unwrap();
        assert!(xml.starts_with("<Folder>"));
        assert_eq!(folder_from_xml(&xml).unwrap(), folder);
    }
}
