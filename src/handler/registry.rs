//! Handler registry
//!
//! Built once from a [`DependencyMap`]: every definition's [`HandlerKind`] is
//! resolved to a concrete handler up front, so an unknown type fails when the
//! registry is built rather than mid-install.

use crate::config::DeployConfig;
use crate::error::{DeployError, DeployResult};
use crate::handler::DependencyHandler;
use crate::handler::application::ApplicationHandler;
use crate::handler::content_type::ContentTypeHandler;
use crate::handler::display_format::DisplayFormatHandler;
use crate::handler::element::ElementHandler;
use crate::handler::exit::ExitHandler;
use crate::handler::folder::FolderHandler;
use crate::handler::search::SearchHandler;
use crate::handler::site::SiteHandler;
use crate::handler::slot::SlotHandler;
use crate::handler::stylesheet::StylesheetHandler;
use crate::handler::support_file::SupportFileHandler;
use crate::handler::template::TemplateHandler;
use crate::handler::workflow::WorkflowHandler;
use crate::handler::workflow_element::WorkflowElementHandler;
use crate::models::{
    Dependency, DependencyDef, DependencyMap, DependencyType, HandlerKind, ObjectType,
};
use crate::services::{SecurityToken, Services};
use std::collections::HashMap;
use tracing::debug;

/// Handlers for every defined type plus the environment they run in
pub struct HandlerRegistry {
    services: Services,
    map: DependencyMap,
    config: DeployConfig,
    handlers: HashMap<ObjectType, Box<dyn DependencyHandler>>,
}

impl HandlerRegistry {
    pub fn new(services: Services, map: DependencyMap, config: DeployConfig) -> Self {
        let handlers = map
            .defs()
            .map(|def| (def.object_type, build_handler(def)))
            .collect::<HashMap<_, _>>();
        debug!("Registered {} dependency handlers", handlers.len());
        Self {
            services,
            map,
            config,
            handlers,
        }
    }

    /// Registry over the built-in dependency map
    pub fn with_defaults(services: Services, config: DeployConfig) -> DeployResult<Self> {
        Ok(Self::new(services, DependencyMap::builtin()?, config))
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn map(&self) -> &DependencyMap {
        &self.map
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn def(&self, object_type: ObjectType) -> DeployResult<&DependencyDef> {
        self.map.get(object_type)
    }

    pub fn handler(&self, object_type: ObjectType) -> DeployResult<&dyn DependencyHandler> {
        self.handlers
            .get(&object_type)
            .map(|h| h.as_ref())
            .ok_or_else(|| DeployError::Config(format!("No handler registered for {}", object_type)))
    }

    /// Build a dependency carrying its type's definition flags
    ///
    /// Names with a system prefix make a SYSTEM dependency regardless of the
    /// type's default sharing level.
    pub fn new_dependency(
        &self,
        object_type: ObjectType,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> DeployResult<Dependency> {
        let def = self.def(object_type)?;
        let name = name.into();
        let dependency_type = if self.config.is_system_name(&name) {
            DependencyType::System
        } else {
            def.dependency_type
        };
        let mut dep = Dependency::new(object_type, id, name, dependency_type);
        dep.supports_id_mapping = def.supports_id_mapping;
        dep.supports_parent_id = def.supports_parent_id;
        dep.supports_id_types = def.supports_id_types;
        if dependency_type == DependencyType::System {
            dep.is_included = false;
            dep.auto_expand = false;
            dep.can_be_included_excluded = false;
        } else {
            dep.auto_expand = def.auto_expand;
            dep.can_be_included_excluded =
                def.can_be_included_excluded && dependency_type != DependencyType::Local;
        }
        Ok(dep)
    }

    /// Build a SYSTEM dependency regardless of its name
    pub fn new_system_dependency(
        &self,
        object_type: ObjectType,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> DeployResult<Dependency> {
        let mut dep = self.new_dependency(object_type, id, name)?;
        dep.dependency_type = DependencyType::System;
        dep.is_included = false;
        dep.auto_expand = false;
        dep.can_be_included_excluded = false;
        Ok(dep)
    }

    /// Build a parent-scoped dependency whose id is a pair id
    pub fn new_child_dependency(
        &self,
        object_type: ObjectType,
        parent: &Dependency,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> DeployResult<Dependency> {
        let mut dep = self.new_dependency(object_type, id, name)?;
        let parent_type = self.def(object_type)?.parent_type.unwrap_or(parent.object_type);
        dep.set_parent(parent.dependency_id.clone(), parent_type);
        Ok(dep)
    }

    pub fn get_dependency(
        &self,
        tok: &SecurityToken,
        object_type: ObjectType,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        if id.trim().is_empty() {
            return Err(DeployError::InvalidArgument(format!(
                "{} id may not be empty",
                object_type
            )));
        }
        self.handler(object_type)?.get_dependency(self, tok, id)
    }

    pub fn get_dependencies(
        &self,
        tok: &SecurityToken,
        object_type: ObjectType,
    ) -> DeployResult<Vec<Dependency>> {
        self.handler(object_type)?.get_dependencies(self, tok)
    }

    /// Children of a dependency, checked against its declared child types
    pub fn get_child_dependencies(
        &self,
        tok: &SecurityToken,
        dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        let children = self
            .handler(dep.object_type)?
            .get_child_dependencies(self, tok, dep)?;
        for child in &children {
            if !self
                .map
                .is_child_type_supported(dep.object_type, child.object_type)
            {
                return Err(DeployError::UnsupportedChildType {
                    parent: dep.object_type,
                    child: child.object_type,
                });
            }
        }
        Ok(children)
    }
}

fn build_handler(def: &DependencyDef) -> Box<dyn DependencyHandler> {
    let object_type = def.object_type;
    match def.handler {
        HandlerKind::Application => Box::new(ApplicationHandler::application()),
        HandlerKind::ContentEditor => Box::new(ApplicationHandler::content_editor()),
        HandlerKind::SupportFile => Box::new(SupportFileHandler),
        HandlerKind::Stylesheet => Box::new(StylesheetHandler),
        HandlerKind::Exit => Box::new(ExitHandler),
        HandlerKind::ContentType => Box::new(ContentTypeHandler),
        HandlerKind::Template => Box::new(TemplateHandler::new(object_type)),
        HandlerKind::Slot => Box::new(SlotHandler),
        HandlerKind::Site => Box::new(SiteHandler),
        HandlerKind::Workflow => Box::new(WorkflowHandler::new()),
        HandlerKind::WorkflowElement => Box::new(WorkflowElementHandler::new(object_type)),
        HandlerKind::Search => Box::new(SearchHandler::new(object_type)),
        HandlerKind::DisplayFormat => Box::new(DisplayFormatHandler),
        HandlerKind::Folder => Box::new(FolderHandler),
        HandlerKind::Element => Box::new(ElementHandler::new(object_type)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryServices;

    fn registry() -> HandlerRegistry {
        HandlerRegistry::with_defaults(MemoryServices::new().services(), DeployConfig::default())
            .unwrap()
    }

    #[test]
    fn every_defined_type_has_a_handler() {
        let reg = registry();
        for t in ObjectType::ALL {
            assert_eq!(reg.handler(t).unwrap().object_type(), t);
        }
    }

    #[test]
    fn system_prefix_makes_system_dependency() {
        let reg = registry();
        let dep = reg
            .new_dependency(ObjectType::Application, "sys_resources", "sys_resources")
            .unwrap();
        assert!(dep.is_system());
        assert!(!dep.is_included);

        let dep = reg
            .new_dependency(ObjectType::Slot, "301", "rffRelated")
            .unwrap();
        assert!(dep.supports_id_mapping);
        assert!(dep.is_included);
    }

    #[test]
    fn empty_ids_are_rejected() {
        let reg = registry();
        let tok = SecurityToken::new("admin");
        assert!(matches!(
            reg.get_dependency(&tok, ObjectType::Slot, " "),
            Err(DeployError::InvalidArgument(_))
        ));
    }
}
