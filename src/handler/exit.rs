//! Extension (exit) handler
//!
//! Exits are registered extensions addressed by their fully qualified name,
//! `handler/context/name`. Exits in the `percussion` context ship with every
//! server and are reported as system dependencies.

use crate::error::DeployResult;
use crate::handler::{DependencyHandler, HandlerRegistry};
use crate::models::{Dependency, ExtensionRef, ObjectType};
use crate::services::{CatalogEntry, SecurityToken};
use tracing::debug;

pub struct ExitHandler;

impl ExitHandler {
    fn to_dependency(
        &self,
        reg: &HandlerRegistry,
        entry: CatalogEntry,
    ) -> DeployResult<Dependency> {
        let ext = ExtensionRef::parse(&entry.id)?;
        if ext.is_system() {
            reg.new_system_dependency(ObjectType::Exit, ext.fqn(), entry.name)
        } else {
            reg.new_dependency(ObjectType::Exit, ext.fqn(), entry.name)
        }
    }
}

impl DependencyHandler for ExitHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::Exit
    }

    fn get_child_dependencies(
        &self,
        _reg: &HandlerRegistry,
        _tok: &SecurityToken,
        _dep: &Dependency,
    ) -> DeployResult<Vec<Dependency>> {
        Ok(Vec::new())
    }

    fn get_dependencies(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
    ) -> DeployResult<Vec<Dependency>> {
        reg.services()
            .elements
            .list(ObjectType::Exit)?
            .into_iter()
            .map(|entry| self.to_dependency(reg, entry))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        let ext = ExtensionRef::parse(id)?;
        match reg.services().elements.find(ObjectType::Exit, &ext.fqn())? {
            Some(entry) => Ok(Some(self.to_dependency(reg, entry)?)),
            None => {
                debug!("Exit {} is not registered", ext);
                Ok(None)
            }
        }
    }
}
