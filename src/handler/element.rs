//! Catalog element handler
//!
//! Communities, ACLs, shared field groups, contexts and roles are leaf
//! objects. They are referenced by other dependencies but are never
//! expanded or packaged, so only the lookups are implemented.

use crate::error::DeployResult;
use crate::handler::{DependencyHandler, HandlerRegistry};
use crate::models::{Dependency, ObjectType};
use crate::services::SecurityToken;

pub struct ElementHandler {
    object_type: ObjectType,
}

impl ElementHandler {
    pub fn new(object_type: ObjectType) -> Self {
        Self { object_type }
    }
}

impl DependencyHandler for ElementHandler {
    fn object_type(&self) -> ObjectType {
        self.object_type
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
            .list(self.object_type)?
            .into_iter()
            .map(|entry| reg.new_dependency(self.object_type, entry.id, entry.name))
            .collect()
    }

    fn get_dependency(
        &self,
        reg: &HandlerRegistry,
        _tok: &SecurityToken,
        id: &str,
    ) -> DeployResult<Option<Dependency>> {
        reg.services()
            .elements
            .find(self.object_type, id)?
            .map(|entry| reg.new_dependency(self.object_type, entry.id, entry.name))
            .transpose()
    }
}
