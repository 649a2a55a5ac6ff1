//! Workflow state and transition handler
//!
//! States and transitions are owned by their workflow and addressed by a pair
//! id, `workflowId-elementId`. They have no files of their own; the workflow
//! installs their rows. Their ids are allocated per workflow.

use crate::error::DeployResult;
use crate::handler::workflow::{WORKFLOW_ID, element_columns};
use crate::handler::{DependencyHandler, HandlerRegistry};
use crate::models::{Dependency, ObjectType, PairDependencyId, Row, SelectFilter};
use crate::services::SecurityToken;

pub struct WorkflowElementHandler {
    object_type: ObjectType,
}

impl WorkflowElementHandler {
    pub fn new(object_type: ObjectType) -> Self {
        Self { object_type }
    }

    fn to_dependency(&self, reg: &HandlerRegistry, row: &Row) -> DeployResult<Option<Dependency>> {
        let (_, id_column, name_column) = element_columns(self.object_type)?;
        let (Some(workflow_id), Some(element_id)) = (row.get(WORKFLOW_ID), row.get(id_column))
        else {
            return Ok(None);
        };
        let pair = PairDependencyId::new(workflow_id.clone(), element_id.clone())?;
        let name = row
            .get(name_column)
            .cloned()
            .unwrap_or_else(|| element_id.clone());
        let mut dep = reg.new_dependency(self.object_type, pair.format(), name)?;
        dep.set_parent(workflow_id.clone(), ObjectType::Workflow);
        Ok(Some(dep))
    }
}

impl DependencyHandler for WorkflowElementHandler {
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
        let (table, _, _) = element_columns(self.object_type)?;
        let mut deps = Vec::new();
        for row in reg.services().relational.select(table, None)? {
            if let Some(dep) = self.to_dependency(reg, &row)? {
                deps.push(dep);
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
        let pair = PairDependencyId::parse(id)?;
        let (table, id_column, _) = element_columns(self.object_type)?;
        let filter = SelectFilter::equals(WORKFLOW_ID, pair.parent_id())
            .and(SelectFilter::equals(id_column, pair.child_id()));
        match reg.services().relational.select(table, Some(&filter))?.first() {
            Some(row) => self.to_dependency(reg, row),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::handler::workflow::{STATES_TABLE, builtin_schemas};
    use crate::models::DependencyData;
    use crate::models::dependency_data::row;
    use crate::services::{MemoryServices, RelationalStore};

    #[test]
    fn state_lookup_by_pair_id() {
        let memory = MemoryServices::new();
        let schema = builtin_schemas()
            .into_iter()
            .find(|s| s.name == STATES_TABLE)
            .unwrap();
        memory
            .relational
            .process_table(&DependencyData::new(
                schema,
                vec![row([
                    ("WORKFLOWAPPID", "5"),
                    ("STATEID", "1"),
                    ("STATENAME", "Draft"),
                ])],
            ))
            .unwrap();
        let reg = HandlerRegistry::with_defaults(memory.services(), DeployConfig::default()).unwrap();
        let tok = SecurityToken::new("admin");

        let dep = reg
            .get_dependency(&tok, ObjectType::WorkflowState, "5-1")
            .unwrap()
            .unwrap();
        assert_eq!(dep.display_name, "Draft");
        assert_eq!(dep.parent_id.as_deref(), Some("5"));
        assert_eq!(dep.id_map_key().unwrap().source_id, "1");

        assert!(
            reg.get_dependency(&tok, ObjectType::WorkflowState, "6-1")
                .unwrap()
                .is_none()
        );
        assert!(reg.get_dependency(&tok, ObjectType::WorkflowState, "51").is_err());
    }
}
