//! Dependency definition registry
//!
//! Each object type has one immutable [`DependencyDef`] describing its handler
//! and capabilities. The built-in definitions ship as `dependency_map.yaml`;
//! deployments may load their own map with [`DependencyMap::from_yaml`].

use crate::error::{DeployError, DeployResult};
use crate::models::enums::{DependencyType, ObjectType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const BUILTIN_MAP: &str = include_str!("dependency_map.yaml");

/// Handler implementation selected for an object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    Application,
    SupportFile,
    Stylesheet,
    Exit,
    ContentEditor,
    ContentType,
    Template,
    Slot,
    Site,
    Workflow,
    WorkflowElement,
    Search,
    DisplayFormat,
    Folder,
    Element,
}

/// Static metadata for one object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyDef {
    pub object_type: ObjectType,
    pub display_name: String,
    pub handler: HandlerKind,
    #[serde(default)]
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub child_types: Vec<ObjectType>,
    #[serde(default)]
    pub supports_id_mapping: bool,
    #[serde(default)]
    pub supports_parent_id: bool,
    /// Scans ID-type definitions for implicit children
    #[serde(default)]
    pub supports_id_types: bool,
    /// May be the target of an ID-type definition
    #[serde(default)]
    pub is_id_type: bool,
    #[serde(default)]
    pub supports_user_dependencies: bool,
    #[serde(default = "default_true")]
    pub auto_expand: bool,
    #[serde(default = "default_true")]
    pub can_be_included_excluded: bool,
    /// Allocator key used to reserve target ids for new objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_key: Option<String>,
    /// Parent type for parent-scoped ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<ObjectType>,
}

fn default_true() -> bool {
    true
}

/// Registry of dependency definitions keyed by object type
#[derive(Debug, Clone)]
pub struct DependencyMap {
    defs: HashMap<ObjectType, DependencyDef>,
}

impl DependencyMap {
    /// Definitions shipped with the crate
    pub fn builtin() -> DeployResult<Self> {
        Self::from_yaml(BUILTIN_MAP)
    }

    /// Load definitions from YAML (a list of definitions)
    pub fn from_yaml(yaml: &str) -> DeployResult<Self> {
        let defs: Vec<DependencyDef> = serde_yaml::from_str(yaml)
            .map_err(|e| DeployError::Config(format!("Invalid dependency map: {}", e)))?;
        Self::from_defs(defs)
    }

    /// Build a map, validating that every referenced type is defined
    pub fn from_defs(defs: Vec<DependencyDef>) -> DeployResult<Self> {
        let mut map = HashMap::new();
        for def in defs {
            if map.contains_key(&def.object_type) {
                return Err(DeployError::Config(format!(
                    "Duplicate dependency definition for {}",
                    def.object_type
                )));
            }
            map.insert(def.object_type, def);
        }
        for def in map.values() {
            for child in &def.child_types {
                if !map.contains_key(child) {
                    return Err(DeployError::Config(format!(
                        "{} lists undefined child type {}",
                        def.object_type, child
                    )));
                }
            }
            if def.supports_parent_id && def.parent_type.is_none() {
                return Err(DeployError::Config(format!(
                    "{} supports parent ids but declares no parent type",
                    def.object_type
                )));
            }
        }
        debug!("Loaded {} dependency definitions", map.len());
        Ok(Self { defs: map })
    }

    pub fn get(&self, object_type: ObjectType) -> DeployResult<&DependencyDef> {
        self.defs.get(&object_type).ok_or_else(|| {
            DeployError::Config(format!("No dependency definition for {}", object_type))
        })
    }

    pub fn defs(&self) -> impl Iterator<Item = &DependencyDef> {
        self.defs.values()
    }

    /// True when `child` may appear under `parent`: declared child types, plus
    /// every ID-type target when the parent scans ID types
    pub fn is_child_type_supported(&self, parent: ObjectType, child: ObjectType) -> bool {
        let Some(parent_def) = self.defs.get(&parent) else {
            return false;
        };
        if parent_def.child_types.contains(&child) {
            return true;
        }
        parent_def.supports_id_types && self.defs.get(&child).is_some_and(|d| d.is_id_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_map_defines_every_type() {
        let map = DependencyMap::builtin().unwrap();
        for t in ObjectType::ALL {
            assert!(map.get(t).is_ok(), "missing definition for {}", t);
        }
    }

    #[test]
    fn id_type_targets_are_implicit_children() {
        let map = DependencyMap::builtin().unwrap();
        // Slot is not a declared child of Application but is an ID-type target
        assert!(map.is_child_type_supported(ObjectType::Application, ObjectType::Slot));
        assert!(!map.is_child_type_supported(ObjectType::Folder, ObjectType::Slot));
    }

    #[test]
    fn rejects_undefined_children() {
        let yaml = r#"
- object_type: Slot
  display_name: Slot
  handler: slot
  child_types: [Template]
"#;
        assert!(matches!(
            DependencyMap::from_yaml(yaml),
            Err(DeployError::Config(_))
        ));
    }
}
