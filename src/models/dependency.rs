//! Dependency model
//!
//! A [`Dependency`] identifies one deployable object instance. Once expanded by
//! a discovery pass it owns its child dependencies for the duration of that
//! operation.

use crate::error::{DeployError, DeployResult};
use crate::models::enums::{DependencyType, ObjectType};
use crate::models::id_map::IdMapKey;
use crate::models::pair_id::PairDependencyId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reference to one instance of a deployable CMS object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// Kind of object
    pub object_type: ObjectType,
    /// Numeric GUID, pair id or path depending on the object type
    pub dependency_id: String,
    /// Human readable name
    pub display_name: String,
    /// Sharing level
    pub dependency_type: DependencyType,
    /// Referenced by, but not owned by, the parent
    #[serde(default)]
    pub is_association: bool,
    /// Parent id for parent-scoped types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Parent type for parent-scoped types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<ObjectType>,
    #[serde(default)]
    pub supports_id_mapping: bool,
    #[serde(default)]
    pub supports_parent_id: bool,
    #[serde(default)]
    pub supports_id_types: bool,
    #[serde(default)]
    pub can_be_included_excluded: bool,
    #[serde(default)]
    pub is_included: bool,
    #[serde(default)]
    pub auto_expand: bool,
    /// Child dependencies; `None` until the dependency has been expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Dependency>>,
}

impl Dependency {
    /// Create a dependency with all capability flags cleared
    ///
    /// System dependencies start excluded since every server already has them.
    pub fn new(
        object_type: ObjectType,
        dependency_id: impl Into<String>,
        display_name: impl Into<String>,
        dependency_type: DependencyType,
    ) -> Self {
        Self {
            object_type,
            dependency_id: dependency_id.into(),
            display_name: display_name.into(),
            dependency_type,
            is_association: false,
            parent_id: None,
            parent_type: None,
            supports_id_mapping: false,
            supports_parent_id: false,
            supports_id_types: false,
            can_be_included_excluded: dependency_type != DependencyType::Local,
            is_included: dependency_type != DependencyType::System,
            auto_expand: dependency_type != DependencyType::System,
            children: None,
        }
    }

    /// Unique key within a package: `<type>-<id>`
    pub fn key(&self) -> String {
        format!("{}-{}", self.object_type, self.dependency_id)
    }

    pub fn set_parent(&mut self, parent_id: impl Into<String>, parent_type: ObjectType) {
        self.parent_id = Some(parent_id.into());
        self.parent_type = Some(parent_type);
    }

    pub fn is_system(&self) -> bool {
        self.dependency_type == DependencyType::System
    }

    /// Key used to look this dependency up in an id map
    ///
    /// Parent id and type take part in the key only when the type supports parent ids.
    pub fn id_map_key(&self) -> DeployResult<IdMapKey> {
        let source_id = if self.supports_parent_id {
            self.pair_id()?.child_id().to_string()
        } else {
            self.dependency_id.clone()
        };
        if self.supports_parent_id {
            let (Some(parent_id), Some(parent_type)) = (&self.parent_id, self.parent_type) else {
                return Err(DeployError::InvalidArgument(format!(
                    "Dependency {} supports parent ids but has no parent",
                    self.key()
                )));
            };
            Ok(IdMapKey::with_parent(
                source_id,
                self.object_type,
                parent_id.clone(),
                parent_type,
            ))
        } else {
            Ok(IdMapKey::new(source_id, self.object_type))
        }
    }

    /// Parse the dependency id as a numeric GUID
    pub fn numeric_id(&self) -> DeployResult<u64> {
        parse_numeric_id(self.object_type, &self.dependency_id)
    }

    /// Parse the dependency id as a pair id
    pub fn pair_id(&self) -> DeployResult<PairDependencyId> {
        PairDependencyId::parse(&self.dependency_id)
    }

    /// Children, empty when not expanded
    pub fn children(&self) -> &[Dependency] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn set_children(&mut self, children: Vec<Dependency>) {
        self.children = Some(children);
    }

    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    /// Find a descendant by type and id
    ///
    /// Walks the owned tree depth first. A key is visited once, so a malformed
    /// tree that repeats a node cannot make the walk revisit it.
    pub fn find_child_dependency(
        &self,
        object_type: ObjectType,
        dependency_id: &str,
    ) -> Option<&Dependency> {
        let mut visited = HashSet::new();
        visited.insert(self.key());
        find_in(self.children(), object_type, dependency_id, &mut visited)
    }

    /// This dependency followed by every descendant, depth first
    pub fn flatten(&self) -> Vec<&Dependency> {
        let mut out = Vec::new();
        collect_pre_order(self, &mut out);
        out
    }
}

fn collect_pre_order<'a>(dep: &'a Dependency, out: &mut Vec<&'a Dependency>) {
    out.push(dep);
    for child in dep.children() {
        collect_pre_order(child, out);
    }
}

fn find_in<'a>(
    children: &'a [Dependency],
    object_type: ObjectType,
    dependency_id: &str,
    visited: &mut HashSet<String>,
) -> Option<&'a Dependency> {
    for child in children {
        if child.object_type == object_type && child.dependency_id == dependency_id {
            return Some(child);
        }
        if !visited.insert(child.key()) {
            continue;
        }
        if let Some(found) = find_in(child.children(), object_type, dependency_id, visited) {
            return Some(found);
        }
    }
    None
}

/// Parse a numeric GUID, reporting the owning type on failure
pub fn parse_numeric_id(object_type: ObjectType, id: &str) -> DeployResult<u64> {
    id.trim().parse::<u64>().map_err(|_| {
        DeployError::InvalidArgument(format!("{} id '{}' is not numeric", object_type, id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(t: ObjectType, id: &str) -> Dependency {
        Dependency::new(t, id, id, DependencyType::Shared)
    }

    #[test]
    fn finds_nested_children() {
        let mut slot = dep(ObjectType::Slot, "5");
        slot.set_children(vec![dep(ObjectType::Template, "9")]);
        let mut root = dep(ObjectType::Site, "1");
        root.set_children(vec![dep(ObjectType::Template, "8"), slot]);

        let found = root.find_child_dependency(ObjectType::Template, "9").unwrap();
        assert_eq!(found.dependency_id, "9");
        assert!(root.find_child_dependency(ObjectType::Template, "10").is_none());
    }

    #[test]
    fn flatten_is_depth_first() {
        let mut a = dep(ObjectType::Slot, "a");
        a.set_children(vec![dep(ObjectType::Template, "a1")]);
        let mut root = dep(ObjectType::Site, "root");
        root.set_children(vec![a, dep(ObjectType::Template, "b")]);

        let ids: Vec<&str> = root
            .flatten()
            .iter()
            .map(|d| d.dependency_id.as_str())
            .collect();
        assert_eq!(ids, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn parent_scoped_key_uses_child_half() {
        let mut state = dep(ObjectType::WorkflowState, "4-17");
        state.supports_parent_id = true;
        state.set_parent("4", ObjectType::Workflow);
        let key = state.id_map_key().unwrap();
        assert_eq!(key.source_id, "17");
        assert_eq!(key.parent_id.as_deref(), Some("4"));
    }

    #[test]
    fn system_dependencies_start_excluded() {
        let d = Dependency::new(ObjectType::Application, "sys_cx", "sys_cx", DependencyType::System);
        assert!(!d.is_included);
        assert!(!d.auto_expand);
    }
}
