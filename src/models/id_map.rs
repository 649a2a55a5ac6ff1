//! Identity mapping between a source and a target repository
//!
//! An [`IdMap`] holds every source→target translation for one source server.
//! Mappings are created during install planning with `is_new_object` set; the
//! flag is cleared as soon as the object has been persisted on the target so a
//! second pass in the same run reuses the reserved id.

use crate::models::enums::ObjectType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lookup key for an id mapping
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdMapKey {
    pub source_id: String,
    pub object_type: ObjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<ObjectType>,
}

impl IdMapKey {
    pub fn new(source_id: impl Into<String>, object_type: ObjectType) -> Self {
        Self {
            source_id: source_id.into(),
            object_type,
            parent_id: None,
            parent_type: None,
        }
    }

    pub fn with_parent(
        source_id: impl Into<String>,
        object_type: ObjectType,
        parent_id: impl Into<String>,
        parent_type: ObjectType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            object_type,
            parent_id: Some(parent_id.into()),
            parent_type: Some(parent_type),
        }
    }
}

/// One source→target translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdMapping {
    #[serde(flatten)]
    key: IdMapKey,
    source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_name: Option<String>,
    is_new_object: bool,
}

impl IdMapping {
    /// Mapping for an object that does not exist on the target yet
    pub fn new_object(key: IdMapKey, source_name: impl Into<String>) -> Self {
        Self {
            key,
            source_name: source_name.into(),
            target_id: None,
            target_name: None,
            is_new_object: true,
        }
    }

    /// Mapping onto an object that already exists on the target
    pub fn existing(
        key: IdMapKey,
        source_name: impl Into<String>,
        target_id: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            key,
            source_name: source_name.into(),
            target_id: Some(target_id.into()),
            target_name: Some(target_name.into()),
            is_new_object: false,
        }
    }

    pub fn key(&self) -> &IdMapKey {
        &self.key
    }

    pub fn source_id(&self) -> &str {
        &self.key.source_id
    }

    pub fn object_type(&self) -> ObjectType {
        self.key.object_type
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref()
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    pub fn is_new_object(&self) -> bool {
        self.is_new_object
    }

    pub fn set_target(&mut self, target_id: impl Into<String>, target_name: impl Into<String>) {
        self.target_id = Some(target_id.into());
        self.target_name = Some(target_name.into());
    }

    pub fn set_is_new_object(&mut self, is_new: bool) {
        self.is_new_object = is_new;
    }
}

/// All id mappings for one source repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IdMapFile", into = "IdMapFile")]
pub struct IdMap {
    source_repository: String,
    mappings: BTreeMap<IdMapKey, IdMapping>,
}

impl IdMap {
    pub fn new(source_repository: impl Into<String>) -> Self {
        Self {
            source_repository: source_repository.into(),
            mappings: BTreeMap::new(),
        }
    }

    pub fn source_repository(&self) -> &str {
        &self.source_repository
    }

    /// Add or replace a mapping
    pub fn add_mapping(&mut self, mapping: IdMapping) {
        self.mappings.insert(mapping.key.clone(), mapping);
    }

    pub fn get_mapping(&self, key: &IdMapKey) -> Option<&IdMapping> {
        self.mappings.get(key)
    }

    pub fn get_mapping_mut(&mut self, key: &IdMapKey) -> Option<&mut IdMapping> {
        self.mappings.get_mut(key)
    }

    pub fn contains(&self, key: &IdMapKey) -> bool {
        self.mappings.contains_key(key)
    }

    pub fn mappings(&self) -> impl Iterator<Item = &IdMapping> {
        self.mappings.values()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Serialize to JSON for persistence between runs
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Persisted form: mappings as a list since keys are structured
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdMapFile {
    source_repository: String,
    #[serde(default)]
    mappings: Vec<IdMapping>,
}

impl From<IdMapFile> for IdMap {
    fn from(file: IdMapFile) -> Self {
        let mut map = IdMap::new(file.source_repository);
        for mapping in file.mappings {
            map.add_mapping(mapping);
        }
        map
    }
}

impl From<IdMap> for IdMapFile {
    fn from(map: IdMap) -> Self {
        IdMapFile {
            source_repository: map.source_repository,
            mappings: map.mappings.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_scoped_keys_are_distinct() {
        let mut map = IdMap::new("source:9992");
        map.add_mapping(IdMapping::existing(
            IdMapKey::with_parent("1", ObjectType::WorkflowState, "4", ObjectType::Workflow),
            "Draft",
            "11",
            "Draft",
        ));
        assert!(map.contains(&IdMapKey::with_parent(
            "1",
            ObjectType::WorkflowState,
            "4",
            ObjectType::Workflow
        )));
        assert!(!map.contains(&IdMapKey::with_parent(
            "1",
            ObjectType::WorkflowState,
            "5",
            ObjectType::Workflow
        )));
    }

    #[test]
    fn survives_json_persistence() {
        let mut map = IdMap::new("source:9992");
        let mut mapping = IdMapping::new_object(IdMapKey::new("301", ObjectType::Slot), "Related");
        mapping.set_target("1301", "Related");
        map.add_mapping(mapping);

        let restored = IdMap::from_json(&map.to_json().unwrap()).unwrap();
        assert_eq!(restored, map);
        let m = restored
            .get_mapping(&IdMapKey::new("301", ObjectType::Slot))
            .unwrap();
        assert_eq!(m.target_id(), Some("1301"));
        assert!(m.is_new_object());
    }
}
