//! Id map lookups and target id transforms
//!
//! Resolution of a source id to a target id:
//! 1. the key is `(id, type, parent id, parent type)` for parent-scoped types
//!    and `(id, type)` otherwise
//! 2. a handler that delegates mapping rewrites the key through its mapping
//!    type, source id and parent mapping type
//! 3. without an id map there is no transform; with one, a missing entry is a
//!    `MissingIdMapping` error
//! 4. an entry without a target id is an `IncompleteIdMapping` error

use crate::context::ImportCtx;
use crate::error::{DeployError, DeployResult};
use crate::handler::HandlerRegistry;
use crate::models::{Dependency, IdMap, IdMapKey, IdMapping, ObjectType, RowAction};
use crate::services::SecurityToken;
use tracing::debug;

/// Lookup key for a dependency, after delegation
pub fn dependency_key(reg: &HandlerRegistry, dep: &Dependency) -> DeployResult<IdMapKey> {
    let owner = dep.parent_id.as_deref().zip(dep.parent_type);
    normalize_key(reg, dep.id_map_key()?, owner)
}

/// Lookup key for a referenced id of some type
pub fn reference_key(
    reg: &HandlerRegistry,
    object_type: ObjectType,
    source_id: &str,
    parent: Option<(&str, ObjectType)>,
) -> DeployResult<IdMapKey> {
    let key = match parent {
        Some((parent_id, parent_type)) => {
            IdMapKey::with_parent(source_id, object_type, parent_id, parent_type)
        }
        None => IdMapKey::new(source_id, object_type),
    };
    normalize_key(reg, key, parent)
}

fn normalize_key(
    reg: &HandlerRegistry,
    mut key: IdMapKey,
    owner: Option<(&str, ObjectType)>,
) -> DeployResult<IdMapKey> {
    let handler = reg.handler(key.object_type)?;
    if handler.delegates_id_mapping() {
        key.source_id = handler.source_for_id_mapping(reg, &key.source_id, owner)?;
        key.object_type = handler.id_mapping_type();
        match handler.parent_id_mapping_type() {
            Some(parent_type) => key.parent_type = Some(parent_type),
            None => {
                key.parent_id = None;
                key.parent_type = None;
            }
        }
    }
    Ok(key)
}

/// Mapping for a key; `None` when no id map is active
pub fn get_id_mapping<'a>(
    ctx: &'a ImportCtx,
    key: &IdMapKey,
) -> DeployResult<Option<&'a IdMapping>> {
    let Some(id_map) = ctx.id_map() else {
        return Ok(None);
    };
    id_map
        .get_mapping(key)
        .map(Some)
        .ok_or_else(|| missing_mapping(key))
}

/// Target id for a key; `None` when no id map is active
pub fn get_target_id(ctx: &ImportCtx, key: &IdMapKey) -> DeployResult<Option<String>> {
    let Some(mapping) = get_id_mapping(ctx, key)? else {
        return Ok(None);
    };
    mapping
        .target_id()
        .map(|id| Some(id.to_string()))
        .ok_or_else(|| DeployError::IncompleteIdMapping {
            object_type: key.object_type,
            source_id: key.source_id.clone(),
        })
}

/// Target id of the dependency itself, or its own id without an id map
pub fn target_id_for(
    reg: &HandlerRegistry,
    ctx: &ImportCtx,
    dep: &Dependency,
) -> DeployResult<String> {
    if !dep.supports_id_mapping {
        return Ok(dep.dependency_id.clone());
    }
    let key = dependency_key(reg, dep)?;
    Ok(get_target_id(ctx, &key)?.unwrap_or(key.source_id))
}

/// Numeric target id of the dependency itself
pub fn numeric_target_id_for(
    reg: &HandlerRegistry,
    ctx: &ImportCtx,
    dep: &Dependency,
) -> DeployResult<u64> {
    let id = target_id_for(reg, ctx, dep)?;
    crate::models::parse_numeric_id(dep.object_type, &id)
}

/// Transform a referenced id of a mapped type; a missing mapping is an error
pub fn transform_id(
    reg: &HandlerRegistry,
    ctx: &ImportCtx,
    object_type: ObjectType,
    source_id: &str,
    parent: Option<(&str, ObjectType)>,
) -> DeployResult<String> {
    let key = reference_key(reg, object_type, source_id, parent)?;
    Ok(get_target_id(ctx, &key)?.unwrap_or_else(|| source_id.to_string()))
}

/// Transform a referenced id, treating a missing mapping as "no transform
/// applies" (`Ok(None)`)
pub fn transform_optional(
    reg: &HandlerRegistry,
    ctx: &ImportCtx,
    object_type: ObjectType,
    source_id: &str,
    parent: Option<(&str, ObjectType)>,
) -> DeployResult<Option<String>> {
    let key = reference_key(reg, object_type, source_id, parent)?;
    match get_target_id(ctx, &key) {
        Ok(target) => Ok(Some(target.unwrap_or_else(|| source_id.to_string()))),
        Err(e) if e.is_missing_id_mapping() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolve an association to an object that must exist on the target
///
/// A mapped id resolves to its target id. An unmapped id (or any id when no
/// id map is active) resolves to itself only if the target already has an
/// object with that id; otherwise the association is dangling and `None` is
/// returned so the caller can drop it.
pub fn resolve_association(
    reg: &HandlerRegistry,
    tok: &SecurityToken,
    ctx: &ImportCtx,
    object_type: ObjectType,
    source_id: &str,
) -> DeployResult<Option<String>> {
    if ctx.id_map().is_some()
        && let Some(target) = transform_optional(reg, ctx, object_type, source_id, None)?
    {
        return Ok(Some(target));
    }
    if reg
        .handler(object_type)?
        .does_dependency_exist(reg, tok, source_id)?
    {
        return Ok(Some(source_id.to_string()));
    }
    debug!("{} {} does not resolve on the target", object_type, source_id);
    Ok(None)
}

/// Numeric variant of [`resolve_association`] over several candidate types;
/// returns the resolved id and the type it resolved as
///
/// Mappings of every candidate type are consulted before any existence check,
/// so a mapped reference never resolves to an unrelated object that happens
/// to share its source id on the target.
pub fn resolve_numeric_association(
    reg: &HandlerRegistry,
    tok: &SecurityToken,
    ctx: &ImportCtx,
    object_types: &[ObjectType],
    source_id: u64,
) -> DeployResult<Option<(u64, ObjectType)>> {
    let source = source_id.to_string();
    if ctx.id_map().is_some() {
        for &object_type in object_types {
            if let Some(target) = transform_optional(reg, ctx, object_type, &source, None)? {
                let id = crate::models::parse_numeric_id(object_type, &target)?;
                return Ok(Some((id, object_type)));
            }
        }
    }
    for &object_type in object_types {
        if reg
            .handler(object_type)?
            .does_dependency_exist(reg, tok, &source)?
        {
            return Ok(Some((source_id, object_type)));
        }
    }
    debug!("{} does not resolve on the target as any of {:?}", source_id, object_types);
    Ok(None)
}

/// Resolve a list of associations, dropping (with a warning) every entry that
/// does not resolve
pub fn resolve_associations(
    reg: &HandlerRegistry,
    tok: &SecurityToken,
    ctx: &mut ImportCtx,
    owner: &Dependency,
    object_types: &[ObjectType],
    source_ids: &[u64],
) -> DeployResult<Vec<u64>> {
    let mut resolved = Vec::with_capacity(source_ids.len());
    for &id in source_ids {
        match resolve_numeric_association(reg, tok, ctx, object_types, id)? {
            Some((target, _)) => resolved.push(target),
            None => ctx.add_warning(format!(
                "Dropped association from {} '{}' to {} {} which does not exist on the target",
                owner.object_type,
                owner.display_name,
                object_types.first().map_or("object", ObjectType::as_str),
                id
            )),
        }
    }
    Ok(resolved)
}

/// Log action for a dependency: CREATED for a new mapping, MODIFIED for an
/// existing one or when no mapping exists
pub fn get_row_action(
    reg: &HandlerRegistry,
    ctx: &ImportCtx,
    dep: &Dependency,
) -> DeployResult<RowAction> {
    if !dep.supports_id_mapping {
        return Ok(RowAction::Modified);
    }
    let key = dependency_key(reg, dep)?;
    let action = match ctx.id_map().and_then(|map| map.get_mapping(&key)) {
        Some(mapping) if mapping.is_new_object() => RowAction::Created,
        _ => RowAction::Modified,
    };
    Ok(action)
}

/// Log action for types installed without an id map entry
pub fn action_for_existence(existed: bool) -> RowAction {
    if existed {
        RowAction::Modified
    } else {
        RowAction::Created
    }
}

/// Clear the new-object flag once the dependency is persisted
pub fn mark_installed(
    reg: &HandlerRegistry,
    ctx: &mut ImportCtx,
    dep: &Dependency,
) -> DeployResult<()> {
    if !dep.supports_id_mapping {
        return Ok(());
    }
    let key = dependency_key(reg, dep)?;
    if let Some(mapping) = ctx.id_map_mut().and_then(|map| map.get_mapping_mut(&key)) {
        mapping.set_is_new_object(false);
    }
    Ok(())
}

/// Reserve a target id from the server allocator for a new object
///
/// Only types with an allocator key take part, and only when the mapping is
/// new and has no target id yet. Parent-scoped ids are allocated within the
/// parent's target id.
pub fn reserve_target_id(
    reg: &HandlerRegistry,
    dep: &Dependency,
    id_map: &mut IdMap,
) -> DeployResult<()> {
    let Some(id_key) = reg.def(dep.object_type)?.id_key.as_deref() else {
        return Ok(());
    };
    let key = dependency_key(reg, dep)?;
    match id_map.get_mapping(&key) {
        Some(mapping) if mapping.is_new_object() && mapping.target_id().is_none() => {}
        _ => return Ok(()),
    }

    let context = if dep.supports_parent_id {
        let (Some(parent_id), Some(parent_type)) = (dep.parent_id.as_deref(), dep.parent_type)
        else {
            return Err(DeployError::InvalidArgument(format!(
                "Dependency {} supports parent ids but has no parent",
                dep.key()
            )));
        };
        let parent_key = reference_key(reg, parent_type, parent_id, None)?;
        let parent_target = id_map
            .get_mapping(&parent_key)
            .ok_or_else(|| missing_mapping(&parent_key))?
            .target_id()
            .ok_or_else(|| DeployError::IncompleteIdMapping {
                object_type: parent_type,
                source_id: parent_id.to_string(),
            })?
            .to_string();
        Some(parent_target)
    } else {
        None
    };

    let next = reg
        .services()
        .relational
        .next_id(id_key, context.as_deref())?;
    if let Some(mapping) = id_map.get_mapping_mut(&key) {
        mapping.set_target(next.to_string(), dep.display_name.clone());
    }
    debug!("Reserved {} id {} for {}", id_key, next, dep.key());
    Ok(())
}

fn missing_mapping(key: &IdMapKey) -> DeployError {
    debug!(
        "No id mapping for {} {} in the active id map",
        key.object_type, key.source_id
    );
    DeployError::MissingIdMapping {
        object_type: key.object_type,
        source_id: key.source_id.clone(),
        parent_id: key.parent_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::context::RepositoryInfo;
    use crate::models::ContentType;
    use crate::services::{MemoryServices, MemoryTransactionLog};
    use std::sync::Arc;

    fn ctx(id_map: Option<IdMap>) -> ImportCtx {
        ImportCtx::new(
            id_map,
            RepositoryInfo::new("source", 9992, "rx"),
            RepositoryInfo::new("target", 9992, "rx"),
            Arc::new(MemoryTransactionLog::new()),
        )
    }

    #[test]
    fn content_editor_maps_through_its_content_type() {
        let memory = MemoryServices::new();
        memory
            .content_types
            .insert(ContentType::new(10, "rffBrief", "rffBriefEditor"))
            .unwrap();
        let reg = HandlerRegistry::with_defaults(memory.services(), DeployConfig::default()).unwrap();

        let editor = reg
            .new_dependency(ObjectType::ContentEditor, "rffBriefEditor", "rffBriefEditor")
            .unwrap();
        let key = dependency_key(&reg, &editor).unwrap();
        assert_eq!(key, IdMapKey::new("10", ObjectType::ContentType));

        let mut id_map = IdMap::new("source");
        id_map.add_mapping(IdMapping::existing(key, "rffBrief", "77", "rffBrief"));
        let ctx = ctx(Some(id_map));
        assert_eq!(target_id_for(&reg, &ctx, &editor).unwrap(), "77");
        assert_eq!(get_row_action(&reg, &ctx, &editor).unwrap(), RowAction::Modified);
    }

    #[test]
    fn row_action_follows_the_new_object_flag() {
        let reg = HandlerRegistry::with_defaults(MemoryServices::new().services(), DeployConfig::default())
            .unwrap();
        let slot = reg.new_dependency(ObjectType::Slot, "301", "rffRelated").unwrap();

        assert_eq!(get_row_action(&reg, &ctx(None), &slot).unwrap(), RowAction::Modified);

        let mut id_map = IdMap::new("source");
        id_map.add_mapping(IdMapping::new_object(
            IdMapKey::new("301", ObjectType::Slot),
            "rffRelated",
        ));
        let mut ctx = ctx(Some(id_map));
        assert_eq!(get_row_action(&reg, &ctx, &slot).unwrap(), RowAction::Created);
        assert!(matches!(
            target_id_for(&reg, &ctx, &slot),
            Err(DeployError::IncompleteIdMapping { .. })
        ));

        mark_installed(&reg, &mut ctx, &slot).unwrap();
        assert_eq!(get_row_action(&reg, &ctx, &slot).unwrap(), RowAction::Modified);
    }

    #[test]
    fn parent_scoped_reservation_uses_the_parent_target() {
        let memory = MemoryServices::new();
        memory.relational.seed_next_id("STATES", Some("300"), 10).unwrap();
        let reg = HandlerRegistry::with_defaults(memory.services(), DeployConfig::default()).unwrap();

        let mut state = reg.new_dependency(ObjectType::WorkflowState, "5-2", "Public").unwrap();
        state.set_parent("5", ObjectType::Workflow);

        let mut id_map = IdMap::new("source");
        id_map.add_mapping(IdMapping::existing(
            IdMapKey::new("5", ObjectType::Workflow),
            "Standard Workflow",
            "300",
            "Standard Workflow",
        ));
        let state_key = dependency_key(&reg, &state).unwrap();
        id_map.add_mapping(IdMapping::new_object(state_key.clone(), "Public"));

        reserve_target_id(&reg, &state, &mut id_map).unwrap();
        assert_eq!(id_map.get_mapping(&state_key).unwrap().target_id(), Some("10"));
    }
}
