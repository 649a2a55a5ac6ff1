//! Id mapping planner
//!
//! Before anything is installed every packaged dependency, and every
//! parent-scoped child of one, gets an id map entry. Missing entries are created as new
//! objects and handed a target id by their handler. Parent-scoped types are
//! planned after all others so their parent's target id is known.

use crate::error::DeployResult;
use crate::handler::HandlerRegistry;
use crate::handler::id_mapping::dependency_key;
use crate::models::{Dependency, DependencyType, IdMap, IdMapping};
use crate::services::ArchiveHandler;
use std::collections::HashSet;
use tracing::{debug, info};

/// True when the dependency is included in the package and has files in it
pub fn is_packaged(archive: &dyn ArchiveHandler, dep: &Dependency) -> DeployResult<bool> {
    if !dep.is_included || dep.is_association {
        return Ok(false);
    }
    Ok(!archive.get_files(dep)?.is_empty())
}

/// Dependencies that need an id map entry, parent-scoped types last
pub fn mapping_candidates<'a>(
    archive: &dyn ArchiveHandler,
    roots: &'a [Dependency],
) -> DeployResult<Vec<&'a Dependency>> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for root in roots {
        for dep in root.flatten() {
            if !is_packaged(archive, dep)? {
                continue;
            }
            if seen.insert(dep.key()) {
                candidates.push(dep);
            }
            for child in dep.children() {
                if child.dependency_type == DependencyType::Local
                    && child.supports_parent_id
                    && !child.is_association
                    && seen.insert(child.key())
                {
                    candidates.push(child);
                }
            }
        }
    }
    candidates.retain(|d| d.supports_id_mapping);
    candidates.sort_by_key(|d| d.supports_parent_id);
    Ok(candidates)
}

/// Create missing mappings and reserve target ids for new objects
///
/// Returns the number of mappings created.
pub fn plan_id_mappings(
    reg: &HandlerRegistry,
    archive: &dyn ArchiveHandler,
    roots: &[Dependency],
    id_map: &mut IdMap,
) -> DeployResult<usize> {
    let mut created = 0;
    for dep in mapping_candidates(archive, roots)? {
        let key = dependency_key(reg, dep)?;
        if !id_map.contains(&key) {
            debug!("New object mapping for {}", dep.key());
            id_map.add_mapping(IdMapping::new_object(key, dep.display_name.clone()));
            created += 1;
        }
        reg.handler(dep.object_type)?.reserve_new_id(reg, dep, id_map)?;
    }
    info!("Planned {} new id mappings ({} total)", created, id_map.len());
    Ok(created)
}
