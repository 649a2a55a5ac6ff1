//! Application support: path resolution and locked file writes

use crate::error::{DeployError, DeployResult};
use crate::handler::HandlerRegistry;
use crate::models::{Dependency, ObjectType};
use crate::services::{LockId, SecurityToken};
use tracing::{debug, warn};

/// Split an `app/path/to/file` id into application and relative path
pub fn split_app_path(id: &str) -> DeployResult<(&str, &str)> {
    match id.trim_matches('/').split_once('/') {
        Some((app, path)) if !app.is_empty() && !path.is_empty() => Ok((app, path)),
        _ => Err(DeployError::InvalidArgument(format!(
            "'{}' is not an application file path",
            id
        ))),
    }
}

pub fn is_stylesheet_path(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".xsl")
}

/// Reduce a URL or href to `app[/path]` relative to the server root
///
/// Drops query and fragment, a `file:` scheme, leading `../` and `/`
/// segments and the server root segment. Returns `None` for external URLs
/// and empty results.
pub fn normalize_path(path: &str, server_root: &str) -> Option<String> {
    let mut path = path.trim();
    if let Some(end) = path.find(['?', '#']) {
        path = &path[..end];
    }
    if path.contains("://") {
        return None;
    }
    path = path.strip_prefix("file:").unwrap_or(path);
    loop {
        if let Some(rest) = path.strip_prefix("../") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            break;
        }
    }
    if !server_root.is_empty()
        && let Some(rest) = path.strip_prefix(server_root)
        && let Some(rest) = rest.strip_prefix('/')
    {
        path = rest;
    }
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Resolve a path found in an application or stylesheet to a dependency
///
/// Tries, in order, a stylesheet, a support file and finally the application
/// named by the first path segment. `Ok(None)` when nothing on the server
/// matches.
pub fn get_dep_from_path(
    reg: &HandlerRegistry,
    tok: &SecurityToken,
    path: &str,
) -> DeployResult<Option<Dependency>> {
    let Some(path) = normalize_path(path, &reg.config().paths.server_root) else {
        return Ok(None);
    };
    let (app, file) = match path.split_once('/') {
        Some((app, file)) => (app, Some(file)),
        None => (path.as_str(), None),
    };

    if let Some(file) = file
        && !file.is_empty()
    {
        if is_stylesheet_path(file)
            && let Some(dep) = reg.get_dependency(tok, ObjectType::Stylesheet, &path)?
        {
            return Ok(Some(dep));
        }
        if let Some(dep) = reg.get_dependency(tok, ObjectType::SupportFile, &path)? {
            return Ok(Some(dep));
        }
    }

    let dep = reg.get_dependency(tok, ObjectType::Application, app)?;
    if dep.is_none() {
        debug!("Path {} does not resolve to a dependency", path);
    }
    Ok(dep)
}

/// Run a write against an application file while holding its lock
///
/// The lock is keyed `app-file`. It is released on every path; a failed
/// release is logged and only reported when the write itself succeeded.
pub fn with_application_lock<T, F>(
    reg: &HandlerRegistry,
    app: &str,
    file: &str,
    op: F,
) -> DeployResult<T>
where
    F: FnOnce(LockId) -> DeployResult<T>,
{
    let store = &reg.services().object_store;
    let locking = &reg.config().locking;
    let key = format!("{}-{}", app, file);
    let lock = store.acquire_lock(&key, reg.config().lock_timeout(), locking.steal_on_timeout)?;
    debug!("Acquired lock {}", key);

    let result = op(lock);

    match store.release_lock(&key, lock) {
        Ok(()) => result,
        Err(release_err) => {
            warn!("Failed to release lock {}: {:#}", key, release_err);
            match result {
                Ok(_) => Err(release_err.into()),
                Err(e) => Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_server_paths() {
        assert_eq!(
            normalize_path("/Rhythmyx/sys_resources/images/icon.gif", "Rhythmyx").as_deref(),
            Some("sys_resources/images/icon.gif")
        );
        assert_eq!(
            normalize_path("../rffBrief/brief.html?sys_contentid=1#top", "Rhythmyx").as_deref(),
            Some("rffBrief/brief.html")
        );
        assert_eq!(
            normalize_path("file:rx_resources/stylesheets/a.xsl", "Rhythmyx").as_deref(),
            Some("rx_resources/stylesheets/a.xsl")
        );
        assert_eq!(normalize_path("http://example.com/a", "Rhythmyx"), None);
        assert_eq!(normalize_path("/", "Rhythmyx"), None);
    }

    #[test]
    fn splits_application_file_ids() {
        assert_eq!(
            split_app_path("rx_resources/images/a.gif").unwrap(),
            ("rx_resources", "images/a.gif")
        );
        assert!(split_app_path("rx_resources").is_err());
    }
}
