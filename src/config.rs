//! Deployment configuration file support
//!
//! Handles parsing of `.msm-deploy.toml` configuration files and
//! environment variable overrides.

use crate::error::{DeployError, DeployResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".msm-deploy.toml";

/// Environment variable for the lock wait in seconds
pub const ENV_LOCK_TIMEOUT_SECS: &str = "MSM_DEPLOY_LOCK_TIMEOUT_SECS";

/// Environment variable for stealing locks after the wait expires
pub const ENV_STEAL_LOCKS: &str = "MSM_DEPLOY_STEAL_LOCKS";

/// Environment variable for the server root path segment
pub const ENV_SERVER_ROOT: &str = "MSM_DEPLOY_SERVER_ROOT";

/// Environment variable for the fallback display format name
pub const ENV_DEFAULT_DISPLAY_FORMAT: &str = "MSM_DEPLOY_DEFAULT_DISPLAY_FORMAT";

/// Environment variable for the fallback workflow name
pub const ENV_DEFAULT_WORKFLOW: &str = "MSM_DEPLOY_DEFAULT_WORKFLOW";

/// Object store locking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockingSection {
    /// Seconds to wait for an application file lock
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Take over a held lock once the wait expires
    #[serde(default = "default_true")]
    pub steal_on_timeout: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for LockingSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            steal_on_timeout: true,
        }
    }
}

/// Server path conventions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsSection {
    /// Leading path segment stripped from server-absolute URLs
    #[serde(default = "default_server_root")]
    pub server_root: String,

    /// Name prefixes of objects shipped with every server
    #[serde(default = "default_system_prefixes")]
    pub system_prefixes: Vec<String>,
}

fn default_server_root() -> String {
    "Rhythmyx".to_string()
}

fn default_system_prefixes() -> Vec<String> {
    vec!["sys_".to_string()]
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            server_root: default_server_root(),
            system_prefixes: default_system_prefixes(),
        }
    }
}

/// Fallbacks used when a packaged reference cannot be resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsSection {
    #[serde(default = "default_display_format")]
    pub display_format: String,

    /// Global default workflow on the target
    #[serde(default = "default_workflow")]
    pub workflow: String,
}

fn default_display_format() -> String {
    "Default".to_string()
}

fn default_workflow() -> String {
    "Standard Workflow".to_string()
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            display_format: default_display_format(),
            workflow: default_workflow(),
        }
    }
}

/// Global template conventions for stylesheets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalTemplatesSection {
    /// Named template that dispatches to the configured global template
    #[serde(default = "default_dispatcher")]
    pub dispatcher: String,

    /// Suffix of legacy global template names
    #[serde(default = "default_legacy_suffix")]
    pub legacy_suffix: String,

    /// Application holding global template stylesheets
    #[serde(default = "default_application")]
    pub application: String,

    /// Directory within that application
    #[serde(default = "default_directory")]
    pub directory: String,
}

fn default_dispatcher() -> String {
    "psx-global-template".to_string()
}

fn default_legacy_suffix() -> String {
    "_GlobalTemplate".to_string()
}

fn default_application() -> String {
    "rx_resources".to_string()
}

fn default_directory() -> String {
    "stylesheets/globaltemplates".to_string()
}

impl Default for GlobalTemplatesSection {
    fn default() -> Self {
        Self {
            dispatcher: default_dispatcher(),
            legacy_suffix: default_legacy_suffix(),
            application: default_application(),
            directory: default_directory(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.msm-deploy.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeployConfig {
    #[serde(default)]
    pub locking: LockingSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub defaults: DefaultsSection,

    #[serde(default)]
    pub global_templates: GlobalTemplatesSection,
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a directory
    ///
    /// Looks for `.msm-deploy.toml` in the directory and falls back to
    /// defaults if not found.
    pub fn load(dir: &Path) -> DeployResult<Self> {
        let config_path = dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| DeployError::Config(format!("Failed to read config: {}", e)))?;
            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> DeployResult<Self> {
        toml::from_str(content)
            .map_err(|e| DeployError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> DeployResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DeployError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secs) = std::env::var(ENV_LOCK_TIMEOUT_SECS)
            && let Ok(secs) = secs.parse()
        {
            self.locking.timeout_secs = secs;
        }

        if let Ok(steal) = std::env::var(ENV_STEAL_LOCKS)
            && let Ok(steal) = steal.parse()
        {
            self.locking.steal_on_timeout = steal;
        }

        if let Ok(root) = std::env::var(ENV_SERVER_ROOT) {
            self.paths.server_root = root;
        }

        if let Ok(name) = std::env::var(ENV_DEFAULT_DISPLAY_FORMAT) {
            self.defaults.display_format = name;
        }

        if let Ok(name) = std::env::var(ENV_DEFAULT_WORKFLOW) {
            self.defaults.workflow = name;
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.locking.timeout_secs)
    }

    /// True when a name carries one of the system prefixes
    pub fn is_system_name(&self, name: &str) -> bool {
        self.paths
            .system_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = DeployConfig::new();
        assert_eq!(config.lock_timeout(), Duration::from_secs(30));
        assert!(config.locking.steal_on_timeout);
        assert_eq!(config.paths.server_root, "Rhythmyx");
        assert!(config.is_system_name("sys_resources"));
        assert!(!config.is_system_name("rx_resources"));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[locking]
timeout_secs = 5

[defaults]
display_format = "Simple"
"#;
        let config = DeployConfig::parse(toml).unwrap();
        assert_eq!(config.locking.timeout_secs, 5);
        assert!(config.locking.steal_on_timeout);
        assert_eq!(config.defaults.display_format, "Simple");
        assert_eq!(config.defaults.workflow, "Standard Workflow");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = DeployConfig::load(dir.path()).unwrap();
        assert_eq!(config.global_templates.application, "rx_resources");
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let err = DeployConfig::parse("[locking\n").unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }
}
