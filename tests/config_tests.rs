//! Configuration file loading

mod common;

use common::Server;
use msm_deploy::DeployConfig;
use msm_deploy::config::CONFIG_FILENAME;
use msm_deploy::models::{DisplayFormat, Search};
use msm_deploy::services::DesignStore;
use msm_deploy::ObjectType;
use std::fs;
use tempfile::tempdir;

#[test]
fn loads_config_file_from_directory() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILENAME),
        r#"
[locking]
timeout_secs = 5
steal_on_timeout = false

[paths]
server_root = "CMS"
system_prefixes = ["sys_", "psx_"]

[global_templates]
dispatcher = "site-global"
"#,
    )
    .unwrap();

    let config = DeployConfig::load(dir.path()).unwrap();
    assert_eq!(config.locking.timeout_secs, 5);
    assert!(!config.locking.steal_on_timeout);
    assert_eq!(config.paths.server_root, "CMS");
    assert!(config.is_system_name("psx_Main"));
    assert_eq!(config.global_templates.dispatcher, "site-global");
    assert_eq!(config.global_templates.legacy_suffix, "_GlobalTemplate");

    let reparsed = DeployConfig::parse(&config.to_toml().unwrap()).unwrap();
    assert_eq!(reparsed.paths.system_prefixes, config.paths.system_prefixes);
}

#[test]
fn configured_default_display_format_is_the_search_fallback() {
    let mut config = DeployConfig::default();
    config.defaults.display_format = "Simple".to_string();

    let source = Server::new();
    source
        .memory
        .display_formats
        .insert(DisplayFormat::new(3, "Detailed"))
        .unwrap();
    let mut search = Search::new(40, "Recent Briefs");
    search.display_format_id = Some(3);
    source.memory.searches.insert(search).unwrap();
    let mut archive = source.export(&[(ObjectType::Search, "40")]);
    // install the search without its display format
    let mut descriptor = archive.descriptor().to_vec();
    for root in &mut descriptor {
        for child in root.children.iter_mut().flatten() {
            child.is_included = false;
        }
    }
    archive.set_descriptor(descriptor);

    let target = Server::with_config(config);
    target
        .memory
        .display_formats
        .insert(DisplayFormat::new(1, "Basic"))
        .unwrap();
    target
        .memory
        .display_formats
        .insert(DisplayFormat::new(2, "Simple"))
        .unwrap();

    let (mut ctx, _) = common::import_ctx(None);
    let report = target.install(&archive, &mut ctx);
    assert!(report.is_success(), "{:?}", report);

    let installed = target.memory.searches.find(40).unwrap().unwrap();
    assert_eq!(installed.display_format_id, Some(2));
    assert_eq!(installed.display_format_name.as_deref(), Some("Simple"));
    assert!(report.warnings.iter().any(|w| w.contains("Simple")));
}
