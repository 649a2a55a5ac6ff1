//! Search installs: display format resolution and the skip when none exists

mod common;

use common::{Server, empty_id_map, import_ctx, reserved_mapping};
use msm_deploy::models::{DisplayFormat, Search};
use msm_deploy::services::DesignStore;
use msm_deploy::{InstallOutcome, InstallStatus, MemoryArchive, ObjectType};

fn export_search(source: &Server) -> MemoryArchive {
    source
        .memory
        .display_formats
        .insert(DisplayFormat::new(70, "Detailed"))
        .unwrap();
    let mut search = Search::new(50, "Recent Briefs");
    search.display_format_id = Some(70);
    source.memory.searches.insert(search).unwrap();
    source.export(&[(ObjectType::Search, "50")])
}

#[test]
fn reserved_display_format_wins_before_it_is_installed() {
    let source = Server::new();
    let archive = export_search(&source);
    let search = source.dependency(ObjectType::Search, "50");

    let target = Server::new();
    target
        .memory
        .display_formats
        .insert(DisplayFormat::new(1, "Default"))
        .unwrap();

    let mut id_map = empty_id_map();
    id_map.add_mapping(reserved_mapping(ObjectType::DisplayFormat, "70", "900", "Detailed"));
    id_map.add_mapping(reserved_mapping(ObjectType::Search, "50", "500", "Recent Briefs"));
    let (mut ctx, _) = import_ctx(Some(id_map));

    let outcome = target.install_one(&archive, &search, &mut ctx).unwrap();
    assert_eq!(outcome, InstallOutcome::Installed);

    let installed = target.memory.searches.find(500).unwrap().unwrap();
    assert_eq!(installed.display_format_id, Some(900));
    assert_eq!(installed.display_format_name.as_deref(), Some("Detailed"));
    assert!(ctx.warnings().is_empty(), "{:?}", ctx.warnings());
}

#[test]
fn unmapped_display_format_on_the_target_keeps_its_id() {
    let source = Server::new();
    let archive = export_search(&source);
    let search = source.dependency(ObjectType::Search, "50");

    let target = Server::new();
    target
        .memory
        .display_formats
        .insert(DisplayFormat::new(70, "Detailed"))
        .unwrap();
    target
        .memory
        .display_formats
        .insert(DisplayFormat::new(1, "Default"))
        .unwrap();

    let mut id_map = empty_id_map();
    id_map.add_mapping(reserved_mapping(ObjectType::Search, "50", "500", "Recent Briefs"));
    let (mut ctx, _) = import_ctx(Some(id_map));

    target.install_one(&archive, &search, &mut ctx).unwrap();
    let installed = target.memory.searches.find(500).unwrap().unwrap();
    assert_eq!(installed.display_format_id, Some(70));
}

#[test]
fn search_is_skipped_when_the_target_has_no_display_format() {
    let source = Server::new();
    let mut archive = export_search(&source);
    let mut descriptor = archive.descriptor().to_vec();
    for root in &mut descriptor {
        for child in root.children.iter_mut().flatten() {
            child.is_included = false;
        }
    }
    archive.set_descriptor(descriptor);

    let target = Server::new();
    let (mut ctx, log) = import_ctx(None);
    let report = target.install(&archive, &mut ctx);

    let result = report.result_for("Search-50").unwrap();
    match &result.status {
        InstallStatus::Skipped { reason } => assert!(reason.contains("No display format")),
        other => panic!("expected a skip, got {:?}", other),
    }
    assert!(report.is_success());
    assert!(target.memory.searches.is_empty().unwrap());
    assert!(log.entries().unwrap().is_empty());
    assert!(report.warnings.iter().any(|w| w.contains("Recent Briefs")));
}
