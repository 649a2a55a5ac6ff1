//! Folder installs: missing ancestors and dangling associations

mod common;

use common::{Server, import_ctx};
use msm_deploy::models::{DisplayFormat, Folder, FolderPath};
use msm_deploy::services::FolderStore;
use msm_deploy::{InstallOutcome, ObjectType, RowAction};

const NEWS: &str = "/Sites/Corporate/News";

#[test]
fn folder_install_creates_ancestors_and_drops_missing_community() {
    let source = Server::new();
    let path = FolderPath::parse(NEWS);
    source.memory.folders.create_all(&path).unwrap();
    let mut news = Folder::new("News");
    news.community_id = Some(10);
    news.display_format_id = Some(70);
    news.description = Some("Press releases".to_string());
    source.memory.folders.save_folder(&path, &news).unwrap();
    let archive = source.export(&[(ObjectType::Folder, NEWS)]);
    let dep = source.dependency(ObjectType::Folder, NEWS);

    let target = Server::new();
    target
        .memory
        .display_formats
        .insert(DisplayFormat::new(70, "Detailed"))
        .unwrap();

    let (mut ctx, log) = import_ctx(None);
    let outcome = target.install_one(&archive, &dep, &mut ctx).unwrap();
    assert_eq!(outcome, InstallOutcome::Installed);

    let folders = &target.memory.folders;
    let sites = folders.find_folder(&FolderPath::parse("/Sites")).unwrap().unwrap();
    assert_eq!(sites, Folder::new("Sites"));
    assert!(
        folders
            .find_folder(&FolderPath::parse("/Sites/Corporate"))
            .unwrap()
            .is_some()
    );

    let installed = folders.find_folder(&path).unwrap().unwrap();
    assert_eq!(installed.name, "News");
    assert_eq!(installed.community_id, None);
    assert_eq!(installed.display_format_id, Some(70));
    assert_eq!(installed.description.as_deref(), Some("Press releases"));
    assert!(
        ctx.warnings().iter().any(|w| w.contains("community 10")),
        "{:?}",
        ctx.warnings()
    );

    let entries = log.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].element_id, NEWS);
    assert_eq!(entries[0].action, RowAction::Created);

    let (mut again, log) = import_ctx(None);
    target.install_one(&archive, &dep, &mut again).unwrap();
    assert_eq!(log.entries().unwrap()[0].action, RowAction::Modified);
}

#[test]
fn root_folder_is_not_a_dependency() {
    let server = Server::new();
    let root = server
        .reg
        .get_dependency(&common::token(), ObjectType::Folder, "/")
        .unwrap();
    assert!(root.is_none());
    assert!(FolderPath::parse("").names().is_empty());
}
