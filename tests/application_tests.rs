//! Stylesheet discovery and locked application file installs

mod common;

use common::{Server, import_ctx, token};
use msm_deploy::services::ObjectStore;
use msm_deploy::{DependencyType, InstallStatus, ObjectType};

const BRIEF_XSL: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:include href="file:rx_resources/stylesheets/rx_Globals.xsl"/>
  <xsl:variable name="rxRoot" select="'/Rhythmyx'"/>
  <xsl:template match="/">
    <img src="{concat($rxRoot, '/sys_resources/images/icon.gif')}"/>
    <xsl:call-template name="psx-global-template"/>
  </xsl:template>
</xsl:stylesheet>"#;

fn seed_stylesheets(server: &Server) {
    let store = &server.memory.object_store;
    store
        .save_application("sys_resources", "<PSXApplication name=\"sys_resources\"/>")
        .unwrap();
    store
        .save_application("rx_resources", "<PSXApplication name=\"rx_resources\"/>")
        .unwrap();
    store
        .put_application_file("rx_resources", "stylesheets/brief.xsl", BRIEF_XSL)
        .unwrap();
    store
        .put_application_file(
            "rx_resources",
            "stylesheets/rx_Globals.xsl",
            "<xsl:stylesheet version=\"1.0\"/>",
        )
        .unwrap();
}

#[test]
fn stylesheet_children_cover_includes_globals_and_concat_paths() {
    let server = Server::new();
    seed_stylesheets(&server);
    let dep = server.dependency(ObjectType::Stylesheet, "rx_resources/stylesheets/brief.xsl");

    let children = server.reg.get_child_dependencies(&token(), &dep).unwrap();
    let keys: Vec<String> = children.iter().map(|c| c.key()).collect();
    assert!(keys.contains(&"Stylesheet-rx_resources/stylesheets/rx_Globals.xsl".to_string()));
    assert!(keys.contains(
        &"Stylesheet-rx_resources/stylesheets/globaltemplates/psx-global-template.xsl".to_string()
    ));

    let resources = children
        .iter()
        .find(|c| c.object_type == ObjectType::Application)
        .unwrap();
    assert_eq!(resources.dependency_id, "sys_resources");
    assert_eq!(resources.dependency_type, DependencyType::System);
    assert!(!resources.is_included);
}

#[test]
fn failed_file_save_releases_the_lock_once() {
    let source = Server::new();
    seed_stylesheets(&source);
    let archive = source.export(&[(ObjectType::Stylesheet, "rx_resources/stylesheets/rx_Globals.xsl")]);

    let target = Server::new();
    target.memory.object_store.fail_file_saves(true);
    let (mut ctx, log) = import_ctx(None);
    let report = target.install(&archive, &mut ctx);

    let result = report
        .result_for("Stylesheet-rx_resources/stylesheets/rx_Globals.xsl")
        .unwrap();
    assert!(matches!(result.status, InstallStatus::Failed { .. }));
    assert_eq!(target.memory.object_store.release_count(), 1);
    assert_eq!(target.memory.object_store.held_locks().unwrap(), 0);
    assert!(log.entries().unwrap().is_empty());
}

#[test]
fn stylesheet_install_writes_the_file_under_its_application() {
    let source = Server::new();
    seed_stylesheets(&source);
    let archive = source.export(&[(ObjectType::Stylesheet, "rx_resources/stylesheets/rx_Globals.xsl")]);

    let target = Server::new();
    let (mut ctx, log) = import_ctx(None);
    let report = target.install(&archive, &mut ctx);
    assert!(report.is_success(), "{:?}", report);

    let data = target
        .memory
        .object_store
        .load_application_file("rx_resources", "stylesheets/rx_Globals.xsl")
        .unwrap();
    assert_eq!(data, b"<xsl:stylesheet version=\"1.0\"/>");
    assert_eq!(target.memory.object_store.release_count(), 1);
    let entries = log.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].element_type, "FILE");
}

const LINKING_APP: &str = r#"<PSXApplication name="rffSearch">
  <PSXExtensionCall>
    <name>Java/global/percussion/generic/sys_MakeAbsLink</name>
    <PSXExtensionParamValue><value><PSXHtmlParameter>
      <text>../rffBrief/brief.html</text>
    </PSXHtmlParameter></value></PSXExtensionParamValue>
  </PSXExtensionCall>
  <PSXExtensionCall>
    <name>Java/global/percussion/generic/sys_FormatDate</name>
    <PSXExtensionParamValue><value><PSXHtmlParameter>
      <text>../rffPress/press.html</text>
    </PSXHtmlParameter></value></PSXExtensionParamValue>
  </PSXExtensionCall>
</PSXApplication>"#;

#[test]
fn link_exit_parameters_name_application_children() {
    let server = Server::new();
    let store = &server.memory.object_store;
    store.save_application("rffSearch", LINKING_APP).unwrap();
    store
        .save_application("rffBrief", "<PSXApplication name=\"rffBrief\"/>")
        .unwrap();
    store
        .save_application("rffPress", "<PSXApplication name=\"rffPress\"/>")
        .unwrap();

    let dep = server.dependency(ObjectType::Application, "rffSearch");
    let children = server.reg.get_child_dependencies(&token(), &dep).unwrap();
    let apps: Vec<&str> = children
        .iter()
        .filter(|c| c.object_type == ObjectType::Application)
        .map(|c| c.dependency_id.as_str())
        .collect();
    assert_eq!(apps, vec!["rffBrief"]);
}

#[test]
fn application_document_is_saved_under_its_lock() {
    let source = Server::new();
    source
        .memory
        .object_store
        .save_application("rffBrief", "<PSXApplication name=\"rffBrief\"/>")
        .unwrap();
    let archive = source.export(&[(ObjectType::Application, "rffBrief")]);

    let target = Server::new();
    let (mut ctx, log) = import_ctx(None);
    let report = target.install(&archive, &mut ctx);
    assert!(report.is_success(), "{:?}", report);

    assert!(target.memory.object_store.application_exists("rffBrief").unwrap());
    assert_eq!(target.memory.object_store.release_count(), 1);
    assert_eq!(target.memory.object_store.held_locks().unwrap(), 0);
    assert_eq!(log.entries().unwrap().len(), 1);
}
