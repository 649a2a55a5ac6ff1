//! Install driver tests: reinstall, id mapping, ordering and dangling
//! associations

mod common;

use common::{Server, empty_id_map, import_ctx, token};
use msm_deploy::handler::id_mapping::{transform_id, transform_optional};
use msm_deploy::models::{
    ContentType, IdMap, IdMapKey, IdMapping, Slot, Template,
};
use msm_deploy::services::{DesignStore, ObjectStore};
use msm_deploy::{DeployError, InstallPlan, ObjectType, RowAction};

fn seed_template_with_slot(source: &Server) {
    source
        .memory
        .slots
        .insert(Slot::new(301, "rffRelated"))
        .unwrap();
    let mut template = Template::new(501, "rffSnTitle");
    template.slot_ids = vec![301];
    source.memory.templates.insert(template).unwrap();
}

#[test]
fn reinstall_with_same_id_map_modifies_without_duplicates() {
    let source = Server::new();
    seed_template_with_slot(&source);
    let archive = source.export(&[(ObjectType::Template, "501")]);

    let target = Server::new();
    target
        .memory
        .relational
        .seed_next_id("SLOTS", None, 900)
        .unwrap();
    target
        .memory
        .relational
        .seed_next_id("TEMPLATES", None, 700)
        .unwrap();

    let (mut ctx, log) = import_ctx(Some(empty_id_map()));
    let report = target.install(&archive, &mut ctx);
    assert!(report.is_success(), "{:?}", report);
    assert_eq!(report.order(), vec!["Slot-301", "Template-501"]);

    let installed = target.memory.templates.find(700).unwrap().unwrap();
    assert_eq!(installed.name, "rffSnTitle");
    assert_eq!(installed.slot_ids, vec![900]);
    assert!(target.memory.slots.find(900).unwrap().is_some());
    let first: Vec<RowAction> = log.entries().unwrap().iter().map(|e| e.action).collect();
    assert_eq!(first, vec![RowAction::Created, RowAction::Created]);

    let id_map = ctx.take_id_map().unwrap();
    let (mut again, log) = import_ctx(Some(id_map));
    let report = target.install(&archive, &mut again);
    assert!(report.is_success());

    assert_eq!(target.memory.templates.len().unwrap(), 1);
    assert_eq!(target.memory.slots.len().unwrap(), 1);
    let second: Vec<RowAction> = log.entries().unwrap().iter().map(|e| e.action).collect();
    assert_eq!(second, vec![RowAction::Modified, RowAction::Modified]);
    assert_eq!(
        target.memory.templates.find(700).unwrap().unwrap().slot_ids,
        vec![900]
    );
}

#[test]
fn existing_mapping_targets_the_mapped_object() {
    let source = Server::new();
    seed_template_with_slot(&source);
    let archive = source.export(&[(ObjectType::Template, "501")]);

    let target = Server::new();
    target
        .memory
        .slots
        .insert(Slot::new(42, "rffRelatedItems"))
        .unwrap();

    let mut id_map = empty_id_map();
    id_map.add_mapping(IdMapping::existing(
        IdMapKey::new("301", ObjectType::Slot),
        "rffRelated",
        "42",
        "rffRelatedItems",
    ));
    let id_map = IdMap::from_json(&id_map.to_json().unwrap()).unwrap();

    let (mut ctx, log) = import_ctx(Some(id_map));
    let report = target.install(&archive, &mut ctx);
    assert!(report.is_success(), "{:?}", report);

    assert_eq!(target.memory.slots.len().unwrap(), 1);
    assert_eq!(target.memory.slots.find(42).unwrap().unwrap().name, "rffRelated");
    let slot_entries = log.entries_for("Slot-301").unwrap();
    assert_eq!(slot_entries[0].action, RowAction::Modified);
    assert_eq!(slot_entries[0].element_id, "42");

    let template = target.memory.templates.list().unwrap().pop().unwrap();
    assert_eq!(template.slot_ids, vec![42]);
    assert_eq!(log.entries_for("Template-501").unwrap()[0].action, RowAction::Created);
}

#[test]
fn missing_mapping_is_an_error_only_for_strict_transforms() {
    let target = Server::new();
    let (ctx, _) = import_ctx(Some(empty_id_map()));

    let err = transform_id(&target.reg, &ctx, ObjectType::Slot, "301", None).unwrap_err();
    assert!(matches!(
        err,
        DeployError::MissingIdMapping { object_type: ObjectType::Slot, .. }
    ));
    assert_eq!(
        transform_optional(&target.reg, &ctx, ObjectType::Slot, "301", None).unwrap(),
        None
    );

    let (no_map, _) = import_ctx(None);
    assert_eq!(
        transform_id(&target.reg, &no_map, ObjectType::Slot, "301", None).unwrap(),
        "301"
    );
}

#[test]
fn dangling_associations_are_dropped_with_a_warning() {
    let source = Server::new();
    source
        .memory
        .slots
        .insert(Slot::new(301, "rffRelated"))
        .unwrap();
    let mut template = Template::new(501, "rffSnTitle");
    template.slot_ids = vec![301, 999];
    source.memory.templates.insert(template).unwrap();
    let archive = source.export(&[(ObjectType::Template, "501")]);

    let target = Server::new();
    let (mut ctx, _) = import_ctx(None);
    let report = target.install(&archive, &mut ctx);
    assert!(report.is_success());

    let installed = target.memory.templates.find(501).unwrap().unwrap();
    assert_eq!(installed.slot_ids, vec![301]);
    assert!(report.warnings.iter().any(|w| w.contains("999")));
}

#[test]
fn deferred_dependencies_install_last() {
    let source = Server::new();
    common::seed_workflow(&source, "5", "Standard Workflow", &[("1", "Draft")], &[]);
    source
        .memory
        .object_store
        .save_application("rffBrief", "<PSXApplication name=\"rffBrief\"/>")
        .unwrap();
    let mut content_type = ContentType::new(10, "rffBrief", "rffBrief");
    content_type.default_workflow_id = Some(5);
    content_type.workflow_ids = vec![5];
    source.memory.content_types.insert(content_type).unwrap();

    let tok = token();
    let tree = msm_deploy::PackageExporter::new(&source.reg, &tok)
        .build_tree(vec![source.dependency(ObjectType::ContentType, "10")])
        .unwrap();
    let plan = InstallPlan::from_forest(&source.reg, &tree).unwrap();
    let deferred: Vec<String> = plan.deferred().iter().map(|d| d.key()).collect();
    assert_eq!(deferred, vec!["ContentEditor-rffBrief", "ContentType-10"]);
    assert!(
        plan.non_deferred()
            .iter()
            .any(|d| d.key() == "Workflow-5")
    );

    let archive = source.export(&[(ObjectType::ContentType, "10")]);
    let target = Server::new();
    let (mut ctx, _) = import_ctx(None);
    let report = target.install(&archive, &mut ctx);
    assert!(report.is_success(), "{:?}", report);
    assert_eq!(
        report.order(),
        vec!["Workflow-5", "ContentEditor-rffBrief", "ContentType-10"]
    );

    let installed = target.memory.content_types.find(10).unwrap().unwrap();
    assert_eq!(installed.default_workflow_id, Some(5));
    assert!(installed.enabled);
    assert!(target.memory.object_store.application_exists("rffBrief").unwrap());
}
