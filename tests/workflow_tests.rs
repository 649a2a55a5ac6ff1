//! Workflow install: table cascade, id remapping and role creation

mod common;

use common::{Server, empty_id_map, import_ctx, seed_transition, seed_workflow};
use msm_deploy::handler::workflow::{ROLES_TABLE, STATES_TABLE, TRANSITIONS_TABLE, WORKFLOW_TABLE};
use msm_deploy::models::SelectFilter;
use msm_deploy::services::RelationalStore;
use msm_deploy::{DeployError, IdMapKey, IdMapping, ObjectType, RowAction};

fn target_with_allocators() -> Server {
    let target = Server::new();
    let relational = &target.memory.relational;
    relational.seed_next_id("WORKFLOWAPPS", None, 300).unwrap();
    relational.seed_next_id("STATES", Some("300"), 10).unwrap();
    relational.seed_next_id("TRANSITIONS", Some("300"), 20).unwrap();
    // role ids are per workflow, so workflow 9's role 4 does not move the block
    seed_workflow(&target, "9", "Simple Workflow", &[("1", "Public")], &[("4", "Admin")]);
    target
}

fn rows_of(server: &Server, table: &str, workflow: &str) -> Vec<msm_deploy::models::Row> {
    server
        .memory
        .relational
        .select(table, Some(&SelectFilter::equals("WORKFLOWAPPID", workflow)))
        .unwrap()
}

#[test]
fn workflow_tables_cascade_to_target_ids() {
    let source = Server::new();
    seed_workflow(
        &source,
        "5",
        "Standard Workflow",
        &[("1", "Draft"), ("2", "Public")],
        &[("7", "Editor")],
    );
    let archive = source.export(&[(ObjectType::Workflow, "5")]);

    let target = target_with_allocators();
    let (mut ctx, log) = import_ctx(Some(empty_id_map()));
    let report = target.install(&archive, &mut ctx);
    assert!(report.is_success(), "{:?}", report);

    let workflow = rows_of(&target, WORKFLOW_TABLE, "300");
    assert_eq!(workflow.len(), 1);
    assert_eq!(workflow[0]["INITIALSTATEID"], "10");

    let mut states: Vec<(String, String)> = rows_of(&target, STATES_TABLE, "300")
        .into_iter()
        .map(|r| (r["STATEID"].clone(), r["STATENAME"].clone()))
        .collect();
    states.sort();
    assert_eq!(
        states,
        vec![
            ("10".to_string(), "Draft".to_string()),
            ("11".to_string(), "Public".to_string())
        ]
    );

    let roles = rows_of(&target, ROLES_TABLE, "300");
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0]["ROLEID"], "1");
    assert!(
        target
            .memory
            .roles
            .role_names()
            .unwrap()
            .contains(&"Editor".to_string())
    );

    let entries = log.entries().unwrap();
    let tables: Vec<&str> = entries.iter().map(|e| e.element_name.as_str()).collect();
    assert_eq!(tables, vec![WORKFLOW_TABLE, STATES_TABLE, ROLES_TABLE]);
    assert!(entries.iter().all(|e| e.action == RowAction::Created));
    assert!(entries.iter().all(|e| e.element_id == "300"));
    assert!(rows_of(&target, STATES_TABLE, "5").is_empty());
}

#[test]
fn reinstall_replaces_child_rows() {
    let source = Server::new();
    seed_workflow(
        &source,
        "5",
        "Standard Workflow",
        &[("1", "Draft"), ("2", "Public")],
        &[("7", "Editor")],
    );
    seed_transition(&source, "5", "3", "1", "2");
    let archive = source.export(&[(ObjectType::Workflow, "5")]);

    let target = target_with_allocators();
    let (mut ctx, _) = import_ctx(Some(empty_id_map()));
    assert!(target.install(&archive, &mut ctx).is_success());

    let transitions = rows_of(&target, TRANSITIONS_TABLE, "300");
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0]["TRANSITIONID"], "20");
    assert_eq!(transitions[0]["TRANSITIONFROMSTATEID"], "10");
    assert_eq!(transitions[0]["TRANSITIONTOSTATEID"], "11");

    let (mut again, log) = import_ctx(ctx.take_id_map());
    let report = target.install(&archive, &mut again);
    assert!(report.is_success(), "{:?}", report);

    assert_eq!(rows_of(&target, STATES_TABLE, "300").len(), 2);
    assert_eq!(rows_of(&target, TRANSITIONS_TABLE, "300").len(), 1);
    assert_eq!(rows_of(&target, ROLES_TABLE, "300").len(), 1);
    assert_eq!(rows_of(&target, ROLES_TABLE, "9").len(), 1);
    assert!(
        log.entries()
            .unwrap()
            .iter()
            .all(|e| e.action == RowAction::Modified)
    );
}

fn states_of(server: &Server, workflow: &str) -> Vec<(String, String)> {
    let mut states: Vec<(String, String)> = rows_of(server, STATES_TABLE, workflow)
        .into_iter()
        .map(|r| (r["STATEID"].clone(), r["STATENAME"].clone()))
        .collect();
    states.sort();
    states
}

#[test]
fn unmapped_state_fails_before_target_rows_change() {
    let source = Server::new();
    seed_workflow(
        &source,
        "5",
        "Standard Workflow",
        &[("1", "Draft"), ("2", "Public")],
        &[("7", "Editor")],
    );
    seed_transition(&source, "5", "3", "1", "2");
    let archive = source.export(&[(ObjectType::Workflow, "5")]);
    let workflow = source.dependency(ObjectType::Workflow, "5");

    let target = Server::new();
    seed_workflow(&target, "300", "Standard Workflow", &[("10", "Draft")], &[("1", "Editor")]);

    let mut id_map = empty_id_map();
    id_map.add_mapping(IdMapping::existing(
        IdMapKey::new("5", ObjectType::Workflow),
        "Standard Workflow",
        "300",
        "Standard Workflow",
    ));
    let (mut ctx, log) = import_ctx(Some(id_map));

    let err = target.install_one(&archive, &workflow, &mut ctx).unwrap_err();
    assert!(
        matches!(
            err,
            DeployError::MissingIdMapping { object_type: ObjectType::WorkflowState, .. }
        ),
        "{:?}",
        err
    );

    assert_eq!(states_of(&target, "300"), vec![("10".to_string(), "Draft".to_string())]);
    assert_eq!(rows_of(&target, ROLES_TABLE, "300").len(), 1);
    assert!(log.entries().unwrap().is_empty());
}

#[test]
fn role_blocks_are_allocated_per_workflow() {
    let source = Server::new();
    seed_workflow(
        &source,
        "5",
        "Standard Workflow",
        &[("1", "Draft")],
        &[("7", "Editor"), ("8", "Reviewer")],
    );
    let archive = source.export(&[(ObjectType::Workflow, "5")]);

    let target = target_with_allocators();
    seed_workflow(&target, "12", "Other Workflow", &[("1", "Draft")], &[("40", "QA")]);

    let (mut ctx, _) = import_ctx(Some(empty_id_map()));
    assert!(target.install(&archive, &mut ctx).is_success());

    let mut roles: Vec<(String, String)> = rows_of(&target, ROLES_TABLE, "300")
        .into_iter()
        .map(|r| (r["ROLEID"].clone(), r["ROLENAME"].clone()))
        .collect();
    roles.sort();
    assert_eq!(
        roles,
        vec![
            ("1".to_string(), "Editor".to_string()),
            ("2".to_string(), "Reviewer".to_string())
        ]
    );
    assert_eq!(rows_of(&target, ROLES_TABLE, "12")[0]["ROLEID"], "40");
}
