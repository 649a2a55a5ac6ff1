//! Shared fixtures for integration tests
//!
//! A `Server` is one set of in-memory stores with a registry over them. Tests
//! seed a source server, export a package from it and install the package on
//! a target server.

#![allow(dead_code)]

use msm_deploy::context::{ImportCtx, RepositoryInfo};
use msm_deploy::handler::workflow::{
    ROLES_TABLE, STATES_TABLE, TRANSITIONS_TABLE, WORKFLOW_TABLE, builtin_schemas,
};
use msm_deploy::models::dependency_data::row;
use msm_deploy::models::{DependencyData, IdMap, IdMapKey, IdMapping, Row};
use msm_deploy::services::{MemoryTransactionLog, RelationalStore};
use msm_deploy::{
    Dependency, DependencyHandler, DeployConfig, DeployResult, HandlerRegistry, InstallOutcome,
    InstallReport, MemoryArchive, MemoryServices, ObjectType, PackageExporter, PackageInstaller,
    SecurityToken,
};
use std::sync::Arc;

pub struct Server {
    pub memory: MemoryServices,
    pub reg: HandlerRegistry,
}

impl Server {
    pub fn new() -> Self {
        Self::with_config(DeployConfig::default())
    }

    pub fn with_config(config: DeployConfig) -> Self {
        let memory = MemoryServices::new();
        let reg = HandlerRegistry::with_defaults(memory.services(), config).unwrap();
        Self { memory, reg }
    }

    pub fn dependency(&self, object_type: ObjectType, id: &str) -> Dependency {
        self.reg
            .get_dependency(&token(), object_type, id)
            .unwrap()
            .unwrap_or_else(|| panic!("{} {} is not seeded", object_type, id))
    }

    /// Export a package rooted at the given objects
    pub fn export(&self, roots: &[(ObjectType, &str)]) -> MemoryArchive {
        let tok = token();
        let roots = roots
            .iter()
            .map(|(object_type, id)| self.dependency(*object_type, id))
            .collect();
        PackageExporter::new(&self.reg, &tok).export(roots).unwrap()
    }

    /// Install a package with the given context
    pub fn install(&self, archive: &MemoryArchive, ctx: &mut ImportCtx) -> InstallReport {
        let tok = token();
        PackageInstaller::new(&self.reg, &tok)
            .install(archive, archive.descriptor(), ctx)
            .unwrap()
    }
}

impl Server {
    /// Install a single packaged dependency through its handler, bypassing
    /// the planner
    pub fn install_one(
        &self,
        archive: &MemoryArchive,
        dep: &Dependency,
        ctx: &mut ImportCtx,
    ) -> DeployResult<InstallOutcome> {
        self.reg
            .handler(dep.object_type)?
            .install_dependency_files(&self.reg, &token(), archive, dep, ctx)
    }
}

pub fn token() -> SecurityToken {
    SecurityToken::new("admin")
}

pub fn source_repository() -> RepositoryInfo {
    RepositoryInfo::new("source", 9992, "rxmaster")
}

pub fn target_repository() -> RepositoryInfo {
    RepositoryInfo::new("target", 9992, "rxmaster")
}

/// Fresh context and the log it writes to
pub fn import_ctx(id_map: Option<IdMap>) -> (ImportCtx, Arc<MemoryTransactionLog>) {
    let log = Arc::new(MemoryTransactionLog::new());
    let ctx = ImportCtx::new(id_map, source_repository(), target_repository(), log.clone());
    (ctx, log)
}

pub fn empty_id_map() -> IdMap {
    IdMap::new(source_repository().repository_key())
}

fn write_rows(server: &Server, table: &str, rows: Vec<Row>) {
    let schema = builtin_schemas()
        .into_iter()
        .find(|s| s.name == table)
        .unwrap();
    server
        .memory
        .relational
        .process_table(&DependencyData::new(schema, rows))
        .unwrap();
}

/// Seed a workflow with states `(id, name)` and roles `(id, name)`
pub fn seed_workflow(
    server: &Server,
    id: &str,
    name: &str,
    states: &[(&str, &str)],
    roles: &[(&str, &str)],
) {
    let initial = states.first().map_or("", |(state, _)| *state);
    write_rows(
        server,
        WORKFLOW_TABLE,
        vec![row([
            ("WORKFLOWAPPID", id),
            ("WORKFLOWAPPNAME", name),
            ("INITIALSTATEID", initial),
        ])],
    );
    write_rows(
        server,
        STATES_TABLE,
        states
            .iter()
            .map(|(state, state_name)| {
                row([("WORKFLOWAPPID", id), ("STATEID", *state), ("STATENAME", *state_name)])
            })
            .collect(),
    );
    write_rows(
        server,
        ROLES_TABLE,
        roles
            .iter()
            .map(|(role, role_name)| {
                row([("WORKFLOWAPPID", id), ("ROLEID", *role), ("ROLENAME", *role_name)])
            })
            .collect(),
    );
}

/// Seed a transition between two states of a workflow
pub fn seed_transition(server: &Server, workflow: &str, id: &str, from: &str, to: &str) {
    write_rows(
        server,
        TRANSITIONS_TABLE,
        vec![row([
            ("WORKFLOWAPPID", workflow),
            ("TRANSITIONID", id),
            ("TRANSITIONLABEL", "Submit"),
            ("TRANSITIONFROMSTATEID", from),
            ("TRANSITIONTOSTATEID", to),
        ])],
    );
}

/// Mapping to an already reserved target id, flagged as a new object
pub fn reserved_mapping(
    object_type: ObjectType,
    source_id: &str,
    target_id: &str,
    name: &str,
) -> IdMapping {
    let mut mapping = IdMapping::new_object(IdMapKey::new(source_id, object_type), name);
    mapping.set_target(target_id, name);
    mapping
}
