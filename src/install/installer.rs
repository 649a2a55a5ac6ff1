//! Package installer
//!
//! Drives one install run: plans id mappings, orders the dependencies and
//! installs every packaged one. A failing dependency is recorded and the run
//! moves on; nothing already installed is rolled back.

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::{HandlerRegistry, InstallOutcome};
use crate::install::plan::InstallPlan;
use crate::install::planner::{is_packaged, plan_id_mappings};
use crate::models::{Dependency, ObjectType};
use crate::services::{ArchiveHandler, SecurityToken};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// What happened to one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InstallStatus {
    Installed,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResult {
    pub dependency_key: String,
    pub object_type: ObjectType,
    pub display_name: String,
    #[serde(flatten)]
    pub status: InstallStatus,
}

/// Ledger of one install run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[must_use = "install reports should be checked for failed dependencies"]
pub struct InstallReport {
    pub run_id: Uuid,
    pub results: Vec<InstallResult>,
    pub warnings: Vec<String>,
}

impl InstallReport {
    pub fn installed(&self) -> impl Iterator<Item = &InstallResult> {
        self.results
            .iter()
            .filter(|r| r.status == InstallStatus::Installed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &InstallResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, InstallStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &InstallResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, InstallStatus::Skipped { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn result_for(&self, dependency_key: &str) -> Option<&InstallResult> {
        self.results
            .iter()
            .find(|r| r.dependency_key == dependency_key)
    }

    /// Keys in the order they were installed or attempted
    pub fn order(&self) -> Vec<&str> {
        self.results
            .iter()
            .map(|r| r.dependency_key.as_str())
            .collect()
    }
}

pub struct PackageInstaller<'a> {
    reg: &'a HandlerRegistry,
    tok: &'a SecurityToken,
}

impl<'a> PackageInstaller<'a> {
    pub fn new(reg: &'a HandlerRegistry, tok: &'a SecurityToken) -> Self {
        Self { reg, tok }
    }

    /// Install the packaged dependencies of an expanded forest
    ///
    /// With an id map on the context, missing mappings are planned first.
    /// Planning errors abort the run; install errors are recorded per
    /// dependency.
    pub fn install(
        &self,
        archive: &dyn ArchiveHandler,
        roots: &[Dependency],
        ctx: &mut ImportCtx,
    ) -> DeployResult<InstallReport> {
        if let Some(id_map) = ctx.id_map_mut() {
            plan_id_mappings(self.reg, archive, roots, id_map)?;
        }
        let plan = InstallPlan::from_forest(self.reg, roots)?;

        let mut results = Vec::new();
        for dep in plan.ordered() {
            if !is_packaged(archive, dep)? {
                continue;
            }
            let status = match self.install_one(archive, dep, ctx) {
                Ok(InstallOutcome::Installed) => InstallStatus::Installed,
                Ok(InstallOutcome::Skipped(reason)) => {
                    info!("Skipped {}: {}", dep.key(), reason);
                    InstallStatus::Skipped { reason }
                }
                Err(e) => {
                    warn!("Failed to install {}: {}", dep.key(), e);
                    InstallStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push(InstallResult {
                dependency_key: dep.key(),
                object_type: dep.object_type,
                display_name: dep.display_name.clone(),
                status,
            });
        }

        let report = InstallReport {
            run_id: ctx.run_id(),
            results,
            warnings: ctx.warnings().to_vec(),
        };
        info!(
            "Install run {} finished: {} installed, {} skipped, {} failed",
            report.run_id,
            report.installed().count(),
            report.skipped().count(),
            report.failed().count()
        );
        Ok(report)
    }

    fn install_one(
        &self,
        archive: &dyn ArchiveHandler,
        dep: &Dependency,
        ctx: &mut ImportCtx,
    ) -> DeployResult<InstallOutcome> {
        self.reg
            .handler(dep.object_type)?
            .install_dependency_files(self.reg, self.tok, archive, dep, ctx)
    }
}
