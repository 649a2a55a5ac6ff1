//! Package exporter
//!
//! Expands the requested roots and collects the files of every included
//! dependency into an archive whose descriptor is the expanded forest.

use crate::error::DeployResult;
use crate::handler::HandlerRegistry;
use crate::install::tree::DependencyTreeBuilder;
use crate::models::Dependency;
use crate::services::{MemoryArchive, SecurityToken};
use std::collections::HashSet;
use tracing::{debug, info};

pub struct PackageExporter<'a> {
    reg: &'a HandlerRegistry,
    tok: &'a SecurityToken,
}

impl<'a> PackageExporter<'a> {
    pub fn new(reg: &'a HandlerRegistry, tok: &'a SecurityToken) -> Self {
        Self { reg, tok }
    }

    /// Expand roots into the package descriptor
    pub fn build_tree(&self, roots: Vec<Dependency>) -> DeployResult<Vec<Dependency>> {
        DependencyTreeBuilder::new(self.reg, self.tok).build_all(roots)
    }

    /// Expand roots and package every included dependency once
    pub fn export(&self, roots: Vec<Dependency>) -> DeployResult<MemoryArchive> {
        let forest = self.build_tree(roots)?;
        let mut archive = MemoryArchive::new();
        let mut packaged = HashSet::new();

        for root in &forest {
            for dep in root.flatten() {
                if !dep.is_included || dep.is_association || !packaged.insert(dep.key()) {
                    continue;
                }
                let files = self
                    .reg
                    .handler(dep.object_type)?
                    .get_dependency_files(self.reg, self.tok, dep)?;
                debug!("Packaging {} with {} files", dep.key(), files.len());
                for file in files {
                    archive.add_file(dep, file);
                }
            }
        }

        info!(
            "Exported {} dependencies in {} files",
            packaged.len(),
            archive.file_count()
        );
        archive.set_descriptor(forest);
        Ok(archive)
    }
}
