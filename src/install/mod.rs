//! Package export and install drivers
//!
//! - `tree`: expansion of root dependencies into a dependency forest
//! - `plan`: install ordering, deferred handlers last
//! - `planner`: id map entries and target ids for new objects
//! - `installer`: the install run and its report
//! - `exporter`: packaging a forest into an archive

pub mod exporter;
pub mod installer;
pub mod plan;
pub mod planner;
pub mod tree;

pub use exporter::PackageExporter;
pub use installer::{InstallReport, InstallResult, InstallStatus, PackageInstaller};
pub use plan::InstallPlan;
pub use planner::plan_id_mappings;
pub use tree::DependencyTreeBuilder;
