//! MSM Deploy Core - dependency discovery and package installation for
//! multi-server CMS deployments
//!
//! Provides:
//! - Dependency handlers per object type (discovery, export, install)
//! - Id maps translating source server ids to target server ids
//! - Install ordering and the install driver
//! - Collaborator traits for the backing stores, with in-memory implementations
//! - Configuration loading

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod install;
pub mod models;
pub mod services;
pub mod xml;

// Re-export commonly used types
pub use config::DeployConfig;
pub use context::{ImportCtx, RepositoryInfo};
pub use error::{DeployError, DeployResult};
pub use handler::{DependencyHandler, HandlerRegistry, InstallOutcome};
pub use install::{
    DependencyTreeBuilder, InstallPlan, InstallReport, InstallResult, InstallStatus,
    PackageExporter, PackageInstaller,
};

// Re-export models
pub use models::enums::*;
pub use models::{Dependency, DependencyFile, ExportedFile, IdMap, IdMapKey, IdMapping};

// Re-export collaborators
pub use services::{
    ArchiveHandler, MemoryArchive, MemoryServices, SecurityToken, Services, TransactionLog,
};
