//! Import context
//!
//! State shared by every handler during one install run: the active id map,
//! repository descriptions, the transaction log handle and the counters that
//! must stay consistent across dependencies.

use crate::models::IdMap;
use crate::services::TransactionLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Description of one server repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub server: String,
    pub port: u16,
    pub database: String,
}

impl RepositoryInfo {
    pub fn new(server: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port,
            database: database.into(),
        }
    }

    /// Name used to key id maps for this repository
    pub fn repository_key(&self) -> String {
        format!("{}:{}/{}", self.server, self.port, self.database)
    }
}

/// Per-run install state
pub struct ImportCtx {
    /// Active id map; `None` installs without translating ids
    id_map: Option<IdMap>,
    source: RepositoryInfo,
    target: RepositoryInfo,
    log: Arc<dyn TransactionLog>,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    sequence: u64,
    /// Highest id handed out so far per table/column by in-memory blocks
    id_blocks: HashMap<String, u64>,
    warnings: Vec<String>,
}

impl ImportCtx {
    pub fn new(
        id_map: Option<IdMap>,
        source: RepositoryInfo,
        target: RepositoryInfo,
        log: Arc<dyn TransactionLog>,
    ) -> Self {
        Self {
            id_map,
            source,
            target,
            log,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            sequence: 0,
            id_blocks: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn id_map(&self) -> Option<&IdMap> {
        self.id_map.as_ref()
    }

    pub fn id_map_mut(&mut self) -> Option<&mut IdMap> {
        self.id_map.as_mut()
    }

    pub fn take_id_map(&mut self) -> Option<IdMap> {
        self.id_map.take()
    }

    pub fn set_id_map(&mut self, id_map: Option<IdMap>) {
        self.id_map = id_map;
    }

    pub fn source(&self) -> &RepositoryInfo {
        &self.source
    }

    pub fn target(&self) -> &RepositoryInfo {
        &self.target
    }

    pub fn log(&self) -> &Arc<dyn TransactionLog> {
        &self.log
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Next package-level log sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn id_block_high_water(&self, key: &str) -> Option<u64> {
        self.id_blocks.get(key).copied()
    }

    pub fn set_id_block_high_water(&mut self, key: impl Into<String>, value: u64) {
        self.id_blocks.insert(key.into(), value);
    }

    /// Record a non-fatal problem for the run report
    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl std::fmt::Debug for ImportCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportCtx")
            .field("run_id", &self.run_id)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("mappings", &self.id_map.as_ref().map(IdMap::len))
            .field("sequence", &self.sequence)
            .finish()
    }
}
