//! Transaction log collaborator
//!
//! Every element an install writes is recorded with the action taken and the
//! target identifier, so a package can be audited after the run.

use crate::models::{ObjectType, RowAction};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// One install action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxnLogEntry {
    pub run_id: Uuid,
    /// Package-level sequence, increasing by one per entry
    pub sequence: u64,
    /// `<type>-<id>` of the dependency being installed
    pub dependency_key: String,
    pub dependency_name: String,
    pub object_type: ObjectType,
    /// Target identifier of the written element
    pub element_id: String,
    /// Element name, usually the table or file written
    pub element_name: String,
    pub element_type: String,
    pub action: RowAction,
    pub logged_at: DateTime<Utc>,
}

pub trait TransactionLog: Send + Sync {
    fn add_entry(&self, entry: TxnLogEntry) -> Result<()>;
}

/// Log kept in memory
#[derive(Debug, Default)]
pub struct MemoryTransactionLog {
    entries: Mutex<Vec<TxnLogEntry>>,
}

impl MemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Vec<TxnLogEntry>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("Transaction log lock poisoned"))
    }

    pub fn entries(&self) -> Result<Vec<TxnLogEntry>> {
        Ok(self.guard()?.clone())
    }

    pub fn entries_for(&self, dependency_key: &str) -> Result<Vec<TxnLogEntry>> {
        Ok(self
            .guard()?
            .iter()
            .filter(|e| e.dependency_key == dependency_key)
            .cloned()
            .collect())
    }

    pub fn clear(&self) -> Result<()> {
        self.guard()?.clear();
        Ok(())
    }
}

impl TransactionLog for MemoryTransactionLog {
    fn add_entry(&self, entry: TxnLogEntry) -> Result<()> {
        self.guard()?.push(entry);
        Ok(())
    }
}
