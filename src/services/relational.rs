//! Relational store collaborator
//!
//! Table catalog, filtered reads, upserts, scoped deletes and the server's id
//! allocator. Allocator keys may be scoped by a context value for tables whose
//! ids are only unique within a parent (workflow child tables).

use crate::models::{DependencyData, Row, SelectFilter, TableSchema};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Relational backing store interface
pub trait RelationalStore: Send + Sync {
    /// Schema of a table, `None` when the table does not exist
    fn table_schema(&self, table: &str) -> Result<Option<TableSchema>>;

    /// Create the table or replace its schema
    fn alter_table(&self, schema: &TableSchema) -> Result<()>;

    /// Rows matching the filter, all rows when no filter is given
    fn select(&self, table: &str, filter: Option<&SelectFilter>) -> Result<Vec<Row>>;

    /// Upsert rows by primary key, creating the table when needed.
    /// Returns the number of rows written.
    fn process_table(&self, data: &DependencyData) -> Result<usize>;

    /// Delete matching rows, returning how many were removed
    fn delete_rows(&self, table: &str, filter: &SelectFilter) -> Result<usize>;

    /// Next id from the server allocator
    fn next_id(&self, key: &str, context: Option<&str>) -> Result<u64>;
}

#[derive(Debug, Default)]
struct MemoryTable {
    schema: Option<TableSchema>,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct RelationalState {
    tables: HashMap<String, MemoryTable>,
    counters: HashMap<(String, Option<String>), u64>,
}

/// In-memory relational store
#[derive(Debug, Default)]
pub struct MemoryRelationalStore {
    state: Mutex<RelationalState>,
}

impl MemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, RelationalState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Relational store lock poisoned"))
    }

    /// Set the next value the allocator hands out for a key
    pub fn seed_next_id(&self, key: &str, context: Option<&str>, next: u64) -> Result<()> {
        self.state()?
            .counters
            .insert((key.to_string(), context.map(str::to_string)), next);
        Ok(())
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self
            .state()?
            .tables
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0))
    }
}

impl RelationalStore for MemoryRelationalStore {
    fn table_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        Ok(self
            .state()?
            .tables
            .get(table)
            .and_then(|t| t.schema.clone()))
    }

    fn alter_table(&self, schema: &TableSchema) -> Result<()> {
        let mut state = self.state()?;
        let table = state.tables.entry(schema.name.clone()).or_default();
        table.schema = Some(schema.clone());
        Ok(())
    }

    fn select(&self, table: &str, filter: Option<&SelectFilter>) -> Result<Vec<Row>> {
        let state = self.state()?;
        let Some(table) = state.tables.get(table) else {
            return Ok(Vec::new());
        };
        Ok(table
            .rows
            .iter()
            .filter(|row| filter.is_none_or(|f| f.matches(row)))
            .cloned()
            .collect())
    }

    fn process_table(&self, data: &DependencyData) -> Result<usize> {
        let mut state = self.state()?;
        let table = state.tables.entry(data.schema.name.clone()).or_default();
        if table.schema.is_none() {
            table.schema = Some(data.schema.clone());
        }
        let schema = table.schema.clone().unwrap_or_else(|| data.schema.clone());
        for row in &data.rows {
            let key = schema.key_of(row);
            let existing = key.as_ref().and_then(|key| {
                table
                    .rows
                    .iter()
                    .position(|r| schema.key_of(r).as_ref() == Some(key))
            });
            match existing {
                Some(index) => table.rows[index] = row.clone(),
                None => table.rows.push(row.clone()),
            }
        }
        Ok(data.rows.len())
    }

    fn delete_rows(&self, table: &str, filter: &SelectFilter) -> Result<usize> {
        let mut state = self.state()?;
        let Some(table) = state.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|row| !filter.matches(row));
        Ok(before - table.rows.len())
    }

    fn next_id(&self, key: &str, context: Option<&str>) -> Result<u64> {
        let mut state = self.state()?;
        let counter = state
            .counters
            .entry((key.to_string(), context.map(str::to_string)))
            .or_insert(1);
        let id = *counter;
        *counter += 1;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dependency_data::row;
    use crate::models::ColumnDef;

    fn states_schema() -> TableSchema {
        TableSchema::new(
            "STATES",
            vec![
                ColumnDef::new("WORKFLOWAPPID", "INTEGER"),
                ColumnDef::new("STATEID", "INTEGER"),
                ColumnDef::new("STATENAME", "VARCHAR"),
            ],
            &["WORKFLOWAPPID", "STATEID"],
        )
    }

    #[test]
    fn process_table_upserts_by_primary_key() {
        let store = MemoryRelationalStore::new();
        let data = DependencyData::new(
            states_schema(),
            vec![row([("WORKFLOWAPPID", "4"), ("STATEID", "1"), ("STATENAME", "Draft")])],
        );
        store.process_table(&data).unwrap();
        let renamed = DependencyData::new(
            states_schema(),
            vec![row([("WORKFLOWAPPID", "4"), ("STATEID", "1"), ("STATENAME", "Drafting")])],
        );
        store.process_table(&renamed).unwrap();

        let rows = store.select("STATES", None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["STATENAME"], "Drafting");
    }

    #[test]
    fn allocator_is_scoped_by_context() {
        let store = MemoryRelationalStore::new();
        store.seed_next_id("STATES", Some("4"), 10).unwrap();
        assert_eq!(store.next_id("STATES", Some("4")).unwrap(), 10);
        assert_eq!(store.next_id("STATES", Some("4")).unwrap(), 11);
        assert_eq!(store.next_id("STATES", Some("5")).unwrap(), 1);
    }
}
