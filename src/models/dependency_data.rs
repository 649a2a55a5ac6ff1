//! Tabular transport units
//!
//! [`DependencyData`] pairs a table schema with rows and is the archive
//! payload for `DBMS_DATA` files; a bare [`TableSchema`] is the payload for
//! `DBMS_SCHEMA` files. Both travel as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A table row: column name to value, absent columns are NULL
pub type Row = BTreeMap<String, String>;

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub primary_key: Vec<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>, primary_key: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Additive merge: every existing column is kept, incoming columns that are
    /// missing are appended. Existing column definitions win on conflict.
    pub fn merge(&self, incoming: &TableSchema) -> TableSchema {
        let mut merged = self.clone();
        for column in &incoming.columns {
            if merged.column(&column.name).is_none() {
                merged.columns.push(column.clone());
            }
        }
        if merged.primary_key.is_empty() {
            merged.primary_key = incoming.primary_key.clone();
        }
        merged
    }

    /// Primary key values of a row, `None` when any key column is missing
    pub fn key_of(&self, row: &Row) -> Option<Vec<String>> {
        self.primary_key
            .iter()
            .map(|col| row.get(col).cloned())
            .collect()
    }
}

/// Schema plus rows for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyData {
    pub schema: TableSchema,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl DependencyData {
    pub fn new(schema: TableSchema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    pub fn table_name(&self) -> &str {
        &self.schema.name
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Row filter for selects and deletes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectFilter {
    Equals(String, String),
    And(Vec<SelectFilter>),
}

impl SelectFilter {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        SelectFilter::Equals(column.into(), value.into())
    }

    pub fn and(self, other: SelectFilter) -> Self {
        match self {
            SelectFilter::And(mut parts) => {
                parts.push(other);
                SelectFilter::And(parts)
            }
            first => SelectFilter::And(vec![first, other]),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            SelectFilter::Equals(column, value) => row.get(column) == Some(value),
            SelectFilter::And(parts) => parts.iter().all(|p| p.matches(row)),
        }
    }
}

/// Build a row from column/value pairs
pub fn row<I, K, V>(values: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    values
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
