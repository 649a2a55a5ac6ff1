//! Table transfer helpers
//!
//! Ids for child rows that have no allocator of their own are handed out in
//! blocks computed in memory: the block starts above both the highest value
//! already stored in the target column and the highest value handed out
//! earlier in the same run. An optional context column scopes both, so ids
//! of workflow tables are unique per workflow only.

use crate::context::ImportCtx;
use crate::error::DeployResult;
use crate::handler::HandlerRegistry;
use crate::models::{DependencyData, Row, SelectFilter};
use std::collections::HashMap;
use tracing::debug;

/// Source value to reserved target value for one column
#[derive(Debug, Clone, Default)]
pub struct IdBlock {
    start: u64,
    assigned: HashMap<String, String>,
}

impl IdBlock {
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.assigned.get(source).map(String::as_str)
    }
}

/// Context column and value an id block is scoped to
#[derive(Debug, Clone, Copy)]
pub struct BlockContext<'a> {
    pub column: &'a str,
    pub value: &'a str,
}

impl<'a> BlockContext<'a> {
    pub fn new(column: &'a str, value: &'a str) -> Self {
        Self { column, value }
    }
}

/// First id of a block of `count` fresh ids for `table.column`, optionally
/// within a context
pub fn next_id_block_in_memory(
    reg: &HandlerRegistry,
    ctx: &mut ImportCtx,
    table: &str,
    column: &str,
    context: Option<BlockContext<'_>>,
    count: u64,
) -> DeployResult<u64> {
    let (key, filter) = match context {
        Some(scope) => (
            format!("{}.{}@{}={}", table, column, scope.column, scope.value),
            Some(SelectFilter::equals(scope.column, scope.value)),
        ),
        None => (format!("{}.{}", table, column), None),
    };
    let stored = reg.services().relational.select(table, filter.as_ref())?;
    let existing = max_numeric(&stored, column);
    let handed_out = ctx.id_block_high_water(&key).unwrap_or(0);
    let start = existing.max(handed_out) + 1;
    if count > 0 {
        ctx.set_id_block_high_water(key.clone(), start + count - 1);
    }
    debug!("Reserved {} ids for {} from {}", count, key, start);
    Ok(start)
}

/// Reserve a block covering every distinct value of the column, in order of
/// first appearance across the given tables
pub fn reserve_block(
    reg: &HandlerRegistry,
    ctx: &mut ImportCtx,
    table: &str,
    column: &str,
    context: Option<BlockContext<'_>>,
    sources: &[&DependencyData],
    columns: &[&str],
) -> DeployResult<IdBlock> {
    let mut values: Vec<String> = Vec::new();
    for data in sources {
        for name in columns {
            for value in distinct_values(&data.rows, name) {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
        }
    }
    let start = next_id_block_in_memory(reg, ctx, table, column, context, values.len() as u64)?;
    let assigned = values
        .into_iter()
        .zip(start..)
        .map(|(source, target)| (source, target.to_string()))
        .collect();
    Ok(IdBlock { start, assigned })
}

/// Rewrite every value of a column; `None` from the mapper leaves the value
pub fn rewrite_column<F>(rows: &mut [Row], column: &str, mut mapper: F) -> DeployResult<()>
where
    F: FnMut(&str) -> DeployResult<Option<String>>,
{
    for row in rows.iter_mut() {
        let Some(value) = row.get(column) else {
            continue;
        };
        if let Some(mapped) = mapper(value)? {
            row.insert(column.to_string(), mapped);
        }
    }
    Ok(())
}

/// Distinct non-empty values of a column in order of first appearance
pub fn distinct_values(rows: &[Row], column: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for row in rows {
        if let Some(value) = row.get(column)
            && !value.is_empty()
            && !values.contains(value)
        {
            values.push(value.clone());
        }
    }
    values
}

/// Highest numeric value of a column, 0 when there is none
pub fn max_numeric(rows: &[Row], column: &str) -> u64 {
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter_map(|value| value.trim().parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::context::RepositoryInfo;
    use crate::handler::workflow::builtin_schemas;
    use crate::models::dependency_data::row;
    use crate::services::{MemoryServices, MemoryTransactionLog, RelationalStore};
    use std::sync::Arc;

    #[test]
    fn scoped_blocks_only_see_their_context() {
        let memory = MemoryServices::new();
        let roles = builtin_schemas()
            .into_iter()
            .find(|s| s.name == "ROLES")
            .unwrap();
        memory
            .relational
            .process_table(&DependencyData::new(
                roles,
                vec![
                    row([("WORKFLOWAPPID", "9"), ("ROLEID", "4"), ("ROLENAME", "Admin")]),
                    row([("WORKFLOWAPPID", "300"), ("ROLEID", "2"), ("ROLENAME", "Editor")]),
                ],
            ))
            .unwrap();
        let reg = HandlerRegistry::with_defaults(memory.services(), DeployConfig::default()).unwrap();
        let mut ctx = ImportCtx::new(
            None,
            RepositoryInfo::new("source", 9992, "rx"),
            RepositoryInfo::new("target", 9992, "rx"),
            Arc::new(MemoryTransactionLog::new()),
        );

        let scope = Some(BlockContext::new("WORKFLOWAPPID", "300"));
        let first = next_id_block_in_memory(&reg, &mut ctx, "ROLES", "ROLEID", scope, 2).unwrap();
        assert_eq!(first, 3);
        let second = next_id_block_in_memory(&reg, &mut ctx, "ROLES", "ROLEID", scope, 1).unwrap();
        assert_eq!(second, 5);

        let fresh = Some(BlockContext::new("WORKFLOWAPPID", "301"));
        assert_eq!(
            next_id_block_in_memory(&reg, &mut ctx, "ROLES", "ROLEID", fresh, 1).unwrap(),
            1
        );
        assert_eq!(
            next_id_block_in_memory(&reg, &mut ctx, "ROLES", "ROLEID", None, 1).unwrap(),
            5
        );
    }

    #[test]
    fn rewrite_leaves_unmapped_values() {
        let mut rows = vec![row([("ROLEID", "1")]), row([("ROLEID", "2")])];
        rewrite_column(&mut rows, "ROLEID", |v| {
            Ok((v == "1").then(|| "10".to_string()))
        })
        .unwrap();
        assert_eq!(rows[0]["ROLEID"], "10");
        assert_eq!(rows[1]["ROLEID"], "2");
    }

    #[test]
    fn distinct_values_keep_first_appearance_order() {
        let rows = vec![
            row([("STATEID", "3")]),
            row([("STATEID", "1")]),
            row([("STATEID", "3")]),
        ];
        assert_eq!(distinct_values(&rows, "STATEID"), vec!["3", "1"]);
        assert_eq!(max_numeric(&rows, "STATEID"), 3);
    }
}
