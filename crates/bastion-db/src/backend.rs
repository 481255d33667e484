//! The relational-store contract plugins reach through `db.*` sys-calls.
//!
//! The actual store is an external collaborator (spec.md §1); this crate
//! only defines the seam `bastion-syscall` dispatches through, plus an
//! in-memory test double.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{DbError, DbResult};

/// Filter/paging options for `db.getItems`.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    /// Equality filters, field name to expected value.
    pub filter: HashMap<String, Value>,
    /// Maximum rows to return.
    pub limit: Option<u64>,
    /// Rows to skip before collecting.
    pub offset: Option<u64>,
}

/// A single result row.
pub type Row = HashMap<String, Value>;

/// The relational-store contract (§4.5 `db.query`/`db.getItems`/`db.getItem`).
#[async_trait]
pub trait DbBackend: Send + Sync {
    /// Run a raw query with positional `params`, returning result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>>;

    /// Fetch rows from `table` matching `query`.
    async fn get_items(&self, table: &str, query: &ItemQuery) -> DbResult<Vec<Row>>;

    /// Fetch a single row from `table` by `id`.
    async fn get_item(&self, table: &str, id: &str) -> DbResult<Row>;
}

/// An in-memory backend for tests: tables are named maps of id → row.
#[derive(Default)]
pub struct InMemoryDbBackend {
    tables: Mutex<HashMap<String, HashMap<String, Row>>>,
}

impl InMemoryDbBackend {
    /// Build an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `table` with `id` → `row`, for test setup.
    pub fn seed(&self, table: &str, id: &str, row: Row) {
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(table.to_string())
            .or_default()
            .insert(id.to_string(), row);
    }
}

#[async_trait]
impl DbBackend for InMemoryDbBackend {
    async fn query(&self, _sql: &str, _params: &[Value]) -> DbResult<Vec<Row>> {
        Err(DbError::Query(
            "InMemoryDbBackend does not execute raw SQL; seed rows via get_items/get_item instead"
                .to_string(),
        ))
    }

    async fn get_items(&self, table: &str, query: &ItemQuery) -> DbResult<Vec<Row>> {
        let tables = self
            .tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let rows = tables.get(table).cloned().unwrap_or_default();

        let mut matched: Vec<Row> = rows
            .into_values()
            .filter(|row| {
                query
                    .filter
                    .iter()
                    .all(|(k, v)| row.get(k).is_some_and(|found| found == v))
            })
            .collect();

        if let Some(offset) = query.offset {
            let offset = usize::try_from(offset).unwrap_or(usize::MAX);
            matched = matched.into_iter().skip(offset).collect();
        }
        if let Some(limit) = query.limit {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn get_item(&self, table: &str, id: &str) -> DbResult<Row> {
        let tables = self
            .tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tables
            .get(table)
            .and_then(|rows| rows.get(id))
            .cloned()
            .ok_or_else(|| DbError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_item_returns_seeded_row() {
        let db = InMemoryDbBackend::new();
        db.seed("items", "1", HashMap::from([("name".to_string(), json!("widget"))]));
        let row = db.get_item("items", "1").await.unwrap();
        assert_eq!(row.get("name"), Some(&json!("widget")));
    }

    #[tokio::test]
    async fn get_item_missing_row_errors() {
        let db = InMemoryDbBackend::new();
        let err = db.get_item("items", "missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn get_items_filters_limits_and_offsets() {
        let db = InMemoryDbBackend::new();
        for i in 0..5 {
            db.seed(
                "items",
                &i.to_string(),
                HashMap::from([("kind".to_string(), json!("widget"))]),
            );
        }
        let query = ItemQuery {
            filter: HashMap::from([("kind".to_string(), json!("widget"))]),
            limit: Some(2),
            offset: Some(1),
        };
        let rows = db.get_items("items", &query).await.unwrap();
        assert_eq!(rows.len(), 2);
    }
}
