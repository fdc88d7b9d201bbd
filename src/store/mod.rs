// Relational store collaborator: table-scoped CRUD over JSON rows.
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod filter;
pub mod memory;
pub mod postgres;

pub use filter::{Filter, FilterError, Predicate, Scalar};
pub use memory::MemStore;
pub use postgres::PgStore;

/// A single table row in transit. Columns map to JSON values; uuids and
/// timestamps travel as strings.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError>;

    /// Insert one row and return it as stored. A violated unique index
    /// surfaces as `UniqueViolation` so callers can retry allocation.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Patch every row matching the filter; returns the first updated row.
    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<Row, StoreError>;

    /// Returns the number of rows removed.
    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn select_one(&self, table: &str, filter: &Filter) -> Result<Option<Row>, StoreError> {
        let mut rows = self.select(table, filter).await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }
}
