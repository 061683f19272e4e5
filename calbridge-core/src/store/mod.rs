//! Record-store boundary.
//!
//! The store is an external collaborator: accessors read, insert and
//! delete rows through [`RecordStore`] and never see an internal row id.
//! Matching is always by field value.

mod memory;
mod predicate;

pub use memory::{MemoryStore, Tables};
pub use predicate::Predicate;

use thiserror::Error;

/// A store row: column name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Failures reported by a record store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("permission denied: {0}")]
    Denied(String),

    #[error("{0}")]
    Failed(String),
}

/// Read/write/delete access to a tabular record store.
///
/// Implementations may block on I/O.
pub trait RecordStore: Send + Sync {
    /// Rows of `table` matching `predicate`, ascending by `order_by` when given.
    fn query(
        &self,
        table: &str,
        predicate: &Predicate,
        order_by: Option<&str>,
    ) -> Result<Vec<Row>, StoreError>;

    /// Insert one row. Returns the new row id when the store reports one.
    fn insert(&self, table: &str, row: Row) -> Result<Option<i64>, StoreError>;

    /// Delete every matching row and return how many were removed.
    fn delete(&self, table: &str, predicate: &Predicate) -> Result<usize, StoreError>;
}
