//! In-memory record store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Predicate, RecordStore, Row, StoreError};

const ROW_ID: &str = "_id";

/// Raw table contents, serializable so other stores can persist them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub next_id: i64,
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Row>>,
}

/// A thread-safe record store held in memory.
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    report_ids: bool,
    writable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_tables(Tables::default())
    }

    pub fn from_tables(tables: Tables) -> Self {
        MemoryStore {
            tables: Mutex::new(tables),
            report_ids: true,
            writable: true,
        }
    }

    /// A store that accepts inserts but does not report the new row id.
    pub fn without_row_ids(mut self) -> Self {
        self.report_ids = false;
        self
    }

    /// A store that refuses every insert and delete.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Result<Tables, StoreError> {
        Ok(self.lock()?.clone())
    }

    /// All rows of `table` in insertion order.
    pub fn rows(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        Ok(self.lock()?.tables.get(table).cloned().unwrap_or_default())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Failed("store lock poisoned".into()))
    }

    fn check_writable(&self, table: &str) -> Result<(), StoreError> {
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::Denied(format!("'{}' is read-only", table)))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn query(
        &self,
        table: &str,
        predicate: &Predicate,
        order_by: Option<&str>,
    ) -> Result<Vec<Row>, StoreError> {
        let tables = self.lock()?;

        let mut rows: Vec<Row> = tables
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| predicate.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(column) = order_by {
            // Stable: ties keep insertion order
            rows.sort_by_key(|r| r.get(column).and_then(Value::as_i64).unwrap_or(i64::MAX));
        }

        Ok(rows)
    }

    fn insert(&self, table: &str, mut row: Row) -> Result<Option<i64>, StoreError> {
        self.check_writable(table)?;
        let mut tables = self.lock()?;

        tables.next_id += 1;
        let id = tables.next_id;
        row.entry(ROW_ID.to_string()).or_insert(Value::from(id));
        tables.tables.entry(table.to_string()).or_default().push(row);

        Ok(self.report_ids.then_some(id))
    }

    fn delete(&self, table: &str, predicate: &Predicate) -> Result<usize, StoreError> {
        self.check_writable(table)?;
        let mut tables = self.lock()?;

        let Some(rows) = tables.tables.get_mut(table) else {
            return Ok(0);
        };

        let before = rows.len();
        rows.retain(|r| !predicate.matches(r));
        Ok(before - rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_insert_assigns_ids() {
        let store = MemoryStore::new();
        assert_eq!(store.insert("events", row(json!({"title": "a"}))).unwrap(), Some(1));
        assert_eq!(store.insert("events", row(json!({"title": "b"}))).unwrap(), Some(2));

        let rows = store.rows("events").unwrap();
        assert_eq!(rows[1]["_id"], 2);
    }

    #[test]
    fn test_without_row_ids_still_inserts() {
        let store = MemoryStore::new().without_row_ids();
        assert_eq!(store.insert("events", row(json!({"title": "a"}))).unwrap(), None);
        assert_eq!(store.rows("events").unwrap().len(), 1);
    }

    #[test]
    fn test_read_only_denies_writes() {
        let store = MemoryStore::new().read_only();
        assert!(matches!(
            store.insert("events", Row::new()),
            Err(StoreError::Denied(_))
        ));
        assert!(matches!(
            store.delete("events", &Predicate::Always),
            Err(StoreError::Denied(_))
        ));
    }

    #[test]
    fn test_query_orders_by_column() {
        let store = MemoryStore::new();
        store.insert("events", row(json!({"dtstart": 30}))).unwrap();
        store.insert("events", row(json!({"dtstart": 10}))).unwrap();
        store.insert("events", row(json!({"dtstart": 20}))).unwrap();

        let starts: Vec<i64> = store
            .query("events", &Predicate::Always, Some("dtstart"))
            .unwrap()
            .iter()
            .map(|r| r["dtstart"].as_i64().unwrap())
            .collect();
        assert_eq!(starts, vec![10, 20, 30]);
    }

    #[test]
    fn test_delete_removes_only_matches() {
        let store = MemoryStore::new();
        store.insert("events", row(json!({"title": "keep"}))).unwrap();
        store.insert("events", row(json!({"title": "drop"}))).unwrap();

        let removed = store.delete("events", &Predicate::eq("title", "drop")).unwrap();
        assert_eq!(removed, 1);

        let rows = store.rows("events").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "keep");
    }

    #[test]
    fn test_unknown_table_is_empty() {
        let store = MemoryStore::new();
        assert!(store.query("nope", &Predicate::Always, None).unwrap().is_empty());
        assert_eq!(store.delete("nope", &Predicate::Always).unwrap(), 0);
    }
}
