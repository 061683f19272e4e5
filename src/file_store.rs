//! Record store persisted as one JSON file.
//!
//! The file is re-read on every call so rows written by other processes,
//! such as the external editor, are visible to the next query.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use calbridge_core::store::{MemoryStore, Predicate, RecordStore, Row, StoreError, Tables};
use tracing::debug;

pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Failed(format!("Could not create {}: {}", parent.display(), e))
            })?;
        }
        Ok(JsonFileStore {
            path,
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<MemoryStore, StoreError> {
        if !self.path.exists() {
            return Ok(MemoryStore::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| io_failure(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(MemoryStore::new());
        }

        let tables: Tables = serde_json::from_str(&content)
            .map_err(|e| StoreError::Failed(format!("Corrupt store file {}: {}", self.path.display(), e)))?;
        Ok(MemoryStore::from_tables(tables))
    }

    fn save(&self, store: &MemoryStore) -> Result<(), StoreError> {
        let tables = store.snapshot()?;
        let content = serde_json::to_string_pretty(&tables)
            .map_err(|e| StoreError::Failed(e.to_string()))?;

        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, content).map_err(|e| io_failure(&temp, e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| io_failure(&self.path, e))?;

        debug!(path = %self.path.display(), "Saved store");
        Ok(())
    }

    fn with_store<T>(
        &self,
        write: bool,
        op: impl FnOnce(&MemoryStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| StoreError::Failed("store lock poisoned".into()))?;

        let store = self.load()?;
        let result = op(&store)?;
        if write {
            self.save(&store)?;
        }
        Ok(result)
    }
}

fn io_failure(path: &Path, e: std::io::Error) -> StoreError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        StoreError::Denied(path.display().to_string())
    } else {
        StoreError::Failed(format!("{}: {}", path.display(), e))
    }
}

impl RecordStore for JsonFileStore {
    fn query(
        &self,
        table: &str,
        predicate: &Predicate,
        order_by: Option<&str>,
    ) -> Result<Vec<Row>, StoreError> {
        self.with_store(false, |store| store.query(table, predicate, order_by))
    }

    fn insert(&self, table: &str, row: Row) -> Result<Option<i64>, StoreError> {
        self.with_store(true, |store| store.insert(table, row))
    }

    fn delete(&self, table: &str, predicate: &Predicate) -> Result<usize, StoreError> {
        self.with_store(true, |store| store.delete(table, predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json")).unwrap();

        assert!(store.query("events", &Predicate::Always, None).unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        let id = store
            .insert("events", row(json!({"title": "A", "dtstart": 1, "dtend": 2})))
            .unwrap();
        assert_eq!(id, Some(1));

        let reopened = JsonFileStore::open(&path).unwrap();
        let rows = reopened.query("events", &Predicate::Always, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "A");

        // Ids keep counting after a reopen
        let id = reopened
            .insert("events", row(json!({"title": "B", "dtstart": 3, "dtend": 4})))
            .unwrap();
        assert_eq!(id, Some(2));
    }

    #[test]
    fn test_sees_rows_written_by_another_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let ours = JsonFileStore::open(&path).unwrap();
        let theirs = JsonFileStore::open(&path).unwrap();

        theirs
            .insert("events", row(json!({"title": "A", "dtstart": 1, "dtend": 2})))
            .unwrap();

        assert_eq!(ours.query("events", &Predicate::Always, None).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_persists() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json")).unwrap();
        store
            .insert("events", row(json!({"title": "A", "dtstart": 1, "dtend": 2})))
            .unwrap();

        assert_eq!(store.delete("events", &Predicate::eq("title", "A")).unwrap(), 1);
        assert!(store.query("events", &Predicate::Always, None).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(matches!(
            store.query("events", &Predicate::Always, None),
            Err(StoreError::Failed(_))
        ));
    }
}
