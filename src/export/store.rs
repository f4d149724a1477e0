//! External stores the export pipeline writes to.
//!
//! The blob store puts bytes and hands back a public reference; the record
//! store inserts a row and hands back its id.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store rejected the request: {0}")]
    Rejected(String),
}

/// Identifier the record store assigned to an inserted row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A row as read back after insertion: the assigned id plus the fields written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

/// Binary object storage with publicly fetchable results.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `name` and returns a public reference to them.
    fn put<'a>(
        &'a self,
        name: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<String, StoreError>>;
}

/// Structured record storage.
pub trait RecordStore: Send + Sync {
    fn insert<'a>(
        &'a self,
        table: &'a str,
        record: Value,
    ) -> BoxFuture<'a, Result<StoredRecord, StoreError>>;
}

fn into_fields(record: Value) -> Result<serde_json::Map<String, Value>, StoreError> {
    match record {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::Rejected(format!("records must be JSON objects, got {other}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-process blob store.
#[derive(Debug)]
pub struct MemoryBlobStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<StoredBlob> {
        self.objects.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put<'a>(
        &'a self,
        name: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        async move {
            let mut objects = self.objects.lock();
            if objects.contains_key(name) {
                return Err(StoreError::Rejected(format!("object `{name}` already exists")));
            }
            objects.insert(
                name.to_owned(),
                StoredBlob {
                    bytes,
                    content_type: content_type.to_owned(),
                },
            );
            Ok(format!("memory://{}/{name}", self.bucket))
        }
        .boxed()
    }
}

/// In-process record store with sequential numeric ids.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<String, Vec<StoredRecord>>>,
    next_id: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str, id: &RecordId) -> Option<StoredRecord> {
        self.tables
            .lock()
            .get(table)
            .and_then(|rows| rows.iter().find(|row| &row.id == id).cloned())
    }

    pub fn rows(&self, table: &str) -> Vec<StoredRecord> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert<'a>(
        &'a self,
        table: &'a str,
        record: Value,
    ) -> BoxFuture<'a, Result<StoredRecord, StoreError>> {
        async move {
            let fields = into_fields(record)?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let stored = StoredRecord {
                id: RecordId(id.to_string()),
                fields,
            };
            self.tables
                .lock()
                .entry(table.to_owned())
                .or_default()
                .push(stored.clone());
            Ok(stored)
        }
        .boxed()
    }
}

/// Blob store writing into a directory; references are `file://` URLs.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for FsBlobStore {
    fn put<'a>(
        &'a self,
        name: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        async move {
            if name.contains(['/', '\\']) || name.starts_with('.') {
                return Err(StoreError::Rejected(format!("invalid object name `{name}`")));
            }
            std::fs::create_dir_all(&self.root)?;
            let path = self.root.join(name);
            if path.exists() {
                return Err(StoreError::Rejected(format!("object `{name}` already exists")));
            }
            std::fs::write(&path, &bytes)?;
            log::debug!("Stored {} bytes of {content_type} at {}", bytes.len(), path.display());
            let absolute = std::fs::canonicalize(&path)?;
            Ok(format!("file://{}", absolute.display()))
        }
        .boxed()
    }
}

/// Record store keeping one JSON file per row, under a directory per table.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn row_path(&self, table: &str, id: &RecordId) -> PathBuf {
        self.root.join(table).join(format!("{id}.json"))
    }

    /// Reads a row back, e.g. to reopen a saved design.
    pub fn load(&self, table: &str, id: &RecordId) -> Result<StoredRecord, StoreError> {
        let json = std::fs::read_to_string(self.row_path(table, id))?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl RecordStore for FsRecordStore {
    fn insert<'a>(
        &'a self,
        table: &'a str,
        record: Value,
    ) -> BoxFuture<'a, Result<StoredRecord, StoreError>> {
        async move {
            let stored = StoredRecord {
                id: RecordId(Uuid::new_v4().simple().to_string()),
                fields: into_fields(record)?,
            };
            let path = self.row_path(table, &stored.id);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&path, serde_json::to_string_pretty(&stored)?)?;
            log::debug!("Inserted {table} row {} at {}", stored.id, path.display());
            Ok(stored)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn memory_blob_store_refuses_to_overwrite() {
        let store = MemoryBlobStore::new("designs");
        let url = block_on(store.put("a.png", vec![1, 2, 3], "image/png")).unwrap();
        assert_eq!(url, "memory://designs/a.png");
        assert!(block_on(store.put("a.png", vec![4], "image/png")).is_err());
        assert_eq!(store.get("a.png").unwrap().bytes, vec![1, 2, 3]);
    }

    #[test]
    fn memory_record_store_assigns_increasing_ids() {
        let store = MemoryRecordStore::new();
        let first = block_on(store.insert("t", json!({ "a": 1 }))).unwrap();
        let second = block_on(store.insert("t", json!({ "a": 2 }))).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.get("t", &second.id).unwrap().fields["a"], json!(2));
        assert_eq!(store.rows("t").len(), 2);
    }

    #[test]
    fn records_must_be_objects() {
        let store = MemoryRecordStore::new();
        assert!(matches!(
            block_on(store.insert("t", json!([1, 2]))),
            Err(StoreError::Rejected(_))
        ));
    }

    #[test]
    fn fs_stores_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path().join("designs"));
        let url = block_on(blobs.put("x.png", vec![9; 4], "image/png")).unwrap();
        assert!(url.starts_with("file://"));
        assert_eq!(std::fs::read(dir.path().join("designs/x.png")).unwrap(), vec![9; 4]);

        let records = FsRecordStore::new(dir.path().join("records"));
        let stored = block_on(records.insert("saved_designs", json!({ "product_id": 1 }))).unwrap();
        let loaded = records.load("saved_designs", &stored.id).unwrap();
        assert_eq!(loaded, stored);
    }

    #[test]
    fn fs_blob_store_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        assert!(block_on(blobs.put("../escape.png", vec![], "image/png")).is_err());
    }
}
