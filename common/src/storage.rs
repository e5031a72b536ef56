//! Table storage abstraction using trait-based design.
//!
//! A table lives at a Cypress-style absolute path (`/sys/spark/examples/t`)
//! and is stored as a directory of immutable part objects. The storage layer
//! knows nothing about the encoding of a part; it only moves bytes around on
//! top of the `object_store` crate.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{
    ObjectMeta, ObjectStore, PutPayload, local::LocalFileSystem, memory::InMemory,
    path::Path as ObjectPath,
};
use std::fmt::{self, Debug, Display};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{CommonError, Result};

/// File name prefix of every table part.
pub const PART_PREFIX: &str = "part-";
/// File name extension of every table part.
pub const PART_EXTENSION: &str = "parquet";

/// Absolute, validated path of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TablePath {
    raw: String,
    location: ObjectPath,
}

impl TablePath {
    /// Parse a path such as `/sys/spark/examples/example_1`.
    ///
    /// The path must be absolute and must not contain empty, `.` or `..`
    /// segments. A single trailing `/` is tolerated.
    pub fn parse(path: &str) -> Result<Self> {
        let relative = path.strip_prefix('/').ok_or_else(|| {
            CommonError::invalid_path_error(format!("'{}' is not an absolute path", path))
        })?;
        let relative = relative.strip_suffix('/').unwrap_or(relative);

        if relative.is_empty() {
            return Err(CommonError::invalid_path_error(
                "the root path cannot hold a table",
            ));
        }
        if let Some(bad) = relative
            .split('/')
            .find(|segment| segment.is_empty() || *segment == "." || *segment == "..")
        {
            return Err(CommonError::invalid_path_error(format!(
                "'{}' contains an invalid segment '{}'",
                path, bad
            )));
        }

        let location = ObjectPath::parse(relative).map_err(|e| CommonError::InvalidPathError {
            message: format!("'{}' is not a valid storage path", path),
            source: Some(e.into()),
        })?;

        Ok(Self {
            raw: format!("/{}", relative),
            location,
        })
    }

    /// The normalized absolute path.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn location(&self) -> &ObjectPath {
        &self.location
    }
}

impl Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for TablePath {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One immutable part object of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePart {
    location: ObjectPath,
    /// Size of the encoded part in bytes.
    pub size: u64,
}

impl TablePart {
    /// Location of the part inside the store, relative to the store root.
    pub fn location(&self) -> &str {
        self.location.as_ref()
    }

    fn from_meta(meta: ObjectMeta) -> Self {
        Self {
            location: meta.location,
            size: meta.size,
        }
    }
}

/// Storage client for path-addressed tables.
///
/// This trait provides a unified interface for table persistence without
/// exposing the underlying object store.
#[async_trait]
pub trait TableStorage: Send + Sync + Debug {
    /// Check whether a table exists at the path.
    async fn exists(&self, path: &TablePath) -> Result<bool>;

    /// List the parts of the table, oldest first. Empty if the table does not exist.
    async fn list_parts(&self, path: &TablePath) -> Result<Vec<TablePart>>;

    /// Read the raw bytes of one part.
    async fn read_part(&self, part: &TablePart) -> Result<Bytes>;

    /// Add a new part to the table, creating the table if needed.
    async fn write_part(&self, path: &TablePath, data: Bytes) -> Result<TablePart>;

    /// Remove the table's parts. Tables nested under the path are kept.
    /// Removing a missing table is a no-op.
    async fn remove(&self, path: &TablePath) -> Result<()>;

    /// Get storage statistics.
    async fn stats(&self) -> StorageStats;
}

/// Storage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub read_count: u64,
    pub write_count: u64,
    pub delete_count: u64,
    pub error_count: u64,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage for testing and development.
    #[default]
    Memory,
    /// Local filesystem storage rooted at a directory.
    LocalFileSystem { root_path: String },
}

/// Builder for creating storage instances.
#[derive(Debug, Default)]
pub struct StorageBuilder {
    backend: StorageBackend,
}

impl StorageBuilder {
    /// Create a new storage builder with the in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage backend.
    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Build a storage instance with the specified backend.
    pub async fn build(self) -> Result<Arc<dyn TableStorage>> {
        let storage = ObjectStoreTableStorage::new(self.backend).await?;
        Ok(Arc::new(storage))
    }
}

/// Internal statistics tracker for storage operations.
#[derive(Debug, Default)]
struct InternalStorageStats {
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl InternalStorageStats {
    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> StorageStats {
        StorageStats {
            read_count: self.reads.load(Ordering::Acquire),
            write_count: self.writes.load(Ordering::Acquire),
            delete_count: self.deletes.load(Ordering::Acquire),
            error_count: self.errors.load(Ordering::Acquire),
        }
    }
}

/// Object store-based table storage.
struct ObjectStoreTableStorage {
    store: Arc<dyn ObjectStore>,
    backend: StorageBackend,
    stats: InternalStorageStats,
}

impl Debug for ObjectStoreTableStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreTableStorage")
            .field("backend", &self.backend)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ObjectStoreTableStorage {
    async fn new(backend: StorageBackend) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match &backend {
            StorageBackend::Memory => Arc::new(InMemory::new()),
            StorageBackend::LocalFileSystem { root_path } => {
                tokio::fs::create_dir_all(root_path).await.map_err(|e| {
                    CommonError::configuration_error_with_source(
                        format!("Failed to create storage root '{}'", root_path),
                        e,
                    )
                })?;
                let fs = LocalFileSystem::new_with_prefix(root_path).map_err(|e| {
                    CommonError::configuration_error_with_source(
                        format!("Failed to open local filesystem storage '{}'", root_path),
                        e,
                    )
                })?;
                Arc::new(fs)
            }
        };

        Ok(Self {
            store,
            backend,
            stats: InternalStorageStats::default(),
        })
    }

    /// Record the outcome of a store call and convert its error.
    fn track<T>(&self, result: object_store::Result<T>) -> Result<T> {
        result.map_err(|e| {
            self.stats.record_error();
            CommonError::from(e)
        })
    }

    fn is_part(meta: &ObjectMeta) -> bool {
        meta.location
            .filename()
            .is_some_and(|name| name.starts_with(PART_PREFIX))
            && meta.location.extension() == Some(PART_EXTENSION)
    }
}

#[async_trait]
impl TableStorage for ObjectStoreTableStorage {
    async fn exists(&self, path: &TablePath) -> Result<bool> {
        Ok(!self.list_parts(path).await?.is_empty())
    }

    async fn list_parts(&self, path: &TablePath) -> Result<Vec<TablePart>> {
        let listing = self.track(self.store.list_with_delimiter(Some(path.location())).await)?;
        self.stats.record_read();

        let mut objects: Vec<ObjectMeta> =
            listing.objects.into_iter().filter(Self::is_part).collect();
        objects.sort_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.location.cmp(&b.location))
        });

        Ok(objects.into_iter().map(TablePart::from_meta).collect())
    }

    async fn read_part(&self, part: &TablePart) -> Result<Bytes> {
        let result = self.track(self.store.get(&part.location).await)?;
        let bytes = self.track(result.bytes().await)?;
        self.stats.record_read();
        Ok(bytes)
    }

    async fn write_part(&self, path: &TablePath, data: Bytes) -> Result<TablePart> {
        let name = format!(
            "{}{}.{}",
            PART_PREFIX,
            uuid::Uuid::new_v4().simple(),
            PART_EXTENSION
        );
        let location = path.location().child(name);
        let size = data.len() as u64;

        self.track(self.store.put(&location, PutPayload::from(data)).await)?;
        self.stats.record_write();
        debug!(table = %path, part = %location, size, "wrote table part");

        Ok(TablePart { location, size })
    }

    async fn remove(&self, path: &TablePath) -> Result<()> {
        // Only this table's own parts; tables nested under the path stay.
        let parts = self.list_parts(path).await?;

        for part in &parts {
            if let Err(e) = self.store.delete(&part.location).await {
                let err = CommonError::from(e);
                if !err.is_not_found() {
                    self.stats.record_error();
                    return Err(err);
                }
            }
        }

        self.stats.record_delete();
        debug!(table = %path, parts = parts.len(), "removed table");
        Ok(())
    }

    async fn stats(&self) -> StorageStats {
        self.stats.get_stats()
    }
}
