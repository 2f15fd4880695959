//! Storage abstraction for reading Iceberg files.
//!
//! Scan tasks may be executed on any tokio worker, so the storage trait is
//! `Send + Sync` and is shared as `Arc<dyn IcebergStorage>`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use crate::error::{IcebergError, Result};

/// Storage trait for reading Iceberg files.
#[async_trait]
pub trait IcebergStorage: Debug + Send + Sync {
    /// Read an entire file.
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Get the size of a file in bytes.
    async fn file_size(&self, path: &str) -> Result<u64>;
}

/// In-memory storage for tests and in-memory tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: HashMap<String, Bytes>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the storage.
    pub fn add_file(&mut self, path: impl Into<String>, content: impl Into<Bytes>) {
        self.files.insert(path.into(), content.into());
    }

    fn get(&self, path: &str) -> Result<&Bytes> {
        self.files
            .get(path)
            .ok_or_else(|| IcebergError::storage(format!("File not found: {}", path)))
    }
}

#[async_trait]
impl IcebergStorage for MemoryStorage {
    async fn read(&self, path: &str) -> Result<Bytes> {
        self.get(path).cloned()
    }

    async fn file_size(&self, path: &str) -> Result<u64> {
        self.get(path).map(|c| c.len() as u64)
    }
}

/// Local filesystem storage.
///
/// Accepts plain paths and `file://` URIs. Relative paths resolve against the
/// configured root, if any.
#[derive(Debug, Clone, Default)]
pub struct LocalFileStorage {
    root: Option<PathBuf>,
}

impl LocalFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let local = Path::new(path.strip_prefix("file://").unwrap_or(path));
        match &self.root {
            Some(root) if local.is_relative() => root.join(local),
            _ => local.to_path_buf(),
        }
    }
}

fn fs_error(path: &str, e: std::io::Error) -> IcebergError {
    IcebergError::storage(format!("{}: {}", path, e))
}

#[async_trait]
impl IcebergStorage for LocalFileStorage {
    async fn read(&self, path: &str) -> Result<Bytes> {
        tokio::fs::read(self.resolve(path))
            .await
            .map(Bytes::from)
            .map_err(|e| fs_error(path, e))
    }

    async fn file_size(&self, path: &str) -> Result<u64> {
        tokio::fs::metadata(self.resolve(path))
            .await
            .map(|m| m.len())
            .map_err(|e| fs_error(path, e))
    }
}

/// A storage wrapper that counts calls, for asserting access patterns.
#[derive(Debug)]
pub struct CountingStorage<S: IcebergStorage> {
    inner: S,
    read_calls: AtomicUsize,
    size_calls: AtomicUsize,
}

impl<S: IcebergStorage> CountingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            read_calls: AtomicUsize::new(0),
            size_calls: AtomicUsize::new(0),
        }
    }

    /// Number of whole-file `read()` calls.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn size_calls(&self) -> usize {
        self.size_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.read_calls() + self.size_calls()
    }
}

#[async_trait]
impl<S: IcebergStorage> IcebergStorage for CountingStorage<S> {
    async fn read(&self, path: &str) -> Result<Bytes> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.read(path).await
    }

    async fn file_size(&self, path: &str) -> Result<u64> {
        self.size_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.file_size(path).await
    }
}
