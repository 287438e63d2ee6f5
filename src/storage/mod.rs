//! Where saved images go
//!
//! The save handler only ever needs two operations: make sure a directory
//! exists and write a file. [`LocalStore`] does that on the real filesystem;
//! [`MemoryStore`] keeps everything in memory and remembers each call.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Create `dir` and any missing parents. Existing directories are fine.
    async fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Write `data` to `path`, replacing an existing file.
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// Local filesystem store
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

#[async_trait]
impl ImageStore for LocalStore {
    async fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(dir).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, data).await?;
        tracing::debug!(path = %path.display(), size = data.len(), "Image written");
        Ok(())
    }
}

/// A single call made against a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    CreateDir(PathBuf),
    Write { path: PathBuf, size: usize },
}

/// In-memory store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    ops: Mutex<Vec<StoreOp>>,
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call in the order it was made.
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    /// Paths passed to `write`, one entry per call.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                StoreOp::Write { path, .. } => Some(path),
                StoreOp::CreateDir(_) => None,
            })
            .collect()
    }

    /// Latest contents written to `path`.
    pub fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }

    fn record(&self, op: StoreOp) -> io::Result<()> {
        self.ops
            .lock()
            .map_err(|_| io::Error::other("memory store poisoned"))?
            .push(op);
        Ok(())
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        self.record(StoreOp::CreateDir(dir.to_path_buf()))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.record(StoreOp::Write {
            path: path.to_path_buf(),
            size: data.len(),
        })?;
        self.files
            .lock()
            .map_err(|_| io::Error::other("memory store poisoned"))?
            .insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }
}
