//! Durable per-leaderboard state files.

use crate::core::{LeaderboardError, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

// ============================================================================
// Store traits
// ============================================================================

/// Durable byte blob owned by exactly one leaderboard.
pub trait PersistenceStore: Send + Sync {
    /// Reads the last written blob. `None` when nothing was ever written.
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replaces the blob. A failed write leaves the previous blob intact.
    fn write(&self, bytes: &[u8]) -> Result<()>;
}

/// Hands out the store for a leaderboard name.
pub trait StoreProvider: Send + Sync {
    fn open(&self, leaderboard: &str) -> Result<Arc<dyn PersistenceStore>>;
}

// ============================================================================
// File store
// ============================================================================

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl PersistenceStore for FileStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.path).map_err(|e| {
            LeaderboardError::IoError(format!("Failed to open {}: {}", self.path.display(), e))
        })?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| {
            LeaderboardError::IoError(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(Some(data))
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent).map_err(|e| {
            LeaderboardError::IoError(format!("Failed to create data directory: {}", e))
        })?;

        // temp file in the same directory so the rename stays on one filesystem
        let mut temp = NamedTempFile::new_in(&parent)
            .map_err(|e| LeaderboardError::IoError(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(bytes)
            .map_err(|e| LeaderboardError::IoError(format!("Failed to write state: {}", e)))?;
        temp.flush()
            .map_err(|e| LeaderboardError::IoError(format!("Failed to flush state: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| LeaderboardError::IoError(format!("Failed to sync state: {}", e)))?;
        temp.persist(&self.path)
            .map_err(|e| LeaderboardError::IoError(format!("Failed to rename state: {}", e)))?;
        Ok(())
    }
}

/// Stores each leaderboard at `<data_dir>/data/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileStoreProvider {
    data_dir: PathBuf,
}

impl FileStoreProvider {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, leaderboard: &str) -> PathBuf {
        self.data_dir
            .join("data")
            .join(format!("{}.json", leaderboard))
    }
}

impl StoreProvider for FileStoreProvider {
    fn open(&self, leaderboard: &str) -> Result<Arc<dyn PersistenceStore>> {
        Ok(Arc::new(FileStore::new(self.path_for(leaderboard))))
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// In-memory store that counts writes. Can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Vec<u8>>>,
    writes: AtomicUsize,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(bytes: Vec<u8>) -> Self {
        Self {
            blob: Mutex::new(Some(bytes)),
            ..Self::default()
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.blob.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut guard) = self.fail_writes.lock() {
            *guard = failing;
        }
    }
}

impl PersistenceStore for MemoryStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.blob.lock()?.clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        if *self.fail_writes.lock()? {
            return Err(LeaderboardError::IoError("memory store is failing writes".into()));
        }
        *self.blob.lock()? = Some(bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps one [`MemoryStore`] per leaderboard name, surviving reloads.
#[derive(Debug, Default)]
pub struct MemoryStoreProvider {
    stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, leaderboard: &str) -> Result<Arc<MemoryStore>> {
        let mut stores = self.stores.lock()?;
        Ok(stores
            .entry(leaderboard.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new()))
            .clone())
    }
}

impl StoreProvider for MemoryStoreProvider {
    fn open(&self, leaderboard: &str) -> Result<Arc<dyn PersistenceStore>> {
        let store: Arc<dyn PersistenceStore> = self.store(leaderboard)?;
        Ok(store)
    }
}
