//! Persistent text stores backing [`StoreCache`](super::StoreCache).

use crate::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Flat name → text store.
///
/// Names reaching a store are already normalized (no path separators).
#[async_trait]
pub trait TextStore: Send + Sync + 'static {
    /// Read an entry; `Ok(None)` when it does not exist.
    async fn read(&self, name: &str) -> Result<Option<String>>;

    /// Create or overwrite an entry.
    async fn write(&self, name: &str, text: &str) -> Result<()>;
}

/// Files under a prefix directory, one per entry.
#[derive(Debug, Clone)]
pub struct FsStore {
    prefix: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `prefix`, creating the directory if needed.
    ///
    /// An existing directory is fine; any other failure is returned.
    pub async fn create(prefix: impl Into<PathBuf>) -> Result<Self> {
        let prefix = prefix.into();
        tokio::fs::create_dir_all(&prefix).await?;
        debug!("Cache store at {}", prefix.display());
        Ok(Self { prefix })
    }

    /// Root directory of the store.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }
}

#[async_trait]
impl TextStore for FsStore {
    async fn read(&self, name: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.prefix.join(name)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, name: &str, text: &str) -> Result<()> {
        tokio::fs::write(self.prefix.join(name), text).await?;
        Ok(())
    }
}

/// In-process store; contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether `name` has been written.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }
}

#[async_trait]
impl TextStore for MemoryStore {
    async fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(name).cloned())
    }

    async fn write(&self, name: &str, text: &str) -> Result<()> {
        self.entries.lock().insert(name.to_string(), text.to_string());
        Ok(())
    }
}
