use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use tracing::debug;

use super::KvStore;
use crate::error::{Error, Result};

/// Disk-based store using sled. Survives restarts, so it backs the daily
/// quota and the translation cache.
pub struct DiskStore {
    db: Db,
}

impl DiskStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Store(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = sled::open(path).map_err(|e| {
            let err_str = e.to_string();
            // Detect lock errors and provide actionable fix
            if err_str.contains("WouldBlock") || err_str.contains("lock") {
                Error::Store(format!(
                    "Store locked at {}\n\n\
                    Another docutranslate process is running, or a previous instance crashed.\n\
                    To fix: rm {}/db/LOCK",
                    path.display(),
                    path.display()
                ))
            } else {
                Error::Store(format!("Failed to open store at {}: {}", path.display(), e))
            }
        })?;

        debug!("Opened disk store at {}", path.display());

        Ok(Self { db })
    }

    pub fn size_on_disk(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| Error::Store(format!("Flush failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for DiskStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key.as_bytes())
            .map(|value| value.map(|v| v.to_vec()))
            .map_err(|e| Error::Store(e.to_string()))
    }

    async fn insert(&self, key: &str, value: &[u8]) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value)
            .map_err(|e| Error::Store(e.to_string()))?;

        // Flush to ensure persistence
        self.flush()
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| Error::Store(e.to_string()))?;
        self.flush()
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.db
            .scan_prefix(prefix.as_bytes())
            .keys()
            .map(|key| {
                key.map(|k| String::from_utf8_lossy(&k).into_owned())
                    .map_err(|e| Error::Store(e.to_string()))
            })
            .collect()
    }
}
