//! Key-value store behind rate-limit counters, the daily quota and the
//! translation cache.
//!
//! Components namespace their keys with a fixed prefix so several of them can
//! share one store.

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::config::CacheConfig;
use crate::error::Result;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn insert(&self, key: &str, value: &[u8]) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Keys starting with `prefix`, in no particular order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove every key starting with `prefix`; returns how many were removed.
    async fn clear_prefix(&self, prefix: &str) -> Result<usize> {
        let keys = self.keys_with_prefix(prefix).await?;
        for key in &keys {
            self.remove(key).await?;
        }
        Ok(keys.len())
    }
}

/// Open the store described by the cache configuration.
///
/// Falls back to memory when the disk store is disabled. Disk open failures
/// are errors: silently losing the quota record would reset the daily budget.
pub fn open_store(config: &CacheConfig) -> Result<Arc<dyn KvStore>> {
    if config.disk_enabled {
        let path = config
            .disk_path
            .clone()
            .unwrap_or_else(crate::util::state_store_path);
        Ok(Arc::new(DiskStore::new(path)?))
    } else {
        warn!("Disk store disabled; quota and cache will not survive restarts");
        Ok(Arc::new(MemoryStore::new(config.memory_max_entries)))
    }
}
