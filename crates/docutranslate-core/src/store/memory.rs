use async_trait::async_trait;
use moka::future::Cache;

use super::KvStore;
use crate::error::Result;

/// In-process store using moka.
///
/// Used by tests and by single-instance servers for rate-limit counters.
/// Expiry is handled by the owning component, not by moka.
pub struct MemoryStore {
    cache: Cache<String, Vec<u8>>,
}

impl MemoryStore {
    /// Bounded store; moka may evict or refuse entries once `max_entries`
    /// is reached, so only use it for data that can be recomputed.
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    /// Store without a capacity limit. Entries live until removed.
    pub fn unbounded() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await)
    }

    async fn insert(&self, key: &str, value: &[u8]) -> Result<()> {
        self.cache.insert(key.to_string(), value.to_vec()).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.as_ref().clone())
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_remove() {
        let store = MemoryStore::default();
        store.insert("quota:2024-03-01", b"42").await.unwrap();
        assert_eq!(store.get("quota:2024-03-01").await.unwrap(), Some(b"42".to_vec()));

        store.remove("quota:2024-03-01").await.unwrap();
        assert_eq!(store.get("quota:2024-03-01").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unbounded_keeps_every_entry() {
        let store = MemoryStore::unbounded();
        for i in 0..5_000 {
            store.insert(&format!("ratelimit:k{i}"), b"1").await.unwrap();
        }
        for i in 0..5_000 {
            assert!(store.get(&format!("ratelimit:k{i}")).await.unwrap().is_some());
        }
        assert_eq!(store.keys_with_prefix("ratelimit:").await.unwrap().len(), 5_000);
    }

    #[tokio::test]
    async fn test_prefix_scan_and_clear() {
        let store = MemoryStore::default();
        store.insert("cache:a", b"1").await.unwrap();
        store.insert("cache:b", b"2").await.unwrap();
        store.insert("quota:today", b"3").await.unwrap();

        let mut keys = store.keys_with_prefix("cache:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["cache:a", "cache:b"]);

        assert_eq!(store.clear_prefix("cache:").await.unwrap(), 2);
        assert!(store.keys_with_prefix("cache:").await.unwrap().is_empty());
        assert!(store.get("quota:today").await.unwrap().is_some());
    }
}
