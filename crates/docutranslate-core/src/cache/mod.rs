mod key;

pub use key::CacheKey;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::KvStore;

const PREFIX: &str = "cache:";

/// A stored translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub translated_text: String,
    #[serde(default)]
    pub detected_source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Previously computed document translations with expiry.
///
/// Expired entries are deleted lazily on read and eagerly by [`sweep`].
///
/// [`sweep`]: TranslationCache::sweep
pub struct TranslationCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    expiry: Duration,
}

impl TranslationCache {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, expiry: Duration) -> Self {
        Self { store, clock, expiry }
    }

    fn storage_key(key: &CacheKey) -> String {
        format!("{PREFIX}{key}")
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        let age = self.clock.now().signed_duration_since(entry.created_at);
        age.to_std().map_or(true, |age| age <= self.expiry)
    }

    /// Get a cached translation if present and not expired
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let storage_key = Self::storage_key(key);

        let raw = match self.store.get(&storage_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Cache read error: {}", e);
                return None;
            }
        };

        match serde_json::from_slice::<CacheEntry>(&raw) {
            Ok(entry) if self.is_fresh(&entry) => Some(entry),
            Ok(_) => {
                debug!("Cache entry {} expired", key);
                self.discard(&storage_key).await;
                None
            }
            Err(e) => {
                warn!("Dropping unreadable cache entry {}: {}", key, e);
                self.discard(&storage_key).await;
                None
            }
        }
    }

    async fn discard(&self, storage_key: &str) {
        if let Err(e) = self.store.remove(storage_key).await {
            warn!("Failed to remove cache entry: {}", e);
        }
    }

    /// Store a translation stamped with the current time
    pub async fn insert(
        &self,
        key: &CacheKey,
        translated_text: &str,
        detected_source: Option<&str>,
    ) -> Result<()> {
        let entry = CacheEntry {
            translated_text: translated_text.to_string(),
            detected_source: detected_source.map(str::to_string),
            created_at: self.clock.now(),
        };
        let raw = serde_json::to_vec(&entry).map_err(|e| Error::Store(e.to_string()))?;
        self.store.insert(&Self::storage_key(key), &raw).await
    }

    /// Delete every expired (or unreadable) entry; returns how many were removed
    pub async fn sweep(&self) -> Result<usize> {
        let mut removed = 0;
        for storage_key in self.store.keys_with_prefix(PREFIX).await? {
            let stale = match self.store.get(&storage_key).await? {
                Some(raw) => !serde_json::from_slice::<CacheEntry>(&raw)
                    .is_ok_and(|entry| self.is_fresh(&entry)),
                None => false,
            };
            if stale {
                self.store.remove(&storage_key).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Swept {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Remove all cached translations; returns how many were removed
    pub async fn clear(&self) -> Result<usize> {
        self.store.clear_prefix(PREFIX).await
    }
}
