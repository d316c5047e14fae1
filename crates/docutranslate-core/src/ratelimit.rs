//! Per-client fixed-window request counters.
//!
//! Counters live in a [`KvStore`] under `ratelimit:{scope}:{window}:{client}`
//! so several server instances can share one backing store. Windows more than
//! two buckets old are purged opportunistically on every check.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::{Error, Result};
use crate::store::KvStore;
use crate::util::redact_client;

/// Outcome of one admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub error: Option<String>,
    /// Seconds until the current window rolls over
    pub retry_after_secs: u64,
}

impl RateLimitDecision {
    /// Convert a rejection into [`Error::RateLimited`]
    pub fn into_result(self) -> Result<u32> {
        if self.allowed {
            Ok(self.remaining)
        } else {
            Err(Error::RateLimited {
                message: self.error.unwrap_or_else(|| "Too many requests".to_string()),
                retry_after_secs: self.retry_after_secs,
            })
        }
    }
}

pub struct RateLimiter {
    scope: String,
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
    // Serializes read-modify-write on counters within this process
    guard: Mutex<()>,
}

impl RateLimiter {
    pub fn new(
        scope: impl Into<String>,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            scope: scope.into(),
            store,
            clock,
            config,
            guard: Mutex::new(()),
        }
    }

    pub const fn limit(&self) -> u32 {
        self.config.limit
    }

    fn prefix(&self) -> String {
        format!("ratelimit:{}:", self.scope)
    }

    fn current_window(&self) -> (i64, u64) {
        let secs = self.clock.now().timestamp();
        let size = self.config.window.seconds();
        let window = secs.div_euclid(size);
        let retry_after = u64::try_from(size - secs.rem_euclid(size)).unwrap_or(0);
        (window, retry_after)
    }

    async fn read_count(&self, key: &str) -> Result<u32> {
        Ok(self
            .store
            .get(key)
            .await?
            .and_then(|raw| String::from_utf8(raw).ok())
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0))
    }

    /// Count one request from `client` and decide whether it may proceed
    pub async fn check(&self, client: &str) -> Result<RateLimitDecision> {
        let _serialized = self.guard.lock().await;

        let (window, retry_after_secs) = self.current_window();
        let key = format!("{}{window}:{client}", self.prefix());
        let count = self.read_count(&key).await?;

        let decision = if count >= self.config.limit {
            debug!(
                "Rate limit hit for {} ({} requests this {})",
                redact_client(client),
                count,
                self.config.window.label()
            );
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                error: Some(format!(
                    "Too many requests: at most {} per {}. Try again in {} seconds.",
                    self.config.limit,
                    self.config.window.label(),
                    retry_after_secs
                )),
                retry_after_secs,
            }
        } else {
            let new_count = count + 1;
            self.store.insert(&key, new_count.to_string().as_bytes()).await?;
            RateLimitDecision {
                allowed: true,
                remaining: self.config.limit - new_count,
                error: None,
                retry_after_secs,
            }
        };

        if let Err(e) = self.purge_before(window - 2).await {
            warn!("Rate limit purge failed: {}", e);
        }

        Ok(decision)
    }

    /// Drop counters more than two windows old; returns how many were removed
    pub async fn purge_stale(&self) -> Result<usize> {
        let (window, _) = self.current_window();
        self.purge_before(window - 2).await
    }

    async fn purge_before(&self, oldest_kept: i64) -> Result<usize> {
        let prefix = self.prefix();
        let mut removed = 0;
        for key in self.store.keys_with_prefix(&prefix).await? {
            let window = key
                .strip_prefix(&prefix)
                .and_then(|rest| rest.split_once(':'))
                .and_then(|(window, _)| window.parse::<i64>().ok());
            if window.is_none_or(|w| w < oldest_kept) {
                self.store.remove(&key).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
