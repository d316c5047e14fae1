//! Daily word budget, persisted so restarts do not refill it.
//!
//! The day key is the local calendar date, so the budget rolls over at local
//! midnight without any scheduled job.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::QuotaConfig;
use crate::error::{Error, Result};
use crate::store::KvStore;

const PREFIX: &str = "quota:";

#[derive(Debug, Default, Serialize, Deserialize)]
struct QuotaRecord {
    words: u64,
}

/// Informative usage level; never blocks a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLevel {
    Normal,
    Warning,
    Critical,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaStatus {
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub level: QuotaLevel,
}

impl QuotaStatus {
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_used(&self) -> f64 {
        self.used as f64 / self.limit.max(1) as f64 * 100.0
    }
}

pub struct QuotaManager {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    config: QuotaConfig,
}

impl QuotaManager {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: QuotaConfig) -> Self {
        Self { store, clock, config }
    }

    pub const fn daily_limit(&self) -> u64 {
        self.config.daily_word_limit
    }

    fn day_key(&self) -> String {
        let today = self.clock.now().with_timezone(&Local).date_naive();
        format!("{PREFIX}{}", today.format("%Y-%m-%d"))
    }

    async fn used_today(&self) -> Result<u64> {
        let Some(raw) = self.store.get(&self.day_key()).await? else {
            return Ok(0);
        };
        match serde_json::from_slice::<QuotaRecord>(&raw) {
            Ok(record) => Ok(record.words),
            Err(e) => {
                warn!("Unreadable quota record, treating as empty: {}", e);
                Ok(0)
            }
        }
    }

    /// Words still available today
    pub async fn remaining(&self) -> Result<u64> {
        Ok(self.daily_limit().saturating_sub(self.used_today().await?))
    }

    /// Advisory check before any network call is made
    pub async fn can_translate(&self, estimated_words: u64) -> Result<bool> {
        Ok(estimated_words <= self.remaining().await?)
    }

    /// Record words for one completed document; returns today's new total
    pub async fn add_usage(&self, words: u64) -> Result<u64> {
        let before = self.used_today().await?;
        let total = before.saturating_add(words);

        let raw = serde_json::to_vec(&QuotaRecord { words: total })
            .map_err(|e| Error::Store(e.to_string()))?;
        self.store.insert(&self.day_key(), &raw).await?;

        debug!("Quota usage {} -> {} of {}", before, total, self.daily_limit());

        let previous = self.level_for(before);
        let current = self.level_for(total);
        if current != previous {
            match current {
                QuotaLevel::Warning | QuotaLevel::Critical | QuotaLevel::Exhausted => warn!(
                    "Daily quota at {:.0}% ({} of {} words)",
                    self.status_for(total).percent_used(),
                    total,
                    self.daily_limit()
                ),
                QuotaLevel::Normal => {}
            }
        }

        Ok(total)
    }

    /// Forget today's usage
    pub async fn reset(&self) -> Result<()> {
        self.store.remove(&self.day_key()).await?;
        info!("Daily quota reset");
        Ok(())
    }

    pub async fn status(&self) -> Result<QuotaStatus> {
        Ok(self.status_for(self.used_today().await?))
    }

    fn status_for(&self, used: u64) -> QuotaStatus {
        QuotaStatus {
            used,
            limit: self.daily_limit(),
            remaining: self.daily_limit().saturating_sub(used),
            level: self.level_for(used),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn level_for(&self, used: u64) -> QuotaLevel {
        let limit = self.daily_limit();
        if used >= limit {
            return QuotaLevel::Exhausted;
        }
        let ratio = used as f64 / limit as f64;
        if ratio >= self.config.critical_ratio {
            QuotaLevel::Critical
        } else if ratio >= self.config.warn_ratio {
            QuotaLevel::Warning
        } else {
            QuotaLevel::Normal
        }
    }
}
