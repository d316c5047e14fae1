use anyhow::{Context, Result};
use docutranslate_core::text::{LanguageDetector, StopwordDetector};
use docutranslate_core::{
    AppConfig, Clock, DocumentFetcher, KvStore, LanguageMap, MemoryStore, RateLimiter,
    TranslationProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Global application state
pub struct AppState {
    pub config: AppConfig,
    /// Provider chain behind `/api/translate`
    pub translator: Arc<dyn TranslationProvider>,
    pub languages: Arc<LanguageMap>,
    /// Source-language guess when a request names none
    pub detector: Box<dyn LanguageDetector>,
    pub fetcher: DocumentFetcher,
    pub fetch_limiter: RateLimiter,
    pub translate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        translator: Arc<dyn TranslationProvider>,
        languages: Arc<LanguageMap>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        // Counters are per-process and must never be evicted early; stale
        // windows are dropped by `purge_rate_limits`
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::unbounded());

        let fetcher = DocumentFetcher::new(config.fetch.clone()).context("Failed to create document fetcher")?;
        let fetch_limiter = RateLimiter::new(
            "fetch",
            Arc::clone(&store),
            Arc::clone(&clock),
            config.server.fetch_rate_limit,
        );
        let translate_limiter = RateLimiter::new("translate", store, clock, config.server.translate_rate_limit);

        Ok(Self {
            config,
            translator,
            languages,
            detector: Box::new(StopwordDetector),
            fetcher,
            fetch_limiter,
            translate_limiter,
        })
    }

    pub const fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.config.chunking.chunk_delay_ms)
    }

    /// Drop stale rate-limit windows for both endpoints
    pub async fn purge_rate_limits(&self) {
        for limiter in [&self.fetch_limiter, &self.translate_limiter] {
            match limiter.purge_stale().await {
                Ok(0) => {}
                Ok(n) => debug!("Purged {} stale rate-limit windows", n),
                Err(e) => warn!("Rate-limit purge failed: {}", e),
            }
        }
    }
}
