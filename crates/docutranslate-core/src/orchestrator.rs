//! End-to-end document translation.
//!
//! One call walks `CacheCheck -> QuotaCheck -> Splitting -> Translating(i of N)
//! -> Aggregating -> Done`, or stops in `Failed`. Chunks are sent strictly in
//! order with a pause between requests; any chunk failure aborts the whole
//! run, and nothing is cached or charged to the quota unless every chunk
//! succeeded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, TranslationCache};
use crate::clock::Clock;
use crate::config::{AppConfig, ChunkingConfig, Lang};
use crate::document::DocumentId;
use crate::error::{Error, Result};
use crate::quota::{QuotaManager, QuotaStatus};
use crate::store::KvStore;
use crate::text::{self, LanguageDetector, StopwordDetector};
use crate::translator::{LanguageMap, SourceLang, TranslationProvider, create_translator};

/// Progress events emitted while a translation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CacheCheck,
    QuotaCheck,
    Splitting,
    Translating { current: usize, total: usize },
    Aggregating,
    Done { from_cache: bool },
    Failed,
}

pub type ProgressFn = dyn Fn(Stage) + Send + Sync;

/// Text to translate and where it came from
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub text: String,
    /// None = detect
    pub source_lang: Option<Lang>,
    pub target_lang: Lang,
    /// Cache identity; None bypasses the cache
    pub document_id: Option<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub text: String,
    pub detected_source: Option<String>,
    pub from_cache: bool,
    /// Chunks sent to the provider (0 on a cache hit)
    pub chunks: usize,
    /// Source word count
    pub words: u64,
}

/// Clears the in-progress flag however the run ends
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Result of [`translate_in_chunks`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedTranslation {
    /// Translated chunks joined by single spaces
    pub text: String,
    /// First language reported by the provider, else the source language
    pub detected_source: String,
    pub chunks: usize,
}

/// Translate `text` in provider-sized chunks, strictly in order, pausing
/// `delay` between requests. The first failing chunk aborts the run.
pub async fn translate_in_chunks(
    provider: &dyn TranslationProvider,
    text: &str,
    source: &SourceLang,
    target: &Lang,
    delay: Duration,
    on_chunk: impl Fn(usize, usize),
) -> Result<JoinedTranslation> {
    let chunks = text::chunks(text, provider.max_chunk_len());
    let total = chunks.len();
    info!("Translating {} chunks with {}", total, provider.label());

    let mut parts = Vec::with_capacity(total);
    let mut detected_source = None;
    for chunk in &chunks {
        if chunk.index > 0 {
            tokio::time::sleep(delay).await;
        }
        on_chunk(chunk.index + 1, total);
        let translated = provider.translate_chunk(&chunk.content, source, target).await?;
        if detected_source.is_none() {
            detected_source = translated.detected_source;
        }
        parts.push(translated.text);
    }

    Ok(JoinedTranslation {
        text: parts.join(" "),
        detected_source: detected_source.unwrap_or_else(|| source.lang().normalized()),
        chunks: total,
    })
}

pub struct Orchestrator {
    translator: Arc<dyn TranslationProvider>,
    quota: QuotaManager,
    cache: Option<TranslationCache>,
    detector: Box<dyn LanguageDetector>,
    languages: Arc<LanguageMap>,
    chunk_delay: Duration,
    max_text_length: usize,
    busy: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        translator: Arc<dyn TranslationProvider>,
        quota: QuotaManager,
        cache: Option<TranslationCache>,
        languages: Arc<LanguageMap>,
        chunking: &ChunkingConfig,
    ) -> Self {
        Self {
            translator,
            quota,
            cache,
            detector: Box::new(StopwordDetector),
            languages,
            chunk_delay: Duration::from_millis(chunking.chunk_delay_ms),
            max_text_length: chunking.max_text_length,
            busy: AtomicBool::new(false),
        }
    }

    /// Wire the configured providers, quota and cache over one store
    pub fn from_config(config: &AppConfig, store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let languages = Arc::new(LanguageMap::default());
        let translator = Arc::new(create_translator(&config.providers, &languages)?);
        let quota = QuotaManager::new(Arc::clone(&store), Arc::clone(&clock), config.quota.clone());
        let cache = config
            .cache
            .enabled
            .then(|| TranslationCache::new(store, clock, config.cache.expiry()));

        info!("Translating with {}", translator.label());
        Ok(Self::new(translator, quota, cache, languages, &config.chunking))
    }

    /// Swap the source-language detector
    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub const fn quota(&self) -> &QuotaManager {
        &self.quota
    }

    pub const fn cache(&self) -> Option<&TranslationCache> {
        self.cache.as_ref()
    }

    pub fn languages(&self) -> &LanguageMap {
        &self.languages
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn quota_status(&self) -> Result<QuotaStatus> {
        self.quota.status().await
    }

    /// Sweep expired cache entries; returns how many were removed
    pub async fn cleanup(&self) -> Result<usize> {
        match &self.cache {
            Some(cache) => cache.sweep().await,
            None => Ok(0),
        }
    }

    /// Translate a whole document.
    ///
    /// A second call while one is running fails with [`Error::Busy`] rather
    /// than queueing.
    pub async fn translate(
        &self,
        request: &TranslationRequest,
        progress: Option<&ProgressFn>,
    ) -> Result<TranslationOutcome> {
        let report = |stage: Stage| {
            if let Some(progress) = progress {
                progress(stage);
            }
        };

        let _guard = BusyGuard::acquire(&self.busy)?;
        let result = self.run(request, &report).await;
        match &result {
            Ok(outcome) => report(Stage::Done {
                from_cache: outcome.from_cache,
            }),
            Err(e) => {
                warn!("Translation failed: {}", e);
                report(Stage::Failed);
            }
        }
        result
    }

    async fn run(&self, request: &TranslationRequest, report: &impl Fn(Stage)) -> Result<TranslationOutcome> {
        let source_text = request.text.trim();
        self.validate(source_text, request)?;
        let words = text::count_words(source_text);

        report(Stage::CacheCheck);
        let cache_key = match (&self.cache, &request.document_id) {
            (Some(_), Some(id)) => Some(CacheKey::new(id, request.source_lang.as_ref(), &request.target_lang)),
            _ => None,
        };
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key)
            && let Some(entry) = cache.get(key).await
        {
            info!("Cache hit for document {:?}", request.document_id.as_ref().map(DocumentId::as_str));
            return Ok(TranslationOutcome {
                text: entry.translated_text,
                detected_source: entry.detected_source,
                from_cache: true,
                chunks: 0,
                words,
            });
        }

        report(Stage::QuotaCheck);
        if !self.quota.can_translate(words).await? {
            return Err(Error::QuotaExceeded {
                remaining: self.quota.remaining().await?,
            });
        }

        let source = match &request.source_lang {
            Some(lang) => SourceLang::Explicit(lang.clone()),
            None => {
                let detected = self.detector.detect(source_text);
                debug!("Detected source language {}", detected);
                SourceLang::Detected(detected)
            }
        };

        report(Stage::Splitting);
        let translated = translate_in_chunks(
            self.translator.as_ref(),
            source_text,
            &source,
            &request.target_lang,
            self.chunk_delay,
            |current, total| report(Stage::Translating { current, total }),
        )
        .await?;

        report(Stage::Aggregating);
        let text = text::format_paragraphs(&translated.text);
        let detected_source = Some(translated.detected_source);

        // The translation already succeeded; bookkeeping failures only warn
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key)
            && let Err(e) = cache.insert(key, &text, detected_source.as_deref()).await
        {
            warn!("Failed to cache translation: {}", e);
        }
        if let Err(e) = self.quota.add_usage(words).await {
            warn!("Failed to record quota usage: {}", e);
        }

        Ok(TranslationOutcome {
            text,
            detected_source,
            from_cache: false,
            chunks: translated.chunks,
            words,
        })
    }

    fn validate(&self, text: &str, request: &TranslationRequest) -> Result<()> {
        validate_input(
            text,
            request.source_lang.as_ref(),
            &request.target_lang,
            &self.languages,
            self.max_text_length,
        )
    }
}

/// Reject input before any network call: empty or oversized text, or a
/// language outside the supported table
pub fn validate_input(
    text: &str,
    source: Option<&Lang>,
    target: &Lang,
    languages: &LanguageMap,
    max_text_length: usize,
) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Validation("No text to translate".to_string()));
    }
    if text.chars().count() > max_text_length {
        return Err(Error::Validation(format!(
            "Text is too long (limit: {max_text_length} characters)"
        )));
    }
    languages.ensure_supported(target)?;
    if let Some(source) = source {
        languages.ensure_supported(source)?;
    }
    Ok(())
}
