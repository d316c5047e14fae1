//! DocuTranslate Core Library
//!
//! This library provides the core functionality for translating documents:
//! - Text chunking, language detection and paragraph formatting
//! - Translation via DeepL, LibreTranslate, MyMemory or another proxy, with
//!   ordered provider fallback
//! - Orchestration of chunked translations with cache, daily quota and a
//!   single-run guard
//! - Per-client rate limiting for the proxy endpoints
//! - PDF download (allow-listed hosts) and text extraction
//! - Persisted state (memory and disk key-value stores)

pub mod cache;
pub mod clock;
pub mod config;
pub mod document;
pub mod error;
pub mod orchestrator;
pub mod quota;
pub mod ratelimit;
pub mod store;
pub mod text;
pub mod translator;
pub mod util;

pub use cache::{CacheEntry, CacheKey, TranslationCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AppConfig, DEFAULT_TARGET_LANG, Lang, LanguageOption, MAX_DOCUMENT_BYTES, MAX_TEXT_LENGTH,
    ProviderConfig, ProviderKind, RateLimitConfig, RateWindow, target_languages,
};
pub use document::{DocumentFetcher, DocumentId, FetchedDocument, PdfText, google_export_url};
pub use error::{Error, Result};
pub use orchestrator::{
    JoinedTranslation, Orchestrator, ProgressFn, Stage, TranslationOutcome, TranslationRequest,
    translate_in_chunks, validate_input,
};
pub use quota::{QuotaLevel, QuotaManager, QuotaStatus};
pub use ratelimit::{RateLimitDecision, RateLimiter};
pub use store::{DiskStore, KvStore, MemoryStore, open_store};
pub use translator::{
    FallbackTranslator, LanguageMap, SourceLang, TranslationProvider, TranslationsResponse,
    create_translator,
};
