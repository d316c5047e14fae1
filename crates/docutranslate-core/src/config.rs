use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Language code as accepted on the wire (DeepL style, e.g. "FR", "PT-BR")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-cased form used for table lookups ("fr" and "FR" are the same language)
    pub fn normalized(&self) -> String {
        self.0.trim().to_uppercase()
    }
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Translation backend dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// DeepL free API (`/v2/translate`)
    DeepL,
    /// LibreTranslate public or self-hosted instance
    Libre,
    /// MyMemory (`/get?q=...&langpair=...`)
    MyMemory,
    /// Another docutranslate proxy (`/api/translate`)
    Proxy,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DeepL => "deepl",
            Self::Libre => "libre",
            Self::MyMemory => "mymemory",
            Self::Proxy => "proxy",
        };
        f.write_str(name)
    }
}

/// One translation endpoint. Providers are tried in the order they are listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            kind,
            api_base: api_base.into(),
            api_key,
            timeout_secs: default_provider_timeout_secs(),
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const fn default_provider_timeout_secs() -> u64 {
    40
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(ProviderKind::Libre, "https://libretranslate.com", None),
        ProviderConfig::new(ProviderKind::Libre, "https://translate.argosopentech.com", None),
    ]
}

/// Chunked translation pacing and input bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Pause between consecutive chunk requests
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    /// Longest accepted input text, in characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
}

const fn default_chunk_delay_ms() -> u64 {
    500
}

const fn default_max_text_length() -> usize {
    MAX_TEXT_LENGTH
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_delay_ms: default_chunk_delay_ms(),
            max_text_length: default_max_text_length(),
        }
    }
}

/// Daily word budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_daily_word_limit")]
    pub daily_word_limit: u64,

    /// Usage ratio that triggers a warning
    #[serde(default = "default_warn_ratio")]
    pub warn_ratio: f64,

    /// Usage ratio that triggers a critical warning
    #[serde(default = "default_critical_ratio")]
    pub critical_ratio: f64,
}

const fn default_daily_word_limit() -> u64 {
    100_000
}

const fn default_warn_ratio() -> f64 {
    0.8
}

const fn default_critical_ratio() -> f64 {
    0.95
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_word_limit: default_daily_word_limit(),
            warn_ratio: default_warn_ratio(),
            critical_ratio: default_critical_ratio(),
        }
    }
}

/// Cache and persisted state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable translation caching
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds after which a cached translation is stale
    #[serde(default = "default_cache_expiry_secs")]
    pub expiry_secs: u64,

    /// Persist quota and cache on disk (otherwise in memory only)
    #[serde(default = "default_true")]
    pub disk_enabled: bool,

    /// Disk store directory (defaults to $XDG_CACHE_HOME/docutranslate)
    pub disk_path: Option<PathBuf>,

    /// Maximum entries held by the in-memory store
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_cache_expiry_secs() -> u64 {
    7 * 24 * 60 * 60
}

const fn default_memory_max_entries() -> u64 {
    10_000
}

impl CacheConfig {
    pub const fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expiry_secs: default_cache_expiry_secs(),
            disk_enabled: true,
            disk_path: None,
            memory_max_entries: default_memory_max_entries(),
        }
    }
}

/// Coarse time bucket for rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateWindow {
    Minute,
    Hour,
}

impl RateWindow {
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3600,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
        }
    }
}

/// Per-client request cap
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window: RateWindow,
}

impl RateLimitConfig {
    pub const fn per_minute(limit: u32) -> Self {
        Self { limit, window: RateWindow::Minute }
    }

    pub const fn per_hour(limit: u32) -> Self {
        Self { limit, window: RateWindow::Hour }
    }
}

/// Remote document download limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,

    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept plain `http` URLs (local mirrors and test servers only)
    #[serde(default)]
    pub allow_http: bool,
}

fn default_allowed_hosts() -> Vec<String> {
    vec!["docs.google.com".to_string(), "drive.google.com".to_string()]
}

const fn default_max_document_bytes() -> u64 {
    MAX_DOCUMENT_BYTES
}

const fn default_fetch_timeout_secs() -> u64 {
    30
}

impl FetchConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: default_allowed_hosts(),
            max_document_bytes: default_max_document_bytes(),
            timeout_secs: default_fetch_timeout_secs(),
            allow_http: false,
        }
    }
}

/// Proxy server admission limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_fetch_rate_limit")]
    pub fetch_rate_limit: RateLimitConfig,

    #[serde(default = "default_translate_rate_limit")]
    pub translate_rate_limit: RateLimitConfig,
}

const fn default_fetch_rate_limit() -> RateLimitConfig {
    RateLimitConfig::per_minute(10)
}

const fn default_translate_rate_limit() -> RateLimitConfig {
    RateLimitConfig::per_hour(50)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            fetch_rate_limit: default_fetch_rate_limit(),
            translate_rate_limit: default_translate_rate_limit(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language (None = detect)
    #[serde(default)]
    pub source_lang: Option<Lang>,

    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Translation endpoints in fallback order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub quota: QuotaConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: None,
            target_lang: default_target_lang(),
            providers: default_providers(),
            chunking: ChunkingConfig::default(),
            quota: QuotaConfig::default(),
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations layered over each other:
    /// ~/.config/docutranslate/config.toml, then ./config.toml, then
    /// `DOCUTRANSLATE__*` environment variables.
    pub fn load() -> Self {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("docutranslate").join("config.toml");
            if user_config.exists() {
                tracing::debug!("Using config from {}", user_config.display());
                builder = builder.add_source(config::File::from(user_config).required(false));
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            tracing::debug!("Using config from ./config.toml");
            builder = builder.add_source(config::File::from(local_config).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DOCUTRANSLATE")
                .prefix_separator("__")
                .separator("__"),
        );

        let loaded = builder
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| Error::ConfigLoad(e.to_string()))
            .and_then(|config| config.validate().map(|()| config));

        match loaded {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Falling back to default config: {}", e);
                Self::default()
            }
        }
    }

    /// Reject configurations that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(invalid("providers", "at least one provider is required"));
        }
        if let Some(p) = self.providers.iter().find(|p| p.api_base.trim().is_empty()) {
            return Err(invalid("providers.api_base", format!("empty base URL for {} provider", p.kind)));
        }
        if self.chunking.max_text_length == 0 {
            return Err(invalid("chunking.max_text_length", "must be greater than zero"));
        }
        if self.quota.daily_word_limit == 0 {
            return Err(invalid("quota.daily_word_limit", "must be greater than zero"));
        }
        if self.fetch.allowed_hosts.is_empty() {
            return Err(invalid("fetch.allowed_hosts", "allow-list cannot be empty"));
        }
        for (field, limit) in [
            ("server.fetch_rate_limit.limit", self.server.fetch_rate_limit.limit),
            ("server.translate_rate_limit.limit", self.server.translate_rate_limit.limit),
        ] {
            if limit == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
    Error::ConfigInvalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// A language option for CLI listings
#[derive(Debug, Clone)]
pub struct LanguageOption {
    /// DeepL-style code (e.g., "EN", "PT-BR")
    pub code: &'static str,
    /// Display name (e.g., "English", "French")
    pub name: &'static str,
    /// Flag emoji
    pub flag: &'static str,
}

/// Languages accepted as translation target.
pub fn target_languages() -> Vec<LanguageOption> {
    vec![
        LanguageOption { code: "DE", name: "German", flag: "🇩🇪" },
        LanguageOption { code: "EN", name: "English", flag: "🇬🇧" },
        LanguageOption { code: "ES", name: "Spanish", flag: "🇪🇸" },
        LanguageOption { code: "FR", name: "French", flag: "🇫🇷" },
        LanguageOption { code: "IT", name: "Italian", flag: "🇮🇹" },
        LanguageOption { code: "PT-PT", name: "Portuguese", flag: "🇵🇹" },
        LanguageOption { code: "PT-BR", name: "Brazilian Portuguese", flag: "🇧🇷" },
        LanguageOption { code: "RU", name: "Russian", flag: "🇷🇺" },
        LanguageOption { code: "TR", name: "Turkish", flag: "🇹🇷" },
    ]
}

/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "EN";
/// Longest text accepted for translation, in characters
pub const MAX_TEXT_LENGTH: usize = 50_000;
/// Largest document accepted for upload or download (10 MiB)
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;
