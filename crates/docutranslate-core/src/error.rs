use thiserror::Error;

/// Unified error type for docutranslate-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Request validation (bad text, unsupported language, disallowed URL)
/// - Admission control (rate limits, daily quota, busy session)
/// - Translation providers (HTTP failures, timeouts, unusable payloads)
/// - Documents (fetch rejections, text extraction)
/// - Persisted state and configuration
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Input Errors
    // ==========================================================================
    /// Invalid input: empty text, text too long, unknown language, bad URL
    #[error("{0}")]
    Validation(String),

    /// URL parsed but is not on the allow-list (or not an export URL)
    #[error("URL not allowed: {0}")]
    UrlNotAllowed(String),

    // ==========================================================================
    // Admission Errors
    // ==========================================================================
    /// Per-client request cap reached for the current window
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after_secs: u64,
    },

    /// Daily word budget would be exceeded
    #[error("daily translation quota exceeded ({remaining} words remaining today)")]
    QuotaExceeded { remaining: u64 },

    /// Another orchestration is already running in this session
    #[error("a translation is already in progress")]
    Busy,

    // ==========================================================================
    // Provider Errors
    // ==========================================================================
    /// Upstream translation API answered with a failure status
    #[error("{provider} request failed{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// Upstream call exceeded its deadline
    #[error("{provider} request timed out")]
    Timeout { provider: String },

    /// Upstream returned success but no usable translation
    #[error("{provider} returned an unusable response: {message}")]
    MalformedResponse { provider: String, message: String },

    // ==========================================================================
    // Document Errors
    // ==========================================================================
    /// Remote or uploaded document failed type, size or signature checks
    #[error("document rejected: {0}")]
    DocumentRejected(String),

    /// No usable text could be extracted from the document
    #[error("text extraction failed: {0}")]
    Extraction(String),

    // ==========================================================================
    // Storage & Configuration Errors
    // ==========================================================================
    /// Key-value store failure (open, read, write)
    #[error("store error: {0}")]
    Store(String),

    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server-side fault that is not the client's doing
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn provider(provider: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// HTTP-equivalent status for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::DocumentRejected(_) | Self::Extraction(_) => 400,
            Self::UrlNotAllowed(_) => 403,
            Self::Busy => 409,
            Self::RateLimited { .. } | Self::QuotaExceeded { .. } => 429,
            Self::Provider { status: Some(429), .. } => 429,
            Self::Timeout { .. } => 504,
            Self::Provider { .. }
            | Self::MalformedResponse { .. }
            | Self::Store(_)
            | Self::ConfigLoad(_)
            | Self::ConfigInvalid { .. }
            | Self::Io(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Whether the next configured provider should be tried after this error.
    pub const fn is_fallback_eligible(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Timeout { .. })
    }

    /// Remediation hint shown alongside the error message.
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Check the submitted text, language and URL, then try again.",
            Self::UrlNotAllowed(_) => {
                "Use an https Google Docs export link (File > Download > PDF) or upload the PDF directly."
            }
            Self::RateLimited { .. } => "Too many requests. Wait for the current window to pass before retrying.",
            Self::QuotaExceeded { .. } => {
                "The daily translation quota is used up. Try a shorter document or come back tomorrow."
            }
            Self::Busy => "Wait for the current translation to finish before starting another one.",
            Self::Provider { status: Some(429), .. } => {
                "The translation service is throttling requests. Try again in a few minutes."
            }
            Self::Provider { .. } => "The translation service is unavailable. Try again later.",
            Self::Timeout { .. } => {
                "The translation service may be overloaded. Try again in a few moments."
            }
            Self::MalformedResponse { .. } => {
                "The translation service returned no translation. Try again or switch provider."
            }
            Self::DocumentRejected(_) => "Make sure the link points to a reachable PDF under the size limit.",
            Self::Extraction(_) => {
                "The document may be a scanned image. Run it through OCR or use a PDF with selectable text."
            }
            Self::Store(_) => "Local state could not be read or written. Check the cache directory permissions.",
            Self::ConfigLoad(_) | Self::ConfigInvalid { .. } => "Fix the configuration file and restart.",
            Self::Io(_) => "Check file paths and permissions.",
            Self::Internal(_) => "Try again later. If the problem persists, report the reference shown.",
        }
    }

    /// Message safe to send to a remote client.
    ///
    /// Client errors carry their detail; server-side failures collapse to a
    /// generic message.
    pub fn public_message(&self) -> String {
        match self.status_code() {
            500 => "Internal error while processing the request. Please try again later.".to_string(),
            504 => "The translation service timed out. Please try again in a few moments.".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
