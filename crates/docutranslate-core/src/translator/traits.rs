use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Lang;
use crate::error::Result;

/// Information about a translation backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this backend requires an API key
    pub requires_api_key: bool,
    /// Whether this backend can detect the source language itself
    pub supports_auto_detect: bool,
    /// Longest text accepted in one request, in characters
    pub max_chunk_len: usize,
}

/// Source language as known to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLang {
    /// Chosen by the user
    Explicit(Lang),
    /// Guessed by a detector. Backends that detect on their own ignore it.
    Detected(Lang),
}

impl SourceLang {
    pub const fn explicit(&self) -> Option<&Lang> {
        match self {
            Self::Explicit(lang) => Some(lang),
            Self::Detected(_) => None,
        }
    }

    pub const fn lang(&self) -> &Lang {
        match self {
            Self::Explicit(lang) | Self::Detected(lang) => lang,
        }
    }
}

/// One translated chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTranslation {
    pub text: String,
    pub detected_source: Option<String>,
}

/// DeepL-shaped response body, also spoken by the proxy's `/api/translate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationsResponse {
    pub translations: Vec<TranslationItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationItem {
    pub text: String,
    #[serde(default)]
    pub detected_source_language: Option<String>,
}

impl From<ChunkTranslation> for TranslationsResponse {
    fn from(chunk: ChunkTranslation) -> Self {
        Self {
            translations: vec![TranslationItem {
                text: chunk.text,
                detected_source_language: chunk.detected_source,
            }],
        }
    }
}

/// Trait for translation backends
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Get information about this backend
    fn info(&self) -> TranslatorInfo;

    /// Label naming this endpoint in logs and errors
    fn label(&self) -> &str;

    /// Get the backend name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    fn max_chunk_len(&self) -> usize {
        self.info().max_chunk_len
    }

    /// Translate one chunk of text
    async fn translate_chunk(
        &self,
        text: &str,
        source: &SourceLang,
        target: &Lang,
    ) -> Result<ChunkTranslation>;
}
