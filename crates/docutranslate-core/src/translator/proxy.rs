use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::http::{build_client, endpoint_label, read_json, send};
use super::lang::{Direction, LanguageMap};
use super::traits::{ChunkTranslation, SourceLang, TranslationProvider, TranslationsResponse, TranslatorInfo};
use crate::config::{Lang, ProviderConfig, ProviderKind};
use crate::error::{Error, Result};

/// Another docutranslate proxy, spoken to through its `/api/translate` route.
pub struct ProxyTranslator {
    client: Client,
    label: String,
    api_base: String,
    languages: Arc<LanguageMap>,
}

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_lang: Option<String>,
    target_lang: String,
}

impl ProxyTranslator {
    pub fn new(config: &ProviderConfig, languages: Arc<LanguageMap>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout())?,
            label: endpoint_label("Proxy", &config.api_base),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            languages,
        })
    }
}

#[async_trait]
impl TranslationProvider for ProxyTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "Proxy",
            requires_api_key: false,
            supports_auto_detect: true,
            max_chunk_len: 500,
        }
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn translate_chunk(
        &self,
        text: &str,
        source: &SourceLang,
        target: &Lang,
    ) -> Result<ChunkTranslation> {
        let source_lang = source
            .explicit()
            .map(|lang| self.languages.provider_code(lang, ProviderKind::Proxy, Direction::Source))
            .transpose()?;
        let request = ProxyRequest {
            text,
            source_lang,
            target_lang: self
                .languages
                .provider_code(target, ProviderKind::Proxy, Direction::Target)?,
        };

        debug!("{}: translating {} chars", self.label, text.chars().count());

        let response = send(
            &self.label,
            self.client
                .post(format!("{}/api/translate", self.api_base))
                .json(&request),
        )
        .await?;
        let body: TranslationsResponse = read_json(&self.label, response).await?;

        let item = body
            .translations
            .into_iter()
            .next()
            .filter(|item| !item.text.trim().is_empty())
            .ok_or_else(|| Error::malformed(&self.label, "no translations in response"))?;

        Ok(ChunkTranslation {
            text: item.text,
            detected_source: item.detected_source_language,
        })
    }
}
