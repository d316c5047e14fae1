use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::http::{build_client, endpoint_label, read_json, send};
use super::lang::{Direction, LanguageMap};
use super::traits::{ChunkTranslation, SourceLang, TranslationProvider, TranslatorInfo};
use crate::config::{Lang, ProviderConfig, ProviderKind};
use crate::error::{Error, Result};

/// MyMemory translator. Has no auto-detection, so it always sends the
/// caller's source language (explicit or detected).
pub struct MyMemoryTranslator {
    client: Client,
    label: String,
    api_base: String,
    api_key: Option<String>,
    languages: Arc<LanguageMap>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    #[serde(default)]
    response_data: Option<ResponseData>,
    // Either a number or a numeric string depending on the error path
    #[serde(default)]
    response_status: Option<serde_json::Value>,
    #[serde(default)]
    response_details: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    #[serde(default)]
    translated_text: Option<String>,
}

fn status_of(value: Option<&serde_json::Value>) -> Option<u16> {
    match value? {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl MyMemoryTranslator {
    pub fn new(config: &ProviderConfig, languages: Arc<LanguageMap>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout())?,
            label: endpoint_label("MyMemory", &config.api_base),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            languages,
        })
    }
}

#[async_trait]
impl TranslationProvider for MyMemoryTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "MyMemory",
            requires_api_key: false,
            supports_auto_detect: false,
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
        let source_code = self
            .languages
            .provider_code(source.lang(), ProviderKind::MyMemory, Direction::Source)?;
        let target_code = self
            .languages
            .provider_code(target, ProviderKind::MyMemory, Direction::Target)?;

        let mut query = vec![
            ("q", text.to_string()),
            ("langpair", format!("{source_code}|{target_code}")),
        ];
        if let Some(ref key) = self.api_key {
            query.push(("key", key.clone()));
        }

        debug!("{}: translating {} chars", self.label, text.chars().count());

        let response = send(
            &self.label,
            self.client.get(format!("{}/get", self.api_base)).query(&query),
        )
        .await?;
        let body: MyMemoryResponse = read_json(&self.label, response).await?;

        // MyMemory reports quota and length errors with HTTP 200
        if let Some(status) = status_of(body.response_status.as_ref())
            && status != 200
        {
            return Err(Error::provider(
                &self.label,
                Some(status),
                body.response_details.unwrap_or_else(|| "request rejected".to_string()),
            ));
        }

        let text = body
            .response_data
            .and_then(|d| d.translated_text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::malformed(&self.label, "no translatedText in response"))?;

        Ok(ChunkTranslation {
            text,
            detected_source: Some(source.lang().normalized()),
        })
    }
}
