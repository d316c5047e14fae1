use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::http::{build_client, endpoint_label, read_json, send};
use super::lang::{Direction, LanguageMap};
use super::traits::{ChunkTranslation, SourceLang, TranslationProvider, TranslatorInfo};
use crate::config::{Lang, ProviderConfig, ProviderKind};
use crate::error::{Error, Result};

/// LibreTranslate translator (public or self-hosted instance)
pub struct LibreTranslator {
    client: Client,
    label: String,
    api_base: String,
    api_key: Option<String>,
    languages: Arc<LanguageMap>,
}

#[derive(Debug, Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: String,
    target: String,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibreResponse {
    #[serde(default)]
    translated_text: Option<String>,
    #[serde(default)]
    detected_language: Option<DetectedLanguage>,
}

#[derive(Debug, Deserialize)]
struct DetectedLanguage {
    language: String,
}

impl LibreTranslator {
    pub fn new(config: &ProviderConfig, languages: Arc<LanguageMap>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout())?,
            label: endpoint_label("LibreTranslate", &config.api_base),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            languages,
        })
    }
}

#[async_trait]
impl TranslationProvider for LibreTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "LibreTranslate",
            requires_api_key: false,
            supports_auto_detect: true,
            max_chunk_len: 450,
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
        let source = match source.explicit() {
            Some(lang) => self
                .languages
                .provider_code(lang, ProviderKind::Libre, Direction::Source)?,
            None => "auto".to_string(),
        };
        let request = LibreRequest {
            q: text,
            source,
            target: self
                .languages
                .provider_code(target, ProviderKind::Libre, Direction::Target)?,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        debug!("{}: translating {} chars", self.label, text.chars().count());

        let response = send(
            &self.label,
            self.client
                .post(format!("{}/translate", self.api_base))
                .json(&request),
        )
        .await?;
        let body: LibreResponse = read_json(&self.label, response).await?;

        let text = body
            .translated_text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::malformed(&self.label, "no translatedText in response"))?;

        Ok(ChunkTranslation {
            text,
            detected_source: body.detected_language.map(|d| d.language.to_uppercase()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn translator(server: &mockito::Server) -> LibreTranslator {
        let config = ProviderConfig::new(ProviderKind::Libre, server.url(), None);
        LibreTranslator::new(&config, Arc::new(LanguageMap::default())).unwrap()
    }

    #[tokio::test]
    async fn test_detected_source_is_sent_as_auto() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/translate")
            .match_body(Matcher::Json(json!({
                "q": "Hello world",
                "source": "auto",
                "target": "fr",
                "format": "text"
            })))
            .with_status(200)
            .with_body(r#"{"translatedText":"Bonjour le monde","detectedLanguage":{"confidence":90,"language":"en"}}"#)
            .create_async()
            .await;

        let result = translator(&server)
            .translate_chunk("Hello world", &SourceLang::Detected(Lang::new("EN")), &Lang::new("FR"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.text, "Bonjour le monde");
        assert_eq!(result.detected_source.as_deref(), Some("EN"));
    }

    #[tokio::test]
    async fn test_missing_translated_text_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/translate")
            .with_status(200)
            .with_body(r#"{"detectedLanguage":{"language":"en"}}"#)
            .create_async()
            .await;

        let err = translator(&server)
            .translate_chunk("Hello", &SourceLang::Detected(Lang::new("EN")), &Lang::new("FR"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/translate")
            .with_status(503)
            .with_body(r#"{"error":"Slow down"}"#)
            .create_async()
            .await;

        let err = translator(&server)
            .translate_chunk("Hello", &SourceLang::Explicit(Lang::new("EN")), &Lang::new("FR"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { status: Some(503), .. }));
        assert!(err.is_fallback_eligible());
    }
}
