use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use super::http::{build_client, endpoint_label, read_json, send};
use super::lang::{Direction, LanguageMap};
use super::traits::{ChunkTranslation, SourceLang, TranslationProvider, TranslationsResponse, TranslatorInfo};
use crate::config::{Lang, ProviderConfig, ProviderKind};
use crate::error::{Error, Result};

/// DeepL API translator (free and pro endpoints)
pub struct DeeplTranslator {
    client: Client,
    label: String,
    api_base: String,
    api_key: String,
    languages: Arc<LanguageMap>,
}

impl DeeplTranslator {
    pub fn new(config: &ProviderConfig, languages: Arc<LanguageMap>) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::ConfigInvalid {
                field: "providers.api_key".to_string(),
                reason: "DeepL requires an API key".to_string(),
            })?;

        Ok(Self {
            client: build_client(config.timeout())?,
            label: endpoint_label("DeepL", &config.api_base),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            languages,
        })
    }
}

#[async_trait]
impl TranslationProvider for DeeplTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "DeepL",
            requires_api_key: true,
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
        let target_code = self
            .languages
            .provider_code(target, ProviderKind::DeepL, Direction::Target)?;

        let mut form = vec![("text", text.to_string()), ("target_lang", target_code)];
        // DeepL detects the source itself when source_lang is omitted
        if let Some(source) = source.explicit() {
            form.push((
                "source_lang",
                self.languages
                    .provider_code(source, ProviderKind::DeepL, Direction::Source)?,
            ));
        }

        debug!("{}: translating {} chars", self.label, text.chars().count());

        let request = self
            .client
            .post(format!("{}/v2/translate", self.api_base))
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&form);

        let response = send(&self.label, request).await?;
        let body: TranslationsResponse = read_json(&self.label, response).await?;

        let item = body
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| Error::malformed(&self.label, "no translations in response"))?;

        Ok(ChunkTranslation {
            text: item.text,
            detected_source: item.detected_source_language,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn translator(server: &mockito::Server) -> DeeplTranslator {
        let config = ProviderConfig::new(ProviderKind::DeepL, server.url(), Some("test-key".into()));
        DeeplTranslator::new(&config, Arc::new(LanguageMap::default())).unwrap()
    }

    #[tokio::test]
    async fn test_translates_chunk() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/translate")
            .match_header("authorization", "DeepL-Auth-Key test-key")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("text".into(), "Hello".into()),
                Matcher::UrlEncoded("target_lang".into(), "FR".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"translations":[{"detected_source_language":"EN","text":"Bonjour"}]}"#)
            .create_async()
            .await;

        let result = translator(&server)
            .translate_chunk("Hello", &SourceLang::Detected(Lang::new("EN")), &Lang::new("FR"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.text, "Bonjour");
        assert_eq!(result.detected_source.as_deref(), Some("EN"));
    }

    #[tokio::test]
    async fn test_explicit_source_is_sent_without_region() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/translate")
            .match_body(Matcher::UrlEncoded("source_lang".into(), "PT".into()))
            .with_status(200)
            .with_body(r#"{"translations":[{"text":"Hello"}]}"#)
            .create_async()
            .await;

        translator(&server)
            .translate_chunk("Olá", &SourceLang::Explicit(Lang::new("PT-BR")), &Lang::new("EN"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_quota_exceeded_status_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/translate")
            .with_status(456)
            .with_body(r#"{"message":"Quota exceeded"}"#)
            .create_async()
            .await;

        let err = translator(&server)
            .translate_chunk("Hello", &SourceLang::Detected(Lang::new("EN")), &Lang::new("FR"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { status: Some(456), .. }));
        assert!(err.to_string().contains("Quota exceeded"));
    }

    #[tokio::test]
    async fn test_empty_translations_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/translate")
            .with_status(200)
            .with_body(r#"{"translations":[]}"#)
            .create_async()
            .await;

        let err = translator(&server)
            .translate_chunk("Hello", &SourceLang::Detected(Lang::new("EN")), &Lang::new("FR"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[test]
    fn test_requires_api_key() {
        let config = ProviderConfig::new(ProviderKind::DeepL, "https://api-free.deepl.com", None);
        assert!(DeeplTranslator::new(&config, Arc::new(LanguageMap::default())).is_err());
    }
}
