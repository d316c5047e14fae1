use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::traits::{ChunkTranslation, SourceLang, TranslationProvider, TranslatorInfo};
use crate::config::Lang;
use crate::error::{Error, Result};

/// Ordered provider list. Each chunk goes to the first provider that
/// succeeds; transport failures and timeouts move on to the next one.
pub struct FallbackTranslator {
    providers: Vec<Arc<dyn TranslationProvider>>,
    label: String,
}

impl FallbackTranslator {
    pub fn new(providers: Vec<Arc<dyn TranslationProvider>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::ConfigInvalid {
                field: "providers".to_string(),
                reason: "at least one provider is required".to_string(),
            });
        }
        let label = providers
            .iter()
            .map(|p| p.label())
            .collect::<Vec<_>>()
            .join(" -> ");
        Ok(Self { providers, label })
    }

    pub fn providers(&self) -> &[Arc<dyn TranslationProvider>] {
        &self.providers
    }
}

#[async_trait]
impl TranslationProvider for FallbackTranslator {
    fn info(&self) -> TranslatorInfo {
        let first = self.providers[0].info();
        TranslatorInfo {
            name: first.name,
            requires_api_key: self.providers.iter().all(|p| p.info().requires_api_key),
            supports_auto_detect: self.providers.iter().all(|p| p.info().supports_auto_detect),
            max_chunk_len: self.max_chunk_len(),
        }
    }

    fn label(&self) -> &str {
        &self.label
    }

    /// Chunks must fit every provider that may end up receiving them
    fn max_chunk_len(&self) -> usize {
        self.providers
            .iter()
            .map(|p| p.max_chunk_len())
            .min()
            .unwrap_or(500)
    }

    async fn translate_chunk(
        &self,
        text: &str,
        source: &SourceLang,
        target: &Lang,
    ) -> Result<ChunkTranslation> {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            match provider.translate_chunk(text, source, target).await {
                Ok(translation) => {
                    if i > 0 {
                        info!("Chunk translated by fallback {}", provider.label());
                    }
                    return Ok(translation);
                }
                Err(e) if e.is_fallback_eligible() => {
                    warn!("{} failed: {}", provider.label(), e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| Error::ConfigInvalid {
            field: "providers".to_string(),
            reason: "no provider configured".to_string(),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider: fails with the given error or echoes a prefix
    struct Scripted {
        label: String,
        fail: Option<fn() -> Error>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(label: &str) -> Arc<Self> {
            Arc::new(Self { label: label.into(), fail: None, calls: AtomicUsize::new(0) })
        }

        fn failing(label: &str, fail: fn() -> Error) -> Arc<Self> {
            Arc::new(Self { label: label.into(), fail: Some(fail), calls: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl TranslationProvider for Scripted {
        fn info(&self) -> TranslatorInfo {
            TranslatorInfo {
                name: "Scripted",
                requires_api_key: false,
                supports_auto_detect: true,
                max_chunk_len: if self.label == "short" { 100 } else { 500 },
            }
        }

        fn label(&self) -> &str {
            &self.label
        }

        async fn translate_chunk(&self, text: &str, _: &SourceLang, _: &Lang) -> Result<ChunkTranslation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail {
                Some(fail) => Err(fail()),
                None => Ok(ChunkTranslation {
                    text: format!("{}:{}", self.label, text),
                    detected_source: None,
                }),
            }
        }
    }

    async fn run(translator: &FallbackTranslator) -> Result<ChunkTranslation> {
        translator
            .translate_chunk("hi", &SourceLang::Detected(Lang::new("EN")), &Lang::new("FR"))
            .await
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_next_provider() {
        let first = Scripted::failing("first", || Error::Timeout { provider: "first".into() });
        let second = Scripted::ok("second");
        let providers: Vec<Arc<dyn TranslationProvider>> = vec![first.clone(), second.clone()];
        let translator = FallbackTranslator::new(providers).unwrap();

        let result = run(&translator).await.unwrap();
        assert_eq!(result.text, "second:hi");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_does_not_fall_back() {
        let first = Scripted::failing("first", || Error::malformed("first", "empty"));
        let second = Scripted::ok("second");
        let providers: Vec<Arc<dyn TranslationProvider>> = vec![first, second.clone()];
        let translator = FallbackTranslator::new(providers).unwrap();

        let err = run(&translator).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_last_provider_error_is_returned() {
        let first = Scripted::failing("first", || Error::provider("first", Some(502), "bad gateway"));
        let second = Scripted::failing("second", || Error::provider("second", Some(503), "down"));
        let providers: Vec<Arc<dyn TranslationProvider>> = vec![first, second];
        let translator = FallbackTranslator::new(providers).unwrap();

        let err = run(&translator).await.unwrap_err();
        assert!(matches!(err, Error::Provider { status: Some(503), .. }));
    }

    #[test]
    fn test_chunk_length_is_smallest_of_providers() {
        let providers: Vec<Arc<dyn TranslationProvider>> = vec![Scripted::ok("long"), Scripted::ok("short")];
        let translator = FallbackTranslator::new(providers).unwrap();
        assert_eq!(translator.max_chunk_len(), 100);
        assert_eq!(translator.label(), "long -> short");
    }

    #[test]
    fn test_empty_provider_list_is_rejected() {
        assert!(FallbackTranslator::new(Vec::new()).is_err());
    }
}
