mod deepl;
mod fallback;
mod http;
mod lang;
mod libre;
mod mymemory;
mod proxy;
mod traits;

pub use deepl::DeeplTranslator;
pub use fallback::FallbackTranslator;
pub use lang::{Direction, LanguageMap};
pub use libre::LibreTranslator;
pub use mymemory::MyMemoryTranslator;
pub use proxy::ProxyTranslator;
pub use traits::{
    ChunkTranslation, SourceLang, TranslationItem, TranslationProvider, TranslationsResponse,
    TranslatorInfo,
};

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::Result;
use std::sync::Arc;

/// Create a single provider from configuration
pub fn create_provider(
    config: &ProviderConfig,
    languages: Arc<LanguageMap>,
) -> Result<Arc<dyn TranslationProvider>> {
    let provider: Arc<dyn TranslationProvider> = match config.kind {
        ProviderKind::DeepL => Arc::new(DeeplTranslator::new(config, languages)?),
        ProviderKind::Libre => Arc::new(LibreTranslator::new(config, languages)?),
        ProviderKind::MyMemory => Arc::new(MyMemoryTranslator::new(config, languages)?),
        ProviderKind::Proxy => Arc::new(ProxyTranslator::new(config, languages)?),
    };
    Ok(provider)
}

/// Create the fallback chain for the configured providers, in order
pub fn create_translator(
    configs: &[ProviderConfig],
    languages: &Arc<LanguageMap>,
) -> Result<FallbackTranslator> {
    let providers = configs
        .iter()
        .map(|config| create_provider(config, Arc::clone(languages)))
        .collect::<Result<Vec<_>>>()?;
    FallbackTranslator::new(providers)
}
