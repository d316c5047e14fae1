use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{Lang, ProviderKind};
use crate::error::{Error, Result};

/// Whether a code is used as the source or the target of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Source,
    Target,
}

/// Supported languages: DeepL-style code (upper case, optional region) to
/// ISO 639-1 code used by the LibreTranslate and MyMemory dialects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageMap(BTreeMap<String, String>);

impl Default for LanguageMap {
    fn default() -> Self {
        Self::from_pairs(&[
            ("DE", "de"),
            ("EN", "en"),
            ("ES", "es"),
            ("FR", "fr"),
            ("IT", "it"),
            ("PT-PT", "pt"),
            ("PT-BR", "pt"),
            ("RU", "ru"),
            ("TR", "tr"),
        ])
    }
}

impl LanguageMap {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(deepl, iso)| (deepl.to_uppercase(), iso.to_lowercase()))
                .collect(),
        )
    }

    pub fn is_supported(&self, lang: &Lang) -> bool {
        self.iso(lang).is_some()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Look up by DeepL code, by base language ("PT" matches "PT-PT") or by
    /// ISO code ("fr").
    fn iso(&self, lang: &Lang) -> Option<&str> {
        let code = lang.normalized();
        if let Some(iso) = self.0.get(&code) {
            return Some(iso);
        }
        let lower = code.to_lowercase();
        self.0
            .iter()
            .find(|(deepl, iso)| deepl.split('-').next() == Some(code.as_str()) || **iso == lower)
            .map(|(_, iso)| iso.as_str())
    }

    /// Reject languages outside the table with a message listing what is
    /// available.
    pub fn ensure_supported(&self, lang: &Lang) -> Result<()> {
        if self.is_supported(lang) {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Unsupported language '{}'. Available languages: {}",
                lang,
                self.codes().join(", ")
            )))
        }
    }

    /// Code to send to a provider of the given dialect
    pub fn provider_code(&self, lang: &Lang, kind: ProviderKind, direction: Direction) -> Result<String> {
        self.ensure_supported(lang)?;
        let code = lang.normalized();
        Ok(match (kind, direction) {
            // DeepL source languages carry no regional variant
            (ProviderKind::DeepL, Direction::Source) => {
                code.split('-').next().unwrap_or(&code).to_string()
            }
            (ProviderKind::DeepL | ProviderKind::Proxy, _) => code,
            (ProviderKind::Libre | ProviderKind::MyMemory, _) => {
                self.iso(lang).unwrap_or_default().to_string()
            }
        })
    }
}
