use crate::config::Lang;
use crate::document::DocumentId;

/// Cache key for a translated document.
///
/// Keys are opaque MD5 hashes of the document identity and language pair:
/// - Same document + source (or "auto") + target = same key
/// - Language codes are compared case-insensitively
/// - Keys are fixed-length (32 hex chars) for consistent storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn new(doc_id: &DocumentId, source_lang: Option<&Lang>, target_lang: &Lang) -> Self {
        let source = source_lang.map_or_else(|| "AUTO".to_string(), Lang::normalized);

        // Null byte separators prevent collisions between inputs like
        // ("a", "bc") and ("ab", "c").
        let combined = format!(
            "{}\0{}\0{}",
            doc_id.as_str(),
            source,
            target_lang.normalized(),
        );

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}
