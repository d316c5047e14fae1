use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};

// Google document ids are long runs of URL-safe base64 characters
#[allow(clippy::expect_used)]
static GOOGLE_DOC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-A-Za-z0-9_]{25,}").expect("document id pattern is valid"));

/// Stable identity of a source document, used to key the translation cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity of a local upload: file name plus size in bytes
    pub fn from_upload(file_name: &str, size: u64) -> Self {
        Self(format!("{file_name}-{size}"))
    }

    /// Extract the document id from any Google Docs link (edit, view or export)
    pub fn from_google_url(url: &str) -> Result<Self> {
        GOOGLE_DOC_ID
            .find(url)
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| Error::Validation("Invalid Google Docs URL: no document id found".to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// PDF export link for a Google document
pub fn google_export_url(id: &DocumentId) -> String {
    format!("https://docs.google.com/document/d/{id}/export?format=pdf")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_identity() {
        assert_eq!(DocumentId::from_upload("report.pdf", 20480).as_str(), "report.pdf-20480");
    }

    #[test]
    fn test_google_id_from_edit_link() {
        let id = DocumentId::from_google_url(
            "https://docs.google.com/document/d/1AbCdEfGhIjKlMnOpQrStUvWxYz_-0123/edit?usp=sharing",
        )
        .unwrap();
        assert_eq!(id.as_str(), "1AbCdEfGhIjKlMnOpQrStUvWxYz_-0123");
        assert_eq!(
            google_export_url(&id),
            "https://docs.google.com/document/d/1AbCdEfGhIjKlMnOpQrStUvWxYz_-0123/export?format=pdf"
        );
    }

    #[test]
    fn test_short_link_has_no_id() {
        let err = DocumentId::from_google_url("https://docs.google.com/document/d/short/edit").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
