use bytes::{Bytes, BytesMut};
use reqwest::{Client, Url, header};
use tracing::{debug, info};

use super::extract::PDF_SIGNATURE;
use crate::config::FetchConfig;
use crate::error::{Error, Result};

/// A downloaded document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Downloads remote PDFs from allow-listed hosts
pub struct DocumentFetcher {
    client: Client,
    config: FetchConfig,
}

impl DocumentFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent("DocuTranslate/1.0")
            .build()
            .map_err(|e| Error::ConfigInvalid {
                field: "fetch".to_string(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Check a URL against the fetch policy without touching the network
    pub fn validate_url(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim()).map_err(|_| Error::Validation("Invalid URL".to_string()))?;

        let scheme_allowed = match url.scheme() {
            "https" => true,
            "http" => self.config.allow_http,
            _ => false,
        };
        if !scheme_allowed {
            return Err(Error::UrlNotAllowed("only HTTPS URLs are allowed".to_string()));
        }

        let host = url.host_str().unwrap_or_default();
        if !self.config.allowed_hosts.iter().any(|allowed| allowed == host) {
            return Err(Error::UrlNotAllowed(format!(
                "domain not allowed. Allowed domains: {}",
                self.config.allowed_hosts.join(", ")
            )));
        }

        if host == "docs.google.com" && !url.path().contains("/export") {
            return Err(Error::UrlNotAllowed(
                "invalid Google Docs URL, use an export URL".to_string(),
            ));
        }

        Ok(url)
    }

    /// Validate then download a document
    pub async fn fetch(&self, raw: &str) -> Result<FetchedDocument> {
        let url = self.validate_url(raw)?;
        self.download(url).await
    }

    async fn download(&self, url: Url) -> Result<FetchedDocument> {
        let host = url.host_str().unwrap_or_default().to_string();
        info!("Fetching document from {}", host);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(&host, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DocumentRejected(format!("upstream answered HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/pdf") {
            return Err(Error::DocumentRejected("the document must be a PDF".to_string()));
        }

        let max = self.config.max_document_bytes;
        if response.content_length().is_some_and(|len| len > max) {
            return Err(too_large(max));
        }

        // Content-Length can be absent or wrong, so count while streaming
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(&host, &e))? {
            if (body.len() + chunk.len()) as u64 > max {
                return Err(too_large(max));
            }
            body.extend_from_slice(&chunk);
        }

        if !body.starts_with(PDF_SIGNATURE) {
            return Err(Error::DocumentRejected("the file is not a valid PDF".to_string()));
        }

        debug!("Fetched {} bytes from {}", body.len(), host);
        Ok(FetchedDocument {
            bytes: body.freeze(),
            content_type,
        })
    }
}

fn too_large(max: u64) -> Error {
    Error::DocumentRejected(format!("file too large. Maximum size: {} MB", max / 1024 / 1024))
}

/// Every failed download is the caller's bad document, timeouts included
fn transport_error(host: &str, e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::DocumentRejected(format!("download from {host} timed out"))
    } else {
        Error::DocumentRejected(format!("download failed: {e}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fetcher(max_document_bytes: u64) -> DocumentFetcher {
        DocumentFetcher::new(FetchConfig {
            max_document_bytes,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    fn mock_url(server: &mockito::Server, path: &str) -> Url {
        Url::parse(&format!("{}{}", server.url(), path)).unwrap()
    }

    #[test]
    fn test_export_url_is_allowed() {
        let url = fetcher(1024)
            .validate_url("https://docs.google.com/document/d/abc/export?format=pdf")
            .unwrap();
        assert_eq!(url.host_str(), Some("docs.google.com"));
        assert!(fetcher(1024).validate_url("https://drive.google.com/uc?id=abc").is_ok());
    }

    #[test]
    fn test_foreign_host_is_forbidden() {
        let err = fetcher(1024).validate_url("https://evil.example.com/doc.pdf").unwrap_err();
        assert!(matches!(err, Error::UrlNotAllowed(_)));
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_policy_violations() {
        let f = fetcher(1024);
        assert_eq!(f.validate_url("not a url").unwrap_err().status_code(), 400);
        assert_eq!(
            f.validate_url("http://docs.google.com/document/d/abc/export").unwrap_err().status_code(),
            403
        );
        assert_eq!(
            f.validate_url("https://docs.google.com/document/d/abc/edit").unwrap_err().status_code(),
            403
        );
    }

    #[tokio::test]
    async fn test_download_pdf() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/doc")
            .match_header("user-agent", "DocuTranslate/1.0")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.5 body")
            .create_async()
            .await;

        let doc = fetcher(1024).download(mock_url(&server, "/doc")).await.unwrap();
        mock.assert_async().await;
        assert_eq!(doc.content_type, "application/pdf");
        assert_eq!(&doc.bytes[..], b"%PDF-1.5 body");
    }

    #[tokio::test]
    async fn test_download_rejects_html() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/doc")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>sign in</html>")
            .create_async()
            .await;

        let err = fetcher(1024).download(mock_url(&server, "/doc")).await.unwrap_err();
        assert!(matches!(err, Error::DocumentRejected(_)));
    }

    #[tokio::test]
    async fn test_download_rejects_bad_signature() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/doc")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("GIF89a")
            .create_async()
            .await;

        let err = fetcher(1024).download(mock_url(&server, "/doc")).await.unwrap_err();
        assert!(err.to_string().contains("not a valid PDF"));
    }

    #[tokio::test]
    async fn test_download_enforces_size_cap() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/doc")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(format!("%PDF-{}", "x".repeat(2048)))
            .create_async()
            .await;

        let err = fetcher(1024).download(mock_url(&server, "/doc")).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out_as_rejected_document() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/doc")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_chunked_body(|w| {
                std::thread::sleep(std::time::Duration::from_secs(3));
                w.write_all(b"%PDF-1.5 late")
            })
            .create_async()
            .await;

        let fetcher = DocumentFetcher::new(FetchConfig {
            timeout_secs: 1,
            ..FetchConfig::default()
        })
        .unwrap();
        let err = fetcher.download(mock_url(&server, "/doc")).await.unwrap_err();
        assert!(matches!(err, Error::DocumentRejected(_)));
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_http_only_when_enabled() {
        let strict = fetcher(1024);
        assert!(strict.validate_url("http://127.0.0.1:1234/doc.pdf").is_err());

        let local = DocumentFetcher::new(FetchConfig {
            allowed_hosts: vec!["127.0.0.1".to_string()],
            allow_http: true,
            ..FetchConfig::default()
        })
        .unwrap();
        assert!(local.validate_url("http://127.0.0.1:1234/doc.pdf").is_ok());
        assert!(local.validate_url("ftp://127.0.0.1/doc.pdf").is_err());
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/doc").with_status(404).create_async().await;

        let err = fetcher(1024).download(mock_url(&server, "/doc")).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("404"));
    }
}
