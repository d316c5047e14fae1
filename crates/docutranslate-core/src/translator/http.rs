//! Request plumbing shared by the HTTP provider adapters.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};

/// Longest upstream error body kept in error messages
const MAX_ERROR_BODY: usize = 300;

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent("DocuTranslate/1.0")
        .build()
        .map_err(|e| Error::ConfigInvalid {
            field: "providers".to_string(),
            reason: format!("failed to create HTTP client: {e}"),
        })
}

/// Short label for logs and errors: "LibreTranslate (libretranslate.com)"
pub fn endpoint_label(name: &str, api_base: &str) -> String {
    let host = reqwest::Url::parse(api_base)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| api_base.to_string());
    format!("{name} ({host})")
}

/// Send a request, mapping transport failures and non-2xx statuses
pub async fn send(label: &str, request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            Error::Timeout {
                provider: label.to_string(),
            }
        } else {
            Error::provider(label, None, e.to_string())
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("{} answered HTTP {}: {}", label, status, truncate(&body));
    Err(Error::provider(label, Some(status.as_u16()), error_message(&body, status)))
}

/// Decode a JSON body; decoding failures are malformed responses
pub async fn read_json<T: DeserializeOwned>(label: &str, response: Response) -> Result<T> {
    let body = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            Error::Timeout {
                provider: label.to_string(),
            }
        } else {
            Error::provider(label, None, e.to_string())
        }
    })?;
    serde_json::from_slice(&body).map_err(|e| Error::malformed(label, format!("invalid JSON: {e}")))
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

/// Prefer a JSON `error`/`message` field over the raw body
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = parsed.as_ref().and_then(|v| {
        v.get("error")
            .or_else(|| v.get("message"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    });
    field.unwrap_or_else(|| {
        let text = truncate(body.trim());
        if text.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            text
        }
    })
}
