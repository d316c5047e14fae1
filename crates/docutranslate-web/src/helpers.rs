//! Helper types for cleaner route handlers.
//!
//! Converts core errors into JSON error responses and extracts the client
//! identity used for rate limiting.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use docutranslate_core::Error;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, warn};
use uuid::Uuid;

/// Standard result type for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// A core error on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    hint: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server-side failures are logged in full; the client gets a
        // reference to quote instead of the details
        let reference = if status.is_server_error() {
            let reference = Uuid::new_v4().to_string();
            error!("Request failed [{}]: {}", reference, self.0);
            Some(reference)
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self.0);
            None
        };

        let body = ErrorBody {
            error: self.0.public_message(),
            hint: self.0.hint(),
            reference,
        };
        let mut response = (status, Json(body)).into_response();

        if let Error::RateLimited { retry_after_secs, .. } = self.0 {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

/// Plain `{error}` response for protocol-level failures
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Parse a JSON request body; anything unparsable is a validation error
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError(Error::Validation(format!("Invalid JSON body: {e}"))))
}

/// First `X-Forwarded-For` entry, else `Client-IP`, else "unknown"
pub fn client_identity(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let client_ip = headers
        .get("client-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded.or(client_ip).unwrap_or("unknown").to_string()
}
