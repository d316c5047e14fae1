//! `POST /api/fetch-doc` - download a PDF from an allow-listed host.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use docutranslate_core::{Error, FetchedDocument};
use docutranslate_core::util::redact_client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::helpers::{ApiError, ApiResult, client_identity, parse_body};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchDocBody {
    #[serde(default)]
    pub url: Option<String>,
}

pub async fn fetch_doc(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> ApiResult<Response> {
    let client = client_identity(&headers);
    state.fetch_limiter.check(&client).await?.into_result()?;

    let body: FetchDocBody = parse_body(&body)?;
    let url = body
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError(Error::Validation("URL missing".to_string())))?;

    let document = state.fetcher.fetch(&url).await?;
    info!(
        "Fetched {} bytes for client {}",
        document.bytes.len(),
        redact_client(&client)
    );

    pdf_response(document)
}

fn pdf_response(document: FetchedDocument) -> ApiResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, document.content_type)
        .header(header::CONTENT_DISPOSITION, "inline; filename=\"document.pdf\"")
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from(document.bytes))
        .map_err(|e| ApiError(Error::Internal(format!("failed to build document response: {e}"))))
}
