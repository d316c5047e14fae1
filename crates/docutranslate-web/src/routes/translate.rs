//! `POST /api/translate` - rate-limited translation proxy.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use docutranslate_core::text::LanguageDetector;
use docutranslate_core::translator::ChunkTranslation;
use docutranslate_core::util::redact_client;
use docutranslate_core::{Lang, SourceLang, TranslationsResponse, translate_in_chunks, validate_input};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::helpers::{ApiError, ApiResult, client_identity, parse_body};
use crate::state::AppState;

/// Request body, DeepL-style field names
#[derive(Debug, Deserialize)]
pub struct TranslateBody {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub target_lang: Option<String>,
}

pub async fn translate(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let client = client_identity(&headers);

    let decision = match state.translate_limiter.check(&client).await {
        Ok(decision) => decision,
        Err(e) => return ApiError(e).into_response(),
    };
    let remaining = decision.remaining;

    let mut response = match decision.into_result() {
        Ok(_) => translate_body(&state, &client, &body).await.into_response(),
        Err(e) => ApiError(e).into_response(),
    };
    response
        .headers_mut()
        .insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    response
}

async fn translate_body(state: &AppState, client: &str, body: &[u8]) -> ApiResult<Json<TranslationsResponse>> {
    let body: TranslateBody = parse_body(body)?;

    let text = body.text.unwrap_or_default();
    let text = text.trim();
    let target = Lang::new(body.target_lang.unwrap_or_default());
    let source = body.source_lang.filter(|s| !s.trim().is_empty()).map(Lang::new);

    validate_input(
        text,
        source.as_ref(),
        &target,
        &state.languages,
        state.config.chunking.max_text_length,
    )?;

    info!(
        "Translate: {} chars -> {} (client {})",
        text.chars().count(),
        target.normalized(),
        redact_client(client)
    );

    let source = match source {
        Some(lang) => SourceLang::Explicit(lang),
        None => SourceLang::Detected(state.detector.detect(text)),
    };
    let translated = translate_in_chunks(
        state.translator.as_ref(),
        text,
        &source,
        &target,
        state.chunk_delay(),
        |_, _| {},
    )
    .await?;

    Ok(Json(TranslationsResponse::from(ChunkTranslation {
        text: translated.text,
        detected_source: Some(translated.detected_source),
    })))
}
