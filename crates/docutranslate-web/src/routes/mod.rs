//! HTTP routes for the translation proxy.
//!
//! Both endpoints accept `POST` with a JSON body, answer `OPTIONS`
//! preflights with an empty 200 and reject every other method with 405.

mod fetch_doc;
mod translate;

pub use fetch_doc::fetch_doc;
pub use translate::translate;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::Response,
    routing::post,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::helpers::json_error;
use crate::state::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/fetch-doc",
            post(fetch_doc).options(preflight).fallback(method_not_allowed),
        )
        .route(
            "/api/translate",
            post(translate).options(preflight).fallback(method_not_allowed),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use chrono::{TimeZone, Utc};
    use docutranslate_core::translator::{ChunkTranslation, TranslatorInfo};
    use docutranslate_core::{
        AppConfig, Clock, Lang, LanguageMap, ManualClock, RateLimitConfig, Result, SourceLang,
        TranslationProvider,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct EchoProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranslationProvider for EchoProvider {
        fn info(&self) -> TranslatorInfo {
            TranslatorInfo {
                name: "Echo",
                requires_api_key: false,
                supports_auto_detect: true,
                max_chunk_len: 500,
            }
        }

        fn label(&self) -> &str {
            "echo"
        }

        async fn translate_chunk(&self, text: &str, _: &SourceLang, target: &Lang) -> Result<ChunkTranslation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChunkTranslation {
                text: format!("[{}] {}", target.normalized(), text),
                detected_source: Some("EN".to_string()),
            })
        }
    }

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.chunking.chunk_delay_ms = 0;
        config.server.translate_rate_limit = RateLimitConfig::per_minute(10);
        config
    }

    fn test_app() -> (Router, Arc<EchoProvider>) {
        test_app_with(test_config())
    }

    fn test_app_with(config: AppConfig) -> (Router, Arc<EchoProvider>) {
        let provider = Arc::new(EchoProvider {
            calls: AtomicUsize::new(0),
        });
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()));
        let state = AppState::new(
            config,
            Arc::clone(&provider) as Arc<dyn TranslationProvider>,
            Arc::new(LanguageMap::default()),
            clock,
        )
        .unwrap();
        (router(Arc::new(state)), provider)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_preflight_returns_empty_ok() {
        let (app, _) = test_app();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/translate")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_other_methods_rejected() {
        let (app, _) = test_app();
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/fetch-doc")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json_body(response).await["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_translate_success() {
        let (app, provider) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/translate",
                r#"{"text": "  Hello world.  ", "target_lang": "fr"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");

        let body = json_body(response).await;
        assert_eq!(body["translations"][0]["text"], "[FR] Hello world.");
        assert_eq!(body["translations"][0]["detected_source_language"], "EN");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_translate_empty_text_is_rejected() {
        let (app, provider) = test_app();
        let response = app
            .oneshot(post_json("/api/translate", r#"{"text": "   ", "target_lang": "FR"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No text to translate");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_translate_invalid_json() {
        let (app, _) = test_app();
        let response = app.oneshot(post_json("/api/translate", "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_translate_rate_limited_after_ten() {
        let (app, _) = test_app();
        let body = r#"{"text": "Hello", "target_lang": "DE"}"#;

        for _ in 0..10 {
            let response = app.clone().oneshot(post_json("/api/translate", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(post_json("/api/translate", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_fetch_doc_rejects_foreign_host() {
        let (app, _) = test_app();
        let response = app
            .oneshot(post_json(
                "/api/fetch-doc",
                r#"{"url": "https://evil.example.com/file.pdf"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_fetch_doc_requires_url() {
        let (app, _) = test_app();
        let response = app.oneshot(post_json("/api/fetch-doc", "{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "URL missing");
    }

    #[tokio::test]
    async fn test_fetch_doc_rate_limited_after_ten() {
        let (app, _) = test_app();
        let body = r#"{"url": "https://evil.example.com/file.pdf"}"#;

        // Rejected requests still count against the window
        for _ in 0..10 {
            let response = app.clone().oneshot(post_json("/api/fetch-doc", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }

        let response = app.oneshot(post_json("/api/fetch-doc", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_fetch_doc_rejects_oversized_content_length() {
        let mut server = mockito::Server::new_async().await;
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.resize(256, b'0');
        let mock = server
            .mock("GET", "/doc.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(pdf)
            .create_async()
            .await;

        let mut config = test_config();
        config.fetch.allowed_hosts = vec!["127.0.0.1".to_string()];
        config.fetch.allow_http = true;
        config.fetch.max_document_bytes = 64;
        let (app, _) = test_app_with(config);

        let body = format!(r#"{{"url": "{}/doc.pdf"}}"#, server.url());
        let response = app.oneshot(post_json("/api/fetch-doc", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("too large"), "unexpected error: {error}");
        mock.assert_async().await;
    }
}
