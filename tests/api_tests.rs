use assert_json_diff::assert_json_eq;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use translation_gateway::core::mock::{MockGenerator, MockMode};
use translation_gateway::server::api::{router, AppState};
use translation_gateway::{
    GatewayConfig, MemoryStore, ProviderError, RateLimiter, TranslationPipeline, Translator,
};

fn app(mock: Arc<MockGenerator>, max_requests: u32) -> Router {
    let config = GatewayConfig {
        api_key: "test_key".to_string(),
        max_text_chars: 20,
        ..Default::default()
    };
    let pipeline = TranslationPipeline::new(
        Arc::new(MemoryStore::new()),
        Arc::new(RateLimiter::new(Duration::from_secs(900), max_requests)),
        Translator::new(mock),
    );
    let state = Arc::new(AppState::new(Arc::new(pipeline), &config));

    router(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
}

fn bonjour() -> Arc<MockGenerator> {
    Arc::new(MockGenerator::new(MockMode::Reply("Bonjour".to_string())))
}

fn translate_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/translate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn header(headers: &axum::http::HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn test_translate_then_serve_from_cache() {
    let mock = bonjour();
    let app = app(mock.clone(), 100);
    let body = r#"{"text":"Hello","targetLang":"French"}"#;

    let (status, headers, json) = send(&app, translate_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_json_eq!(json, json!({ "translatedText": "Bonjour" }));
    assert_eq!(header(&headers, "ratelimit-limit"), "100");
    assert_eq!(header(&headers, "ratelimit-remaining"), "99");

    let (status, _, json) = send(&app, translate_request(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_json_eq!(json, json!({ "translatedText": "Bonjour" }));

    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_empty_text_is_rejected_without_consuming_quota() {
    let mock = bonjour();
    let app = app(mock.clone(), 100);

    let (status, _, json) = send(&app, translate_request(r#"{"text":"","targetLang":"French"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, headers, _) =
        send(&app, translate_request(r#"{"text":"Hello","targetLang":"French"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header(&headers, "ratelimit-remaining"), "99");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_missing_field_and_malformed_body_are_bad_requests() {
    let mock = bonjour();
    let app = app(mock.clone(), 100);

    let (status, _, json) = send(&app, translate_request(r#"{"text":"Hello"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, _, json) = send(&app, translate_request("not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_text_over_length_cap_is_rejected() {
    let mock = bonjour();
    let app = app(mock.clone(), 100);

    let (status, _, json) = send(
        &app,
        translate_request(r#"{"text":"This sentence is far too long","targetLang":"French"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("20"));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_provider_failure_returns_generic_error() {
    let mock = Arc::new(MockGenerator::new(MockMode::Error(ProviderError::Api {
        status: 403,
        message: "API key not valid".to_string(),
    })));
    let app = app(mock.clone(), 100);

    let (status, _, json) =
        send(&app, translate_request(r#"{"text":"Hello","targetLang":"French"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_json_eq!(json, json!({ "error": "Failed to translate the text." }));
}

#[tokio::test]
async fn test_rate_limit_exceeded() {
    let mock = bonjour();
    let app = app(mock.clone(), 2);
    let body = r#"{"text":"Hello","targetLang":"French"}"#;

    for _ in 0..2 {
        let (status, _, _) = send(&app, translate_request(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, headers, json) = send(&app, translate_request(body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&headers, "ratelimit-limit"), "2");
    assert_eq!(header(&headers, "ratelimit-remaining"), "0");
    assert_eq!(header(&headers, "ratelimit-reset"), "900");
    assert_eq!(header(&headers, "retry-after"), "900");
    assert!(json["error"].is_string());
    assert!(json["resetAt"].is_string());
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_health_reports_cache_backend() {
    let app = app(bonjour(), 100);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, _, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["cacheBackend"], "memory");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app(bonjour(), 100);
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();

    let (status, _, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/translate"]["post"].is_object());
}
