//! HTTP API server implementation

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Json, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::core::config::GatewayConfig;
use crate::core::errors::{GatewayError, GENERIC_FAILURE_MESSAGE};
use crate::core::models::{RateDecision, TranslationRequest};
use crate::core::pipeline::TranslationPipeline;

const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Application state
pub struct AppState {
    pipeline: Arc<TranslationPipeline>,
    max_text_chars: usize,
    trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(pipeline: Arc<TranslationPipeline>, config: &GatewayConfig) -> Self {
        Self {
            pipeline,
            max_text_chars: config.max_text_chars,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }
}

/// Health check response
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
    cache_backend: String,
}

/// Successful translation
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Rate limit rejection
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedResponse {
    pub error: String,
    /// RFC 3339 time at which the client's window resets
    pub reset_at: String,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Translation API",
        description = "Translate text into a target language using a generative model."
    ),
    paths(translate, health_check),
    components(schemas(
        TranslationRequest,
        TranslateResponse,
        ErrorResponse,
        RateLimitedResponse,
        HealthResponse
    ))
)]
pub struct ApiDoc;

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// `RateLimit-*` headers describing the client's current window
fn rate_limit_headers(decision: &RateDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("ratelimit-limit"),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-remaining"),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        HeaderName::from_static("ratelimit-reset"),
        HeaderValue::from(decision.reset_after_secs()),
    );
    headers
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Validation { message } => error_body(StatusCode::BAD_REQUEST, message),
            GatewayError::RateLimited { decision } => {
                let mut headers = rate_limit_headers(&decision);
                headers.insert(
                    axum::http::header::RETRY_AFTER,
                    HeaderValue::from(decision.reset_after_secs()),
                );
                let body = RateLimitedResponse {
                    error: RATE_LIMIT_MESSAGE.to_string(),
                    reset_at: decision.reset_at.to_rfc3339(),
                };
                (StatusCode::TOO_MANY_REQUESTS, headers, Json(body)).into_response()
            }
            GatewayError::TranslationFailure => {
                error_body(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE_MESSAGE)
            }
        }
    }
}

/// Client identity used for rate limiting
fn client_id(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Health check handler
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_backend: state.pipeline.store_name().to_string(),
    })
}

/// Translation handler
#[utoipa::path(
    post,
    path = "/translate",
    request_body = TranslationRequest,
    responses(
        (status = 200, description = "Text translated", body = TranslateResponse),
        (status = 400, description = "Missing or empty text or targetLang", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = RateLimitedResponse),
        (status = 500, description = "Translation failed", body = ErrorResponse)
    )
)]
async fn translate(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<TranslationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!("Rejected request body: {}", rejection.body_text());
            return error_body(StatusCode::BAD_REQUEST, "Request body must be a JSON object.");
        }
    };

    if state.max_text_chars > 0 && request.text.chars().count() > state.max_text_chars {
        return error_body(
            StatusCode::BAD_REQUEST,
            format!(
                "Text exceeds the maximum length of {} characters.",
                state.max_text_chars
            ),
        );
    }

    let client = client_id(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.trust_forwarded_for,
    );

    match state.pipeline.translate(&client, &request).await {
        Ok(translated) => (
            StatusCode::OK,
            rate_limit_headers(&translated.rate),
            Json(TranslateResponse {
                translated_text: translated.result.text,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/translate", post(translate))
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

/// Periodically drop elapsed rate windows and expired cache entries
fn spawn_sweeper(pipeline: Arc<TranslationPipeline>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let (windows, entries) = pipeline.purge_expired().await;
            debug!("Swept {} rate windows and {} cache entries", windows, entries);
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the HTTP server
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    let pipeline = Arc::new(TranslationPipeline::from_config(&config).await?);
    spawn_sweeper(pipeline.clone(), config.rate_limit_window());

    let state = Arc::new(AppState::new(pipeline, &config));
    let app = router(state);

    // Bind address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_prefers_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));
        let peer: SocketAddr = "192.0.2.1:4000".parse().unwrap();

        assert_eq!(client_id(&headers, Some(peer), false), "192.0.2.1");
    }

    #[test]
    fn test_client_id_uses_first_forwarded_hop_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        let peer: SocketAddr = "192.0.2.1:4000".parse().unwrap();

        assert_eq!(client_id(&headers, Some(peer), true), "203.0.113.7");
        assert_eq!(client_id(&HeaderMap::new(), Some(peer), true), "192.0.2.1");
        assert_eq!(client_id(&HeaderMap::new(), None, false), "unknown");
    }

    #[test]
    fn test_openapi_documents_translate() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/translate"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
