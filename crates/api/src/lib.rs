mod config;

use std::sync::Arc;

use anyhow::Result;
use axum::body::{Body, Bytes};
use axum::extract::{Json, State};
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use gateway_agents::{AgentSettings, ChatAgent};
use gateway_core::{AiResponse, ChatRequest};
use gateway_observability::{AppMetrics, MetricsSnapshot};
use gateway_upstream::{GeminiClient, Upstream};
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use config::ApiConfig;

pub const REQUEST_PARSE_FAILURE_MESSAGE: &str = "Failed to parse request";

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<ChatAgent<Upstream>>,
    pub metrics: Arc<AppMetrics>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    model: String,
    metrics: MetricsSnapshot,
}

/// Router backed by the Gemini REST client.
pub fn build_app(config: &ApiConfig) -> Result<Router> {
    let client = GeminiClient::with_timeouts(
        config.gemini_base_url.as_str(),
        config.upstream_connect_timeout,
        config.upstream_timeout,
    )?;

    Ok(build_app_with_upstream(config, Upstream::gemini(client)))
}

pub fn build_app_with_upstream(config: &ApiConfig, upstream: Upstream) -> Router {
    let metrics = AppMetrics::shared();
    let settings = AgentSettings {
        model: config.gemini_model.clone(),
        ..AgentSettings::default()
    };
    let agent = Arc::new(ChatAgent::new(
        Arc::new(upstream),
        settings,
        metrics.clone(),
    ));

    build_router(ApiState { agent, metrics }, config.max_body_bytes)
}

pub fn build_router(state: ApiState, max_body_bytes: usize) -> Router {
    let chat_route = post(chat)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route("/", chat_route.clone())
        .route("/chat", chat_route)
        .route("/health", get(health))
        .fallback(not_found)
        .layer(middleware::from_fn(cors_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

async fn chat(State(state): State<ApiState>, body: Bytes) -> Response {
    let request = match serde_json::from_slice::<ChatRequest>(&body) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "error handling chat request");
            return (
                StatusCode::BAD_REQUEST,
                Json(AiResponse::failure(
                    REQUEST_PARSE_FAILURE_MESSAGE,
                    Some(err.to_string()),
                )),
            )
                .into_response();
        }
    };

    let response = state.agent.respond(request).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    (status, Json(response)).into_response()
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "Only POST method is allowed" })),
    )
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        model: state.agent.settings().model.clone(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn cors_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );

    response
}
