//! API Middleware (Auth, Logging)

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::handlers::AppState;
use super::types::{ApiError, ApiResponse};

pub const API_KEY_HEADER: &str = "X-API-Key";

fn is_health_path(path: &str) -> bool {
    path == "/health" || path == "/v1/health"
}

/// API key allow-list. With no registered keys every requester is let
/// through; otherwise only registered keys may query.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if state.is_open() || is_health_path(request.uri().path()) {
        return next.run(request).await;
    }

    let api_key = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());

    match api_key {
        Some(key) if state.api_keys.contains(key) => next.run(request).await,
        presented => {
            warn!(
                uri = %request.uri(),
                key_present = presented.is_some(),
                "Rejected unregistered requester"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error(ApiError::unauthorized(), 0.0)),
            )
                .into_response()
        }
    }
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    response
}
