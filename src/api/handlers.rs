//! API Request Handlers

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::*;
use crate::core::fusion::{validate_address, FusionEngine};
use crate::models::errors::AppError;
use crate::models::types::AnalysisContext;
use crate::utils::cache::PredictionCache;
use crate::utils::telemetry::StatsCollector;

const CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state
pub struct AppState {
    pub engine: Arc<FusionEngine>,
    pub cache: PredictionCache,
    pub stats: StatsCollector,
    /// Registered requesters; empty means open access
    pub api_keys: HashSet<String>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<FusionEngine>, cache_ttl: Duration, api_keys: Vec<String>) -> Self {
        Self {
            engine,
            cache: PredictionCache::with_ttl(cache_ttl),
            stats: StatsCollector::new(),
            api_keys: api_keys.into_iter().collect(),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn is_open(&self) -> bool {
        self.api_keys.is_empty()
    }
}

/// Background task: drop expired cache entries every minute
pub fn start_cleanup_task(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = state.cache.cleanup_expired();
            if removed > 0 {
                info!(removed, "🧹 Cache cleanup");
            }
        }
    })
}

type ErrorReply = (StatusCode, Json<ApiResponse<()>>);

fn error_reply(err: &AppError, started: Instant) -> ErrorReply {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ApiResponse::error(
            ApiError::from(err),
            started.elapsed().as_secs_f64() * 1000.0,
        )),
    )
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

// ============================================
// Prediction
// ============================================

/// Answers with the bare transport contract so verifiers can parse it
/// without unwrapping an envelope. Only malformed requests get an error
/// body; engine faults surface as the neutral fallback prediction.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ErrorReply> {
    let start = Instant::now();
    let address = req.token_address.trim();

    validate_address(address).map_err(|e| error_reply(&e, start))?;

    let mut ctx = AnalysisContext::new().with_launch_timestamp(req.launch_timestamp);
    if let Some(name) = req.token_name.as_deref() {
        ctx = ctx.with_name(name);
    }
    if let Some(symbol) = req.token_symbol.as_deref() {
        ctx = ctx.with_symbol(symbol);
    }

    let output = match state.cache.get(address, &ctx) {
        Some(cached) => {
            debug!(token = %address, "Serving cached prediction");
            cached
        }
        None => {
            let output = state.engine.analyze(address, &ctx).await;
            state.cache.set(address, &ctx, output.clone());
            output
        }
    };

    let latency_ms = start.elapsed().as_millis() as u64;
    state.stats.record(&output, latency_ms);

    info!(
        token = %address,
        risk_score = output.risk_score,
        level = output.risk_level().as_str(),
        latency_ms,
        "{} Prediction served",
        output.risk_level().emoji()
    );

    Ok(Json(PredictResponse::from(output)))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let snapshot = state.stats.snapshot();

    let data = StatsData {
        total_analyzed: snapshot.total_analyzed,
        high_risk_count: snapshot.high_risk_count,
        fallback_count: snapshot.fallback_count,
        avg_latency_ms: snapshot.avg_latency_ms,
        cache: state.cache.stats(),
        uptime_seconds: state.uptime_seconds(),
        api_version: "v1".to_string(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}
