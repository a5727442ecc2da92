//! RugIntel producer API server
//!
//! Serves fused rugpull predictions over HTTP/JSON.
//!
//! Usage:
//!   cargo run --bin rugintel_api
//!
//! Environment:
//!   PORT / RUGINTEL_PORT - Server port (default: 8080)
//!   RUGINTEL_HOST        - Server host (default: 0.0.0.0)
//!   RUGINTEL_API_KEYS    - Comma-separated requester allow list (empty = open)
//!   RUST_LOG             - Log level (default: info)

use rugintel::api::{create_router, start_cleanup_task, AppState};
use rugintel::{FusionEngine, RugIntelConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = RugIntelConfig::from_env();
    config.validate()?;

    let engine = Arc::new(FusionEngine::from_config(&config)?);
    let state = Arc::new(AppState::new(
        engine,
        config.cache_ttl,
        config.api_keys.clone(),
    ));

    let cleanup = start_cleanup_task(Arc::clone(&state));
    info!("🧹 Background cache cleanup started");

    if state.is_open() {
        warn!("RUGINTEL_API_KEYS not set, accepting requests from anyone");
    } else {
        info!(keys = state.api_keys.len(), "🔑 Requester allow list active");
    }

    let app = create_router(Arc::clone(&state));
    let addr = config.bind_addr();

    info!("🚀 RugIntel API starting on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /v1/predict - Fused rugpull prediction");
    info!("  GET  /v1/stats   - Serving statistics");
    info!("  GET  /v1/health  - Health check");

    let listener = TcpListener::bind(&addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    cleanup.abort();

    let stats = state.stats.snapshot();
    info!("🛑 Shutdown signal received");
    info!("   Total analyzed: {}", stats.total_analyzed);
    info!("   High risk: {}", stats.high_risk_count);
    info!("   Fallbacks: {}", stats.fallback_count);
    info!("👋 RugIntel API shutdown complete");

    Ok(())
}
