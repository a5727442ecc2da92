//! RugIntel verifier
//!
//! Each round discovers newly launched tokens, collects predictions from
//! every configured producer, and scores producers whose predictions have
//! matured against what actually happened on-chain.
//!
//! Environment: see `RugIntelConfig::from_env` (RUGINTEL_PRODUCERS,
//! RUGINTEL_DATA_DIR, GROUND_TRUTH_WAIT_HOURS, RUST_LOG, ...)

use rugintel::{RugIntelConfig, Validator};

use eyre::Result;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = RugIntelConfig::from_env();
    config.validate()?;

    if config.producers.is_empty() {
        warn!("⚠️ RUGINTEL_PRODUCERS not set, rounds will only verify pending predictions");
    }

    let mut validator = Validator::from_config(&config)?;
    info!(
        producers = validator.producers().len(),
        pending = validator.pending().len(),
        store = %config.pending_path().display(),
        maturation_hours = config.maturation_window.as_secs() / 3600,
        "🛡️ RugIntel verifier started"
    );

    let mut round: u64 = 0;
    loop {
        round += 1;
        run_round(&mut validator, round).await;

        tokio::select! {
            _ = tokio::time::sleep(config.verification_interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Shutdown signal received");
                break;
            }
        }
    }

    for (producer, scores) in validator.score_history() {
        let avg = scores.iter().sum::<f64>() / scores.len().max(1) as f64;
        info!(producer = %producer, verified = scores.len(), avg_accuracy = avg, "Session summary");
    }
    info!(pending = validator.pending().len(), "👋 RugIntel verifier stopped");

    Ok(())
}

/// One forward + verify pass. Failures are logged and the loop carries on.
async fn run_round(validator: &mut Validator, round: u64) {
    info!(round, "🔄 Round starting");

    match validator.forward().await {
        Ok(recorded) => info!(round, recorded, "Forward pass done"),
        Err(e) => error!(round, code = e.code_str(), error = %e, "Forward pass failed"),
    }

    match validator.verify_pending().await {
        Ok(weights) if weights.is_empty() => {}
        Ok(weights) => {
            let mut ranked: Vec<_> = weights.into_iter().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (producer, accuracy) in ranked {
                info!(round, producer = %producer, accuracy, "⚖️ Producer weight");
            }
        }
        Err(e) => error!(round, code = e.code_str(), error = %e, "Verification pass failed"),
    }
}
