//! Market Layer - volume and liquidity anomalies
//!
//! Reads the token's main trading pair. A 5-minute volume far above the
//! hourly average is the classic pump-and-dump footprint.

use serde_json::json;
use std::sync::Arc;

use super::into_evidence;
use crate::models::errors::AppResult;
use crate::models::types::LayerResult;
use crate::providers::{main_pair, DexPair, MarketSource};
use crate::utils::numeric::{round_dp, usd};

/// Market figures read from the main pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    pub volume_5m: f64,
    pub volume_1h: f64,
    pub liquidity_usd: f64,
    pub price_change_5m: f64,
    pub buys_5m: u64,
    pub sells_5m: u64,
}

impl MarketSnapshot {
    pub fn from_pair(pair: &DexPair) -> Self {
        let volume = pair.volume();
        let txns = pair.txns();
        Self {
            volume_5m: volume.m5.unwrap_or(0.0),
            volume_1h: volume.h1.unwrap_or(0.0),
            liquidity_usd: pair.liquidity_usd(),
            price_change_5m: pair.price_change().m5.unwrap_or(0.0),
            buys_5m: txns.m5.buys,
            sells_5m: txns.m5.sells,
        }
    }

    /// 5-minute volume relative to the average 5-minute slice of the last hour
    pub fn volume_ratio(&self) -> f64 {
        let avg_5m = if self.volume_1h > 0.0 {
            self.volume_1h / 12.0
        } else {
            1.0
        };
        self.volume_5m / avg_5m.max(1.0)
    }

    pub fn txns_5m(&self) -> u64 {
        self.buys_5m + self.sells_5m
    }
}

/// Score a market snapshot
pub fn calculate_risk(m: &MarketSnapshot) -> LayerResult {
    let mut score: f64 = 0.0;
    let mut reasons = Vec::new();
    let ratio = m.volume_ratio();

    if ratio >= 100.0 {
        score = score.max(0.95);
        reasons.push(format!(
            "EXTREME volume spike: {:.0}x average (94% pump&dump probability)",
            ratio
        ));
    } else if ratio >= 20.0 {
        score = score.max(0.6);
        reasons.push(format!("Volume spike: {:.0}x average", ratio));
    }

    if m.liquidity_usd < 5_000.0 {
        score = score.max(0.7);
        reasons.push(format!("Very low liquidity: {}", usd(m.liquidity_usd)));
    } else if m.liquidity_usd < 20_000.0 {
        score = score.max(0.4);
        reasons.push(format!("Low liquidity: {}", usd(m.liquidity_usd)));
    }

    let txns = m.txns_5m();
    if txns > 0 {
        let per_tx = m.volume_5m / txns as f64;
        if per_tx > 10_000.0 {
            score = (score + 0.2).min(1.0);
            reasons.push(format!("Whale-sized trades: {} per tx", usd(per_tx)));
        }
    }

    if m.price_change_5m > 200.0 {
        score = (score + 0.2).min(1.0);
        reasons.push(format!("Price up {:.0}% in 5 minutes", m.price_change_5m));
    }

    if reasons.is_empty() {
        score = 0.1;
        reasons.push("Normal market activity".to_string());
    }

    let score = round_dp(score, 4);

    let evidence = into_evidence(json!({
        "score": score,
        "volume_5m": m.volume_5m,
        "volume_1h": m.volume_1h,
        "volume_ratio": round_dp(ratio, 1),
        "liquidity_usd": m.liquidity_usd,
        "price_change_5m": m.price_change_5m,
        "txns_5m": { "buys": m.buys_5m, "sells": m.sells_5m },
        "reasons": reasons,
    }));

    LayerResult::new(score, 0.65, evidence)
}

pub struct MarketLayer {
    market: Arc<dyn MarketSource>,
}

impl MarketLayer {
    pub fn new(market: Arc<dyn MarketSource>) -> Self {
        Self { market }
    }

    pub async fn analyze(&self, address: &str) -> AppResult<LayerResult> {
        let pairs = self.market.token_pairs(address).await?;

        let Some(pair) = main_pair(&pairs) else {
            return Ok(LayerResult::new(
                0.6,
                0.2,
                into_evidence(json!({
                    "note": "Token not found on DexScreener",
                    "reasons": ["Token not found on DexScreener"],
                })),
            ));
        };

        Ok(calculate_risk(&MarketSnapshot::from_pair(pair)))
    }
}
