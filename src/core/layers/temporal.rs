//! Temporal Layer - launch-age risk windows
//!
//! Most rugpulls happen within minutes of launch. Risk decays with age:
//! < 5 min EXTREME, < 12 min HIGH, < 30 min ELEVATED, < 60 min MODERATE.
//! Early price trajectory (parabolic pump, pump-then-crash) adds to it.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::into_evidence;
use crate::models::errors::AppResult;
use crate::models::types::{AnalysisContext, LayerResult, RiskWindow};
use crate::providers::MarketSource;
use crate::utils::numeric::round_dp;

/// Age and early trajectory of a token
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenAge {
    /// Negative when unknown
    pub age_seconds: f64,
    pub price_change_5m: f64,
    pub price_change_1h: f64,
    pub from_launch_timestamp: bool,
}

impl TokenAge {
    pub fn minutes(&self) -> f64 {
        if self.age_seconds < 0.0 {
            -1.0
        } else {
            self.age_seconds / 60.0
        }
    }

    pub fn is_known(&self) -> bool {
        self.age_seconds >= 0.0
    }
}

/// Score a token age snapshot
pub fn calculate_risk(age: &TokenAge) -> LayerResult {
    let minutes = age.minutes();
    let window = RiskWindow::from_minutes(minutes);
    let mut reasons = Vec::new();

    let mut score = match window {
        RiskWindow::Unknown => {
            reasons.push("Launch time unknown".to_string());
            0.5
        }
        RiskWindow::Extreme => {
            reasons.push(format!("EXTREME: launched {:.1} minutes ago", minutes));
            0.95
        }
        RiskWindow::High => {
            reasons.push(format!("HIGH: launched {:.1} minutes ago", minutes));
            0.85
        }
        RiskWindow::Elevated => {
            reasons.push(format!("ELEVATED: launched {:.1} minutes ago", minutes));
            0.6
        }
        RiskWindow::Moderate => {
            reasons.push(format!("MODERATE: launched {:.1} minutes ago", minutes));
            0.35
        }
        RiskWindow::Low => {
            let hours = minutes / 60.0;
            reasons.push(format!("Established: {:.1} hours old", hours));
            (0.3 - hours * 0.01).max(0.1)
        }
    };

    let early = minutes > 0.0 && minutes < RiskWindow::ELEVATED_MINUTES;
    if early && age.price_change_5m > 500.0 {
        score += 0.1;
        reasons.push(format!(
            "Parabolic pump: +{:.0}% in 5 minutes",
            age.price_change_5m
        ));
    }
    if early && age.price_change_5m < -50.0 && age.price_change_1h > 100.0 {
        score += 0.15;
        reasons.push("Pump-then-crash trajectory".to_string());
    }
    if minutes > 0.0 && minutes < 15.0 && age.price_change_5m > 100.0 {
        reasons.push("FOMO phase: early buyers being baited".to_string());
    }

    let score = round_dp(score.min(1.0), 4);
    let confidence = if age.from_launch_timestamp { 0.7 } else { 0.3 };
    let known = age.is_known();

    let evidence = into_evidence(json!({
        "score": score,
        "minutes_since_launch": if known { round_dp(minutes, 1) } else { -1.0 },
        "hours_since_launch": if known { round_dp(minutes / 60.0, 2) } else { -1.0 },
        "token_age_seconds": if known { age.age_seconds } else { -1.0 },
        "price_change_5m": age.price_change_5m,
        "price_change_1h": age.price_change_1h,
        "risk_window": window.as_str(),
        "fomo_phase": minutes > 0.0 && minutes < 15.0 && age.price_change_5m > 50.0,
        "reasons": reasons,
    }));

    LayerResult::new(score, confidence, evidence)
}

pub struct TemporalLayer {
    market: Arc<dyn MarketSource>,
    /// Clock override (unix seconds) for deterministic runs
    fixed_now: Option<i64>,
}

impl TemporalLayer {
    pub fn new(market: Arc<dyn MarketSource>) -> Self {
        Self {
            market,
            fixed_now: None,
        }
    }

    pub fn with_fixed_now(mut self, now: i64) -> Self {
        self.fixed_now = Some(now);
        self
    }

    fn now(&self) -> i64 {
        self.fixed_now.unwrap_or_else(|| Utc::now().timestamp())
    }

    pub async fn analyze(&self, address: &str, ctx: &AnalysisContext) -> AppResult<LayerResult> {
        let pair = match self.market.token_pairs(address).await {
            Ok(pairs) => pairs.into_iter().next(),
            Err(e) => {
                warn!(token = address, error = %e, "Trajectory lookup failed");
                None
            }
        };

        let launched = ctx
            .launch_timestamp
            .or_else(|| pair.as_ref()?.pair_created_at.map(|ms| ms / 1000))
            .filter(|ts| *ts > 0);

        let change = pair.as_ref().map(|p| p.price_change()).unwrap_or_default();
        let age = TokenAge {
            age_seconds: launched.map_or(-1.0, |ts| (self.now() - ts).max(0) as f64),
            price_change_5m: change.m5.unwrap_or(0.0),
            price_change_1h: change.h1.unwrap_or(0.0),
            from_launch_timestamp: ctx.launch_timestamp.is_some(),
        };

        Ok(calculate_risk(&age))
    }
}
