//! Social Layer - coordinated pump detection
//!
//! Looks at recent mentions of the token for three signals:
//! - freshly created accounts (< 30 days) posting about it
//! - shill keyword density
//! - low-follower (bot-like) author density
//!
//! Weight 0.07: noisy alone, useful when it agrees with other layers.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::into_evidence;
use crate::models::errors::{AppResult, ErrorCode};
use crate::models::types::LayerResult;
use crate::providers::{MentionBatch, SocialSource};
use crate::utils::constants::PUMP_KEYWORDS;
use crate::utils::numeric::{pct, round_dp};

/// Accounts younger than this count as new
const NEW_ACCOUNT_DAYS: i64 = 30;
/// Authors below this follower count look like bots
const LOW_FOLLOWER_THRESHOLD: u64 = 50;

/// Counts extracted from one mention batch
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MentionSignals {
    pub total: usize,
    pub new_accounts: usize,
    pub shill_keywords: usize,
    pub low_follower: usize,
}

impl MentionSignals {
    pub fn collect(batch: &MentionBatch, now: DateTime<Utc>) -> Self {
        let cutoff = now - ChronoDuration::days(NEW_ACCOUNT_DAYS);
        let mut signals = Self {
            total: batch.tweets.len(),
            ..Self::default()
        };

        for tweet in &batch.tweets {
            let text = tweet.text.to_lowercase();
            if PUMP_KEYWORDS.iter().any(|k| text.contains(k)) {
                signals.shill_keywords += 1;
            }

            let Some(author) = batch.author(tweet) else {
                continue;
            };
            if author.created().map_or(false, |created| created > cutoff) {
                signals.new_accounts += 1;
            }
            if author.followers() < LOW_FOLLOWER_THRESHOLD {
                signals.low_follower += 1;
            }
        }

        signals
    }
}

/// Score mention signals
pub fn calculate_risk(signals: &MentionSignals) -> LayerResult {
    let mut score: f64 = 0.0;
    let mut reasons = Vec::new();
    let total = signals.total.max(1) as f64;

    if signals.new_accounts >= 10 {
        score += 0.4;
        reasons.push(format!("{} new accounts (<30 days)", signals.new_accounts));
    } else if signals.new_accounts >= 5 {
        score += 0.2;
        reasons.push(format!("{} new accounts", signals.new_accounts));
    }

    let shill_ratio = signals.shill_keywords as f64 / total;
    if shill_ratio > 0.5 {
        score += 0.3;
        reasons.push(format!("High shill keyword ratio: {}", pct(shill_ratio)));
    } else if shill_ratio > 0.2 {
        score += 0.15;
        reasons.push(format!("Moderate shill keywords: {}", pct(shill_ratio)));
    }

    let bot_ratio = signals.low_follower as f64 / total;
    if bot_ratio > 0.6 {
        score += 0.3;
        reasons.push(format!("Likely bot activity: {} low-follower", pct(bot_ratio)));
    } else if bot_ratio > 0.3 {
        score += 0.15;
        reasons.push(format!("Some bot activity: {} low-follower", pct(bot_ratio)));
    }

    let score = round_dp(score.min(1.0), 4);
    let confidence = round_dp((0.3 + (signals.total as f64 / 100.0) * 0.5).min(0.8), 4);

    let evidence = into_evidence(json!({
        "score": score,
        "total_tweets": signals.total,
        "new_accounts": signals.new_accounts,
        "shill_keywords": signals.shill_keywords,
        "low_follower_bots": signals.low_follower,
        "reasons": reasons,
    }));

    LayerResult::new(score, confidence, evidence)
}

/// Low-confidence baseline used when real data is unavailable
fn heuristic_fallback(reason: &str) -> LayerResult {
    LayerResult::new(
        0.3,
        0.1,
        into_evidence(json!({
            "source": "heuristic_fallback",
            "reason": reason,
            "reasons": [reason],
        })),
    )
}

pub struct SocialLayer {
    source: Arc<dyn SocialSource>,
}

impl SocialLayer {
    pub fn new(source: Arc<dyn SocialSource>) -> Self {
        Self { source }
    }

    pub async fn analyze(&self, address: &str) -> AppResult<LayerResult> {
        if !self.source.is_configured() {
            info!("Twitter API not configured, using heuristic fallback");
            return Ok(heuristic_fallback("No Twitter API key configured"));
        }

        let batch = match self.source.recent_mentions(address).await {
            Ok(batch) => batch,
            Err(err) if err.code == ErrorCode::SourceRateLimited => {
                return Ok(heuristic_fallback("Twitter rate limited"));
            }
            Err(err) => return Err(err),
        };

        if batch.tweets.is_empty() {
            return Ok(LayerResult::new(
                0.1,
                0.3,
                into_evidence(json!({
                    "tweet_count": 0,
                    "assessment": "No social activity",
                    "reasons": ["No social activity"],
                })),
            ));
        }

        Ok(calculate_risk(&MentionSignals::collect(&batch, Utc::now())))
    }
}
