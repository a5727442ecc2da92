//! Wallet Layer - holder concentration
//!
//! A token whose supply sits in one or a handful of wallets can be dumped
//! at any moment. Shares are computed against total supply.

use serde_json::json;
use std::sync::Arc;

use super::into_evidence;
use crate::models::errors::AppResult;
use crate::models::types::LayerResult;
use crate::providers::{ChainSource, TokenAccount};
use crate::utils::numeric::{pct, round_dp};

/// Holder counts below this add risk
const MIN_HEALTHY_HOLDERS: usize = 50;

/// Supply shares held by the largest accounts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Concentration {
    pub top_holder_pct: f64,
    pub top_5_pct: f64,
    pub top_10_pct: f64,
    pub holder_count: usize,
    pub top_holder_address: Option<String>,
}

impl Concentration {
    pub fn from_holders(holders: &[TokenAccount], supply: f64) -> Self {
        if holders.is_empty() || supply <= 0.0 {
            return Self::default();
        }

        let share = |n: usize| {
            let held: f64 = holders.iter().take(n).map(TokenAccount::raw_amount).sum();
            round_dp(held / supply, 4)
        };

        Self {
            top_holder_pct: share(1),
            top_5_pct: share(5),
            top_10_pct: share(10),
            holder_count: holders.len(),
            top_holder_address: holders.first().map(|h| h.address.clone()),
        }
    }
}

/// Score a concentration snapshot
pub fn calculate_risk(c: &Concentration) -> LayerResult {
    let mut score: f64 = 0.0;
    let mut reasons = Vec::new();

    if c.top_holder_pct > 0.5 {
        score = score.max(0.9);
        reasons.push(format!(
            "CRITICAL: Top wallet holds {} of supply (>50%)",
            pct(c.top_holder_pct)
        ));
    } else if c.top_holder_pct > 0.3 {
        score = score.max(0.7);
        reasons.push(format!(
            "WARNING: Top wallet holds {} of supply",
            pct(c.top_holder_pct)
        ));
    }

    if c.top_5_pct > 0.8 {
        score = score.max(0.8);
        reasons.push(format!("Top 5 wallets hold {}", pct(c.top_5_pct)));
    } else if c.top_5_pct > 0.6 {
        score = score.max(0.5);
        reasons.push(format!("Top 5 wallets hold {}", pct(c.top_5_pct)));
    }

    if c.holder_count < MIN_HEALTHY_HOLDERS {
        score = (score + 0.15).min(1.0);
        reasons.push(format!("Very few holders: {}", c.holder_count));
    }

    if reasons.is_empty() {
        score = 0.15;
        reasons.push("Healthy holder distribution".to_string());
    }

    let confidence = if c.holder_count > 0 { 0.6 } else { 0.2 };
    let score = round_dp(score, 4);

    let evidence = into_evidence(json!({
        "score": score,
        "top_holder_pct": c.top_holder_pct,
        "top_5_pct": c.top_5_pct,
        "top_10_pct": c.top_10_pct,
        "holder_count": c.holder_count,
        "top_holder_address": c.top_holder_address,
        "reasons": reasons,
    }));

    LayerResult::new(score, confidence, evidence)
}

pub struct WalletLayer {
    chain: Arc<dyn ChainSource>,
}

impl WalletLayer {
    pub fn new(chain: Arc<dyn ChainSource>) -> Self {
        Self { chain }
    }

    pub async fn analyze(&self, address: &str) -> AppResult<LayerResult> {
        let (holders, supply) = tokio::join!(
            self.chain.largest_accounts(address),
            self.chain.token_supply(address)
        );
        let concentration = Concentration::from_holders(&holders?, supply?);
        Ok(calculate_risk(&concentration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layers::testing::{account, FakeChain};

    fn snapshot(top: f64, top5: f64, holders: usize) -> Concentration {
        Concentration {
            top_holder_pct: top,
            top_5_pct: top5,
            top_10_pct: top5,
            holder_count: holders,
            top_holder_address: None,
        }
    }

    #[test]
    fn test_critical_concentration() {
        let result = calculate_risk(&snapshot(0.55, 0.85, 30));
        assert!(result.score >= 0.9, "Score was {}", result.score);
        assert!(result.reasons()[0].starts_with("CRITICAL"));
        assert!(result.reasons()[0].contains("55%"));
    }

    #[test]
    fn test_warning_tier() {
        let result = calculate_risk(&snapshot(0.35, 0.5, 200));
        assert_eq!(result.score, 0.7);
        assert!(result.reasons()[0].starts_with("WARNING"));
    }

    #[test]
    fn test_top_five_tiers() {
        assert_eq!(calculate_risk(&snapshot(0.2, 0.85, 200)).score, 0.8);
        assert_eq!(calculate_risk(&snapshot(0.2, 0.65, 200)).score, 0.5);
    }

    #[test]
    fn test_healthy_distribution() {
        let result = calculate_risk(&snapshot(0.05, 0.2, 500));
        assert_eq!(result.score, 0.15);
        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.reasons(), vec!["Healthy holder distribution"]);
    }

    #[test]
    fn test_concentration_from_holders() {
        let holders = vec![account("Whale", 600), account("B", 200), account("C", 100)];
        let c = Concentration::from_holders(&holders, 1000.0);
        assert_eq!(c.top_holder_pct, 0.6);
        assert_eq!(c.top_5_pct, 0.9);
        assert_eq!(c.holder_count, 3);
        assert_eq!(c.top_holder_address.as_deref(), Some("Whale"));
    }

    #[test]
    fn test_zero_supply_yields_empty_snapshot() {
        let c = Concentration::from_holders(&[account("A", 10)], 0.0);
        assert_eq!(c, Concentration::default());
    }

    #[tokio::test]
    async fn test_analyze() {
        let chain = FakeChain::new(vec![account("Whale", 600), account("B", 200)], None, 1000.0);
        let result = WalletLayer::new(Arc::new(chain)).analyze("Mint").await.unwrap();
        // 0.9 for the whale, +0.15 for two holders, capped
        assert_eq!(result.score, 1.0);
        assert_eq!(result.evidence["holder_count"], 2);
    }
}
