//! Outcome Verifier - ground truth after the maturation window
//!
//! Cross-checks three independent sources once a token is old enough:
//! 1. Chain state: was the dominant liquidity account emptied?
//! 2. Security report: has the token been flagged as rugged?
//! 3. Market data: did the 24h price collapse?
//!
//! Any one of them confirms a rugpull. Each sub-check records its own error
//! instead of failing the verification.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::config::RugIntelConfig;
use crate::models::errors::AppResult;
use crate::models::types::{
    ChainCheck, MarketCheck, NewToken, OutcomeRecord, SecurityCheck, VerificationSources,
};
use crate::providers::{
    new_tokens_from_pairs, ChainSource, DexScreenerClient, MarketSource, RugCheckClient,
    SecurityReportSource, SolanaRpcClient,
};
use crate::utils::constants::{
    RUGPULL_PRICE_DROP_THRESHOLD, VERIFY_MAX_RISK_NAMES, VOLUME_COLLAPSE_USD,
};
use crate::utils::numeric::round_dp;

/// Score a historical prediction against the observed outcome.
///
/// Rugged: accuracy = predicted risk, +0.05 when liquidity was drained and
/// risk > 0.8, +0.03 when funds moved and risk > 0.9. Safe: 1 - risk.
pub fn calculate_accuracy(
    predicted_risk: f64,
    actual_rugpull: bool,
    liquidity_drained: bool,
    funds_moved: bool,
) -> f64 {
    let accuracy = if actual_rugpull {
        let mut acc = predicted_risk;
        if liquidity_drained && predicted_risk > 0.8 {
            acc = (acc + 0.05).min(1.0);
        }
        if funds_moved && predicted_risk > 0.9 {
            acc = (acc + 0.03).min(1.0);
        }
        acc
    } else {
        1.0 - predicted_risk
    };
    round_dp(accuracy.clamp(0.0, 1.0), 4)
}

/// Explicit OR of independent evidence
pub fn determine_rugpull(
    chain: &ChainCheck,
    security: &SecurityCheck,
    market: &MarketCheck,
) -> bool {
    if market.price_change_24h <= RUGPULL_PRICE_DROP_THRESHOLD {
        return true;
    }
    if chain.lp_removed {
        return true;
    }
    let status = security.status.to_lowercase();
    status.contains("rug") || status.contains("scam")
}

pub struct OutcomeVerifier {
    chain: Arc<dyn ChainSource>,
    security: Arc<dyn SecurityReportSource>,
    market: Arc<dyn MarketSource>,
    maturation_window: Duration,
}

impl OutcomeVerifier {
    pub fn new(
        chain: Arc<dyn ChainSource>,
        security: Arc<dyn SecurityReportSource>,
        market: Arc<dyn MarketSource>,
        maturation_window: Duration,
    ) -> Self {
        Self {
            chain,
            security,
            market,
            maturation_window,
        }
    }

    pub fn from_config(config: &RugIntelConfig) -> AppResult<Self> {
        let timeout = config.source_timeout;
        Ok(Self::new(
            Arc::new(SolanaRpcClient::new(config.solana_rpc_url.as_str(), timeout)?),
            Arc::new(RugCheckClient::new(config.rugcheck_url.as_str(), timeout)?),
            Arc::new(DexScreenerClient::new(config.dexscreener_url.as_str(), timeout)?),
            config.maturation_window,
        ))
    }

    pub fn maturation_window(&self) -> Duration {
        self.maturation_window
    }

    /// `None` while the token is younger than the maturation window
    pub async fn check_outcome(
        &self,
        address: &str,
        launch_timestamp: i64,
    ) -> Option<OutcomeRecord> {
        self.check_outcome_at(address, launch_timestamp, Utc::now().timestamp())
            .await
    }

    pub async fn check_outcome_at(
        &self,
        address: &str,
        launch_timestamp: i64,
        now: i64,
    ) -> Option<OutcomeRecord> {
        let elapsed_hours = (now - launch_timestamp) as f64 / 3600.0;
        let window_hours = self.maturation_window.as_secs_f64() / 3600.0;
        if elapsed_hours < window_hours {
            return None;
        }

        let (chain, security, market) = tokio::join!(
            self.check_chain(address),
            self.check_security(address),
            self.check_market(address)
        );

        let is_rugpull = determine_rugpull(&chain, &security, &market);
        info!(
            token = %address,
            is_rugpull,
            price_change_24h = market.price_change_24h,
            lp_removed = chain.lp_removed,
            security = %security.status,
            "🔍 Outcome verified"
        );

        Some(OutcomeRecord {
            is_rugpull,
            liquidity_drained: chain.lp_removed,
            funds_moved_to_exchange: chain.cex_deposit,
            price_drop_percent: market.price_change_24h,
            volume_collapsed: market.volume_collapsed,
            security_status: security.status.clone(),
            sources: VerificationSources {
                chain,
                security,
                market,
            },
            verified_at: now,
            hours_after_launch: round_dp(elapsed_hours, 2),
        })
    }

    async fn check_chain(&self, address: &str) -> ChainCheck {
        match self.chain.largest_accounts(address).await {
            Ok(accounts) => match accounts.first() {
                None => ChainCheck {
                    lp_removed: true,
                    ..ChainCheck::default()
                },
                Some(largest) => {
                    let balance = largest.raw_amount();
                    ChainCheck {
                        lp_removed: balance == 0.0,
                        // Exchange deposits need transaction history; not tracked
                        cex_deposit: false,
                        largest_account_balance: Some(balance),
                        error: None,
                    }
                }
            },
            Err(e) => {
                warn!(token = %address, error = %e, "Chain check failed");
                ChainCheck {
                    error: Some(e.to_string()),
                    ..ChainCheck::default()
                }
            }
        }
    }

    async fn check_security(&self, address: &str) -> SecurityCheck {
        match self.security.report(address).await {
            Ok(Some(report)) => {
                let status = if report.is_rugged() {
                    "rugged"
                } else if !report.risks.is_empty() {
                    "risky"
                } else {
                    "clean"
                };
                SecurityCheck {
                    status: status.to_string(),
                    report_score: report.score,
                    risks: report
                        .risk_names()
                        .into_iter()
                        .take(VERIFY_MAX_RISK_NAMES)
                        .collect(),
                    error: None,
                }
            }
            Ok(None) => SecurityCheck::default(),
            Err(e) => {
                warn!(token = %address, error = %e, "Security check failed");
                SecurityCheck {
                    error: Some(e.to_string()),
                    ..SecurityCheck::default()
                }
            }
        }
    }

    async fn check_market(&self, address: &str) -> MarketCheck {
        match self.market.token_pairs(address).await {
            Ok(pairs) => match pairs.first() {
                // Delisted tokens are treated as dead
                None => MarketCheck {
                    price_change_24h: -100.0,
                    volume_collapsed: true,
                    ..MarketCheck::default()
                },
                Some(pair) => {
                    let volume_24h = pair.volume().h24.unwrap_or(0.0);
                    MarketCheck {
                        price_change_24h: pair.price_change().h24.unwrap_or(0.0),
                        volume_collapsed: volume_24h < VOLUME_COLLAPSE_USD,
                        volume_24h: Some(volume_24h),
                        price_usd: Some(pair.price_usd()),
                        error: None,
                    }
                }
            },
            Err(e) => {
                warn!(token = %address, error = %e, "Market check failed");
                MarketCheck {
                    error: Some(e.to_string()),
                    ..MarketCheck::default()
                }
            }
        }
    }

    /// Recently created pairs; failures yield an empty list
    pub async fn discover_new_tokens(&self, limit: usize, now_ms: i64) -> Vec<NewToken> {
        match self.market.chain_pairs().await {
            Ok(pairs) => new_tokens_from_pairs(&pairs, now_ms, limit),
            Err(e) => {
                warn!(error = %e, "Token discovery failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layers::testing::{account, Behavior, FakeChain, FakeMarket, FakeReports};
    use crate::models::errors::AppError;
    use crate::providers::{DexPair, DexToken, DexWindows, RiskFlag, SecurityReport};

    const LAUNCH: i64 = 1_700_000_000;
    const DAY: i64 = 24 * 3600;

    fn verifier(
        chain: FakeChain,
        report: Option<SecurityReport>,
        pairs: Vec<DexPair>,
    ) -> OutcomeVerifier {
        OutcomeVerifier::new(
            Arc::new(chain),
            Arc::new(FakeReports(Behavior::Return(report))),
            Arc::new(FakeMarket::new(pairs)),
            Duration::from_secs(24 * 3600),
        )
    }

    fn pair(change_24h: f64, volume_24h: f64) -> DexPair {
        DexPair {
            price_change: Some(DexWindows { h24: Some(change_24h), ..Default::default() }),
            volume: Some(DexWindows { h24: Some(volume_24h), ..Default::default() }),
            price_usd: Some("0.0042".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_accuracy_reference_points() {
        assert_eq!(calculate_accuracy(0.95, true, false, false), 0.95);
        assert_eq!(calculate_accuracy(0.05, false, false, false), 0.95);
        assert_eq!(calculate_accuracy(0.90, false, false, false), 0.10);
        assert_eq!(calculate_accuracy(0.10, true, false, false), 0.10);
    }

    #[test]
    fn test_accuracy_severity_bonuses() {
        assert_eq!(calculate_accuracy(0.85, true, true, false), 0.9);
        assert_eq!(calculate_accuracy(0.85, true, true, true), 0.9);
        assert_eq!(calculate_accuracy(0.95, true, true, true), 1.0);
        assert_eq!(calculate_accuracy(0.8, true, true, false), 0.8);
    }

    #[test]
    fn test_rugpull_is_any_source() {
        let quiet = (ChainCheck::default(), SecurityCheck::default(), MarketCheck::default());
        assert!(!determine_rugpull(&quiet.0, &quiet.1, &quiet.2));

        let crashed = MarketCheck { price_change_24h: -90.0, ..MarketCheck::default() };
        assert!(determine_rugpull(&quiet.0, &quiet.1, &crashed));

        let drained = ChainCheck { lp_removed: true, ..ChainCheck::default() };
        assert!(determine_rugpull(&drained, &quiet.1, &quiet.2));

        let flagged = SecurityCheck { status: "Confirmed SCAM".into(), ..SecurityCheck::default() };
        assert!(determine_rugpull(&quiet.0, &flagged, &quiet.2));
    }

    #[tokio::test]
    async fn test_pending_before_window() {
        let v = verifier(FakeChain::new(vec![], None, 0.0), None, vec![]);
        assert!(v.check_outcome_at("Mint", LAUNCH, LAUNCH + DAY - 1).await.is_none());
    }

    #[tokio::test]
    async fn test_healthy_token_outcome() {
        let v = verifier(
            FakeChain::new(vec![account("Pool", 5_000)], None, 0.0),
            Some(SecurityReport { score: Some(85.0), ..SecurityReport::default() }),
            vec![pair(-20.0, 50_000.0)],
        );
        let outcome = v.check_outcome_at("Mint", LAUNCH, LAUNCH + DAY + 1800).await.unwrap();

        assert!(!outcome.is_rugpull);
        assert!(!outcome.liquidity_drained);
        assert_eq!(outcome.security_status, "clean");
        assert_eq!(outcome.price_drop_percent, -20.0);
        assert_eq!(outcome.hours_after_launch, 24.5);
        assert_eq!(outcome.sources.market.price_usd, Some(0.0042));
        assert_eq!(outcome.sources.chain.largest_account_balance, Some(5_000.0));
    }

    #[tokio::test]
    async fn test_drained_pool_and_delisted_token() {
        let v = verifier(FakeChain::new(vec![account("Pool", 0)], None, 0.0), None, vec![]);
        let outcome = v.check_outcome_at("Mint", LAUNCH, LAUNCH + 2 * DAY).await.unwrap();

        assert!(outcome.is_rugpull);
        assert!(outcome.liquidity_drained);
        assert!(outcome.volume_collapsed);
        assert_eq!(outcome.price_drop_percent, -100.0);
        assert_eq!(outcome.security_status, "unknown");
    }

    #[tokio::test]
    async fn test_rugged_report() {
        let report = SecurityReport {
            score: Some(5.0),
            risks: (0..8)
                .map(|i| RiskFlag { name: format!("risk {}", i), ..RiskFlag::default() })
                .collect(),
            rugged: Some(true),
        };
        let v = verifier(
            FakeChain::new(vec![account("Pool", 100)], None, 0.0),
            Some(report),
            vec![pair(-10.0, 5_000.0)],
        );
        let outcome = v.check_outcome_at("Mint", LAUNCH, LAUNCH + DAY).await.unwrap();
        assert!(outcome.is_rugpull);
        assert_eq!(outcome.security_status, "rugged");
        assert_eq!(outcome.sources.security.risks.len(), 5);
    }

    #[tokio::test]
    async fn test_source_errors_are_recorded() {
        let chain = FakeChain {
            accounts: Behavior::Fail(|| AppError::source_timeout("rpc slow")),
            owner: Behavior::Return(None),
            supply: Behavior::Return(0.0),
        };
        let v = OutcomeVerifier::new(
            Arc::new(chain),
            Arc::new(FakeReports(Behavior::Fail(|| AppError::source_status("rugcheck", 500)))),
            Arc::new(FakeMarket::with(Behavior::Fail(|| {
                AppError::source_rate_limited("dexscreener")
            }))),
            Duration::from_secs(3600),
        );
        let outcome = v.check_outcome_at("Mint", LAUNCH, LAUNCH + DAY).await.unwrap();

        assert!(!outcome.is_rugpull);
        assert!(outcome.sources.chain.error.as_deref().unwrap().contains("rpc slow"));
        assert!(outcome.sources.security.error.is_some());
        assert!(outcome.sources.market.error.is_some());
        assert_eq!(outcome.security_status, "unknown");
    }

    #[tokio::test]
    async fn test_discovery() {
        let now_ms = LAUNCH * 1000;
        let fresh = DexPair {
            base_token: DexToken {
                address: "NewMint".into(),
                name: Some("New".into()),
                symbol: Some("NEW".into()),
            },
            pair_created_at: Some(now_ms - 60_000),
            ..Default::default()
        };
        let stale = DexPair {
            base_token: DexToken { address: "Old".into(), ..Default::default() },
            pair_created_at: Some(now_ms - 7_200_000),
            ..Default::default()
        };
        let v = verifier(FakeChain::new(vec![], None, 0.0), None, vec![stale, fresh]);
        let tokens = v.discover_new_tokens(5, now_ms).await;
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].address, "NewMint");
        assert_eq!(tokens[0].timestamp, LAUNCH - 60);
    }

    #[tokio::test]
    async fn test_discovery_failure_is_empty() {
        let v = OutcomeVerifier::new(
            Arc::new(FakeChain::new(vec![], None, 0.0)),
            Arc::new(FakeReports(Behavior::Return(None))),
            Arc::new(FakeMarket::with(Behavior::Fail(|| AppError::source_timeout("slow")))),
            Duration::from_secs(3600),
        );
        assert!(v.discover_new_tokens(5, 0).await.is_empty());
    }
}
