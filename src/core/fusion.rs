//! Fusion Engine - concurrent fan-out over the seven layers
//!
//! Every layer runs in its own task under its own time budget. The round
//! always waits for seven results; a layer that errors, panics or overruns
//! is represented by its neutral fallback, never by omission.
//!
//! Fusion itself is pure arithmetic over the seven results:
//! - risk = Σ weight × score
//! - confidence = weighted confidence + agreement bonus - error penalty
//! - time-to-event from the temporal layer's window when risk is material

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::core::layers::{
    safe_analyze, ContractLayer, Layer, LayerKind, LiquidityLayer, MarketLayer, SocialLayer,
    TemporalLayer, VisualLayer, WalletLayer,
};
use crate::models::config::RugIntelConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{AnalysisContext, Evidence, FusionOutput, LayerResult, RiskWindow};
use crate::providers::{DexScreenerClient, RugCheckClient, SolanaRpcClient, TwitterClient};
use crate::utils::numeric::{population_std, round_dp};

/// Allowed drift of the weight sum from 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;
/// Fused scores below this carry no timing estimate
const MATERIAL_RISK: f64 = 0.5;
const AGREEMENT_CEILING: f64 = 0.2;
const ERROR_PENALTY: f64 = 0.05;

// ============================================
// Weights
// ============================================

/// Fusion weights indexed by `LayerKind::index`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights([f64; LayerKind::COUNT]);

impl Weights {
    /// Values must be finite, non-negative and sum to 1.0 (± 1e-3)
    pub fn new(values: [f64; LayerKind::COUNT]) -> AppResult<Self> {
        if let Some((kind, w)) = LayerKind::ALL
            .iter()
            .zip(values)
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(AppError::invalid_weights(format!(
                "{} weight must be finite and non-negative, got {}",
                kind, w
            )));
        }

        let sum: f64 = values.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AppError::invalid_weights(format!(
                "weights sum to {:.4}, expected 1.0",
                sum
            )));
        }

        Ok(Self(values))
    }

    pub fn get(&self, kind: LayerKind) -> f64 {
        self.0[kind.index()]
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self(LayerKind::ALL.map(|kind| kind.default_weight()))
    }
}

// ============================================
// Layer results
// ============================================

/// Exactly one result per layer, in `LayerKind::ALL` order
#[derive(Debug, Clone, PartialEq)]
pub struct LayerResults([LayerResult; LayerKind::COUNT]);

impl LayerResults {
    pub fn new(results: [LayerResult; LayerKind::COUNT]) -> Self {
        Self(results)
    }

    pub fn get(&self, kind: LayerKind) -> &LayerResult {
        &self.0[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerKind, &LayerResult)> {
        LayerKind::ALL.into_iter().zip(self.0.iter())
    }

    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|r| r.is_error()).count()
    }
}

impl From<[LayerResult; LayerKind::COUNT]> for LayerResults {
    fn from(results: [LayerResult; LayerKind::COUNT]) -> Self {
        Self(results)
    }
}

// ============================================
// Pure fusion
// ============================================

/// Weighted linear combination, clamped and rounded to 4 decimals
pub fn fuse_scores(results: &LayerResults, weights: &Weights) -> f64 {
    let fused: f64 = results.iter().map(|(k, r)| weights.get(k) * r.score).sum();
    round_dp(fused.clamp(0.0, 1.0), 4)
}

/// Weighted confidence, rewarded for cross-layer agreement and penalized
/// per errored layer
pub fn calculate_confidence(results: &LayerResults, weights: &Weights) -> f64 {
    let weighted: f64 = results
        .iter()
        .map(|(k, r)| weights.get(k) * r.confidence)
        .sum();

    let scores: Vec<f64> = results.iter().map(|(_, r)| r.score).collect();
    let agreement_bonus = (AGREEMENT_CEILING - population_std(&scores)).max(0.0);
    let error_penalty = ERROR_PENALTY * results.error_count() as f64;

    round_dp((weighted + agreement_bonus - error_penalty).clamp(0.0, 1.0), 4)
}

/// Per-layer evidence keyed by layer name
pub fn compile_evidence(results: &LayerResults, weights: &Weights) -> Evidence {
    results
        .iter()
        .map(|(kind, r)| {
            let weight = weights.get(kind);
            let entry = json!({
                "score": r.score,
                "confidence": r.confidence,
                "weight": weight,
                "weighted_score": round_dp(r.score * weight, 4),
                "evidence": Value::Object(r.evidence.clone()),
                "error": r.error,
            });
            (kind.name().to_string(), entry)
        })
        .collect()
}

/// Hours until the predicted event, from the temporal layer's window
pub fn estimate_timing(results: &LayerResults, fused_score: f64) -> Option<f64> {
    if fused_score < MATERIAL_RISK {
        return None;
    }

    let temporal = &results.get(LayerKind::Temporal).evidence;
    let minutes = temporal
        .get("minutes_since_launch")
        .and_then(Value::as_f64)
        .unwrap_or(-1.0);
    if minutes < 0.0 {
        return None;
    }

    let window = temporal
        .get("risk_window")
        .and_then(Value::as_str)
        .map(RiskWindow::from_label)
        .unwrap_or(RiskWindow::Unknown);

    let hours = match window {
        RiskWindow::Extreme => ((12.0 - minutes) / 60.0).max(0.1),
        RiskWindow::High => ((30.0 - minutes) / 60.0).max(0.5),
        RiskWindow::Elevated => ((120.0 - minutes) / 60.0).max(1.0),
        _ => (24.0 - minutes / 60.0).max(2.0),
    };
    Some(round_dp(hours, 2))
}

/// Assemble the full output from seven results
pub fn fuse(results: &LayerResults, weights: &Weights, elapsed_seconds: f64) -> FusionOutput {
    let risk_score = fuse_scores(results, weights);
    FusionOutput {
        risk_score,
        confidence: calculate_confidence(results, weights),
        evidence: compile_evidence(results, weights),
        time_to_event: estimate_timing(results, risk_score),
        elapsed_seconds,
    }
}

// ============================================
// Engine
// ============================================

pub struct FusionEngine {
    /// In `LayerKind::ALL` order
    layers: Vec<Arc<Layer>>,
    weights: Weights,
    source_timeout: Duration,
    round_timeout: Duration,
}

impl FusionEngine {
    /// Requires exactly one layer of each kind, in any order
    pub fn new(
        layers: Vec<Layer>,
        weights: Weights,
        source_timeout: Duration,
        round_timeout: Duration,
    ) -> AppResult<Self> {
        let mut slots: [Option<Layer>; LayerKind::COUNT] = Default::default();
        for layer in layers {
            let kind = layer.kind();
            if slots[kind.index()].replace(layer).is_some() {
                return Err(AppError::invalid_config(format!("duplicate {} layer", kind)));
            }
        }

        let mut ordered = Vec::with_capacity(LayerKind::COUNT);
        for (kind, slot) in LayerKind::ALL.iter().zip(slots) {
            let layer =
                slot.ok_or_else(|| AppError::invalid_config(format!("missing {} layer", kind)))?;
            ordered.push(Arc::new(layer));
        }

        Ok(Self {
            layers: ordered,
            weights,
            source_timeout,
            round_timeout,
        })
    }

    /// Production wiring: each layer owns its own HTTP client
    pub fn from_config(config: &RugIntelConfig) -> AppResult<Self> {
        let timeout = config.source_timeout;
        let chain = || SolanaRpcClient::new(config.solana_rpc_url.as_str(), timeout);
        let market = || DexScreenerClient::new(config.dexscreener_url.as_str(), timeout);

        let layers = vec![
            Layer::Social(SocialLayer::new(Arc::new(TwitterClient::new(
                config.twitter_search_url.as_str(),
                config.twitter_bearer_token.clone(),
                timeout,
            )?))),
            Layer::Liquidity(LiquidityLayer::new(Arc::new(chain()?))),
            Layer::Wallet(WalletLayer::new(Arc::new(chain()?))),
            Layer::Market(MarketLayer::new(Arc::new(market()?))),
            Layer::Contract(ContractLayer::new(Arc::new(RugCheckClient::new(
                config.rugcheck_url.as_str(),
                timeout,
            )?))),
            Layer::Visual(VisualLayer::new(Arc::new(market()?))),
            Layer::Temporal(TemporalLayer::new(Arc::new(market()?))),
        ];

        Self::new(layers, Weights::default(), timeout, config.round_timeout)
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Run one full round. Never fails: engine-level faults become the
    /// neutral fallback output.
    pub async fn analyze(&self, address: &str, ctx: &AnalysisContext) -> FusionOutput {
        let started = Instant::now();

        match self.run_round(address, ctx).await {
            Ok(results) => {
                let output = fuse(&results, &self.weights, started.elapsed().as_secs_f64());
                info!(
                    token = %address,
                    risk_score = output.risk_score,
                    confidence = output.confidence,
                    errors = results.error_count(),
                    elapsed_s = format!("{:.2}", output.elapsed_seconds),
                    "🧠 Fusion round complete"
                );
                output
            }
            Err(err) => {
                error!(
                    token = %address,
                    code = err.code_str(),
                    error = %err.message,
                    "Fusion round failed"
                );
                FusionOutput::fallback(err.to_string(), started.elapsed().as_secs_f64())
            }
        }
    }

    async fn run_round(&self, address: &str, ctx: &AnalysisContext) -> AppResult<LayerResults> {
        validate_address(address)?;

        let mut set = JoinSet::new();
        for layer in &self.layers {
            let layer = Arc::clone(layer);
            let address = address.to_string();
            let ctx = ctx.clone();
            let budget = layer.kind().budget(self.source_timeout).min(self.round_timeout);
            set.spawn(async move {
                let result = safe_analyze(&layer, &address, &ctx, budget).await;
                (layer.kind(), result)
            });
        }

        let mut slots: [Option<LayerResult>; LayerKind::COUNT] = Default::default();
        let collect = async {
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((kind, result)) => slots[kind.index()] = Some(result),
                    Err(e) => warn!(error = %e, "Layer task did not complete"),
                }
            }
        };
        if tokio::time::timeout(self.round_timeout, collect).await.is_err() {
            warn!(token = %address, "Round deadline reached, filling missing layers");
        }
        // Dropping the set aborts any task still running
        drop(set);

        let results = std::array::from_fn(|i| {
            slots[i].take().unwrap_or_else(|| {
                let err = AppError::new(
                    ErrorCode::FusionRoundIncomplete,
                    format!("{} layer did not report", LayerKind::ALL[i]),
                );
                LayerResult::fallback(err.to_string())
            })
        });
        Ok(LayerResults::new(results))
    }
}

pub fn validate_address(address: &str) -> AppResult<()> {
    if address.trim().is_empty() {
        return Err(AppError::invalid_address("token address is empty"));
    }
    if address.chars().any(char::is_whitespace) {
        return Err(AppError::invalid_address(format!(
            "token address contains whitespace: {:?}",
            address
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layers::testing::{
        account, Behavior, FakeChain, FakeMarket, FakeReports, FakeSocial,
    };
    use crate::providers::MentionBatch;
    use serde_json::Map;

    fn scored(scores: [f64; 7]) -> LayerResults {
        LayerResults::new(scores.map(|s| LayerResult::new(s, 0.5, Map::new())))
    }

    fn temporal_evidence(minutes: f64, window: &str) -> LayerResult {
        let evidence = crate::core::layers::into_evidence(json!({
            "minutes_since_launch": minutes,
            "risk_window": window,
        }));
        LayerResult::new(0.95, 0.7, evidence)
    }

    fn with_temporal(score: f64, temporal: LayerResult) -> LayerResults {
        let mut all = [0; 7].map(|_| LayerResult::new(score, 0.5, Map::new()));
        all[LayerKind::Temporal.index()] = temporal;
        LayerResults::new(all)
    }

    #[test]
    fn test_default_weights_valid() {
        let w = Weights::default();
        assert!((w.sum() - 1.0).abs() < 1e-3);
        assert!(Weights::new([0.07, 0.25, 0.20, 0.10, 0.15, 0.03, 0.20]).is_ok());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let err = Weights::new([0.5; 7]).unwrap_err();
        assert_eq!(err.code, ErrorCode::FusionInvalidWeights);
        assert!(Weights::new([1.1, -0.1, 0.0, 0.0, 0.0, 0.0, 0.0]).is_err());
        assert!(Weights::new([f64::NAN, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_uniform_scores() {
        let w = Weights::default();
        assert!(fuse_scores(&scored([0.9; 7]), &w) > 0.85);
        assert!(fuse_scores(&scored([0.1; 7]), &w) < 0.15);
    }

    #[test]
    fn test_reference_mix() {
        let results = scored([0.3, 0.9, 0.7, 0.5, 0.2, 0.1, 0.8]);
        assert_eq!(fuse_scores(&results, &Weights::default()), 0.629);
    }

    #[test]
    fn test_single_layer_equals_its_weight() {
        let results = scored([0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(fuse_scores(&results, &Weights::default()), 0.25);
    }

    #[test]
    fn test_agreement_raises_confidence() {
        let w = Weights::default();
        let agree = calculate_confidence(&scored([0.5; 7]), &w);
        let disagree = calculate_confidence(&scored([0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.5]), &w);
        assert!(agree > disagree, "{} vs {}", agree, disagree);
        // 0.5 weighted + full 0.2 bonus
        assert_eq!(agree, 0.7);
    }

    #[test]
    fn test_error_penalty() {
        let mut all = [0; 7].map(|_| LayerResult::new(0.5, 0.5, Map::new()));
        all[0] = LayerResult::fallback("down");
        all[1] = LayerResult::fallback("down");
        // weighted = 0.5 - 0.5 * (0.07 + 0.25) = 0.34, bonus 0.2, penalty 0.1
        let conf = calculate_confidence(&LayerResults::new(all), &Weights::default());
        assert!((conf - 0.44).abs() < 1e-9, "Confidence was {}", conf);
    }

    #[test]
    fn test_evidence_shape() {
        let results = scored([0.3, 0.9, 0.7, 0.5, 0.2, 0.1, 0.8]);
        let evidence = compile_evidence(&results, &Weights::default());
        assert_eq!(evidence.len(), 7);
        let liquidity = &evidence["liquidity"];
        assert_eq!(liquidity["weight"], 0.25);
        assert_eq!(liquidity["weighted_score"], 0.225);
        assert!(liquidity["error"].is_null());
        assert_eq!(evidence.keys().next().map(String::as_str), Some("social"));
    }

    #[test]
    fn test_timing_requires_material_risk() {
        let results = with_temporal(0.1, temporal_evidence(3.0, "EXTREME"));
        assert_eq!(estimate_timing(&results, 0.49), None);
    }

    #[test]
    fn test_timing_windows() {
        let extreme = with_temporal(0.9, temporal_evidence(3.0, "EXTREME"));
        assert_eq!(estimate_timing(&extreme, 0.9), Some(0.15));

        let late_extreme = with_temporal(0.9, temporal_evidence(4.9, "EXTREME"));
        assert_eq!(estimate_timing(&late_extreme, 0.9), Some(0.12));

        let high = with_temporal(0.9, temporal_evidence(10.0, "HIGH"));
        assert_eq!(estimate_timing(&high, 0.9), Some(0.5));

        let elevated = with_temporal(0.9, temporal_evidence(20.0, "ELEVATED"));
        assert_eq!(estimate_timing(&elevated, 0.9), Some(1.67));

        let low = with_temporal(0.9, temporal_evidence(120.0, "LOW"));
        assert_eq!(estimate_timing(&low, 0.9), Some(22.0));

        let unknown = with_temporal(0.9, temporal_evidence(-1.0, "UNKNOWN"));
        assert_eq!(estimate_timing(&unknown, 0.9), None);
    }

    #[test]
    fn test_fuse_is_deterministic() {
        let results = with_temporal(0.7, temporal_evidence(8.0, "HIGH"));
        let w = Weights::default();
        assert_eq!(fuse(&results, &w, 0.0), fuse(&results, &w, 0.0));
    }

    fn fake_engine(chain: FakeChain) -> FusionEngine {
        let market = || Arc::new(FakeMarket::new(vec![]));
        let layers = vec![
            Layer::Temporal(TemporalLayer::new(market())),
            Layer::Social(SocialLayer::new(Arc::new(FakeSocial {
                configured: false,
                mentions: Behavior::Return(MentionBatch::default()),
            }))),
            Layer::Liquidity(LiquidityLayer::new(Arc::new(chain))),
            Layer::Wallet(WalletLayer::new(Arc::new(FakeChain::new(
                vec![account("Whale", 900)],
                None,
                1000.0,
            )))),
            Layer::Market(MarketLayer::new(market())),
            Layer::Contract(ContractLayer::new(Arc::new(FakeReports(Behavior::Return(None))))),
            Layer::Visual(VisualLayer::new(market())),
        ];
        FusionEngine::new(
            layers,
            Weights::default(),
            Duration::from_millis(200),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_engine_requires_every_layer_once() {
        let market = || Arc::new(FakeMarket::new(vec![]));
        let missing = FusionEngine::new(
            vec![Layer::Market(MarketLayer::new(market()))],
            Weights::default(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert!(missing.is_err());

        let duplicate = FusionEngine::new(
            vec![
                Layer::Market(MarketLayer::new(market())),
                Layer::Market(MarketLayer::new(market())),
            ],
            Weights::default(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_engine_round_survives_hung_layer() {
        let chain = FakeChain {
            accounts: Behavior::Hang,
            owner: Behavior::Return(None),
            supply: Behavior::Return(0.0),
        };
        let engine = fake_engine(chain);
        let output = engine.analyze("Mint111", &AnalysisContext::new()).await;

        assert_eq!(output.evidence.len(), 7);
        let liquidity = &output.evidence["liquidity"];
        assert_eq!(liquidity["score"], 0.5);
        assert!(liquidity["error"].as_str().unwrap().contains("LAYER_TIMEOUT"));
        assert!(output.elapsed_seconds < 1.0);
        assert!(!output.is_fallback());
    }

    #[tokio::test]
    async fn test_engine_contains_panicking_layer() {
        let chain = FakeChain {
            accounts: Behavior::Panic,
            owner: Behavior::Return(None),
            supply: Behavior::Return(0.0),
        };
        let output = fake_engine(chain).analyze("Mint111", &AnalysisContext::new()).await;
        assert!(output.evidence["liquidity"]["error"]
            .as_str()
            .unwrap()
            .contains("LAYER_PANICKED"));
        assert!((0.0..=1.0).contains(&output.risk_score));
    }

    #[tokio::test]
    async fn test_engine_rejects_blank_address() {
        let engine = fake_engine(FakeChain::new(vec![], None, 0.0));
        let output = engine.analyze("   ", &AnalysisContext::new()).await;
        assert!(output.is_fallback());
        assert_eq!(output.risk_score, 0.5);
        assert_eq!(output.confidence, 0.0);
        assert!(output.evidence["error"]
            .as_str()
            .unwrap()
            .contains("FUSION_INVALID_ADDRESS"));
    }

    #[tokio::test]
    async fn test_engine_is_repeatable() {
        let engine = fake_engine(FakeChain::new(vec![], None, 0.0));
        let ctx = AnalysisContext::new();
        let first = engine.analyze("Mint111", &ctx).await;
        let second = engine.analyze("Mint111", &ctx).await;
        assert_eq!(first.risk_score, second.risk_score);
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(first.evidence, second.evidence);
    }
}
