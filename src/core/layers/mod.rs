//! Analysis Layers
//!
//! Seven independent scoring modules, each reading one signal category.
//! They form a closed set: the fusion weights and arithmetic assume exactly
//! these seven, so dispatch goes through the `Layer` enum rather than a
//! trait-object registry.
//!
//! Every invocation goes through `safe_analyze`, which turns errors, panics
//! and overrun budgets into the neutral fallback result.

pub mod contract;
pub mod liquidity;
pub mod market;
pub mod social;
pub mod temporal;
pub mod visual;
pub mod wallet;

pub use contract::ContractLayer;
pub use liquidity::LiquidityLayer;
pub use market::MarketLayer;
pub use social::SocialLayer;
pub use temporal::TemporalLayer;
pub use visual::VisualLayer;
pub use wallet::WalletLayer;

use futures_util::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::{AnalysisContext, Evidence, LayerResult};

/// Identity of a layer; index order is the fusion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    Social,
    Liquidity,
    Wallet,
    Market,
    Contract,
    Visual,
    Temporal,
}

impl LayerKind {
    pub const COUNT: usize = 7;

    pub const ALL: [LayerKind; LayerKind::COUNT] = [
        LayerKind::Social,
        LayerKind::Liquidity,
        LayerKind::Wallet,
        LayerKind::Market,
        LayerKind::Contract,
        LayerKind::Visual,
        LayerKind::Temporal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Social => "social",
            LayerKind::Liquidity => "liquidity",
            LayerKind::Wallet => "wallet",
            LayerKind::Market => "market",
            LayerKind::Contract => "contract",
            LayerKind::Visual => "visual",
            LayerKind::Temporal => "temporal",
        }
    }

    /// Hand-calibrated fusion weight
    pub fn default_weight(&self) -> f64 {
        match self {
            LayerKind::Social => 0.07,
            LayerKind::Liquidity => 0.25,
            LayerKind::Wallet => 0.20,
            LayerKind::Market => 0.10,
            LayerKind::Contract => 0.15,
            LayerKind::Visual => 0.03,
            LayerKind::Temporal => 0.20,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Sequential external calls on the slowest path; scales the time budget
    pub fn sequential_calls(&self) -> u32 {
        match self {
            LayerKind::Liquidity => 2,
            _ => 1,
        }
    }

    /// Time budget for one invocation given the per-call source timeout
    pub fn budget(&self, source_timeout: Duration) -> Duration {
        source_timeout * self.sequential_calls()
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed set of layer implementations
pub enum Layer {
    Social(SocialLayer),
    Liquidity(LiquidityLayer),
    Wallet(WalletLayer),
    Market(MarketLayer),
    Contract(ContractLayer),
    Visual(VisualLayer),
    Temporal(TemporalLayer),
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Social(_) => LayerKind::Social,
            Layer::Liquidity(_) => LayerKind::Liquidity,
            Layer::Wallet(_) => LayerKind::Wallet,
            Layer::Market(_) => LayerKind::Market,
            Layer::Contract(_) => LayerKind::Contract,
            Layer::Visual(_) => LayerKind::Visual,
            Layer::Temporal(_) => LayerKind::Temporal,
        }
    }

    /// Raw analysis; may fail. Use `safe_analyze` from orchestration code.
    pub async fn analyze(&self, address: &str, ctx: &AnalysisContext) -> AppResult<LayerResult> {
        match self {
            Layer::Social(layer) => layer.analyze(address).await,
            Layer::Liquidity(layer) => layer.analyze(address).await,
            Layer::Wallet(layer) => layer.analyze(address).await,
            Layer::Market(layer) => layer.analyze(address).await,
            Layer::Contract(layer) => layer.analyze(address).await,
            Layer::Visual(layer) => layer.analyze(address, ctx).await,
            Layer::Temporal(layer) => layer.analyze(address, ctx).await,
        }
    }
}

/// Run a layer under a time budget. Never fails: errors, panics and
/// timeouts all become `LayerResult::fallback` with the cause recorded.
pub async fn safe_analyze(
    layer: &Layer,
    address: &str,
    ctx: &AnalysisContext,
    budget: Duration,
) -> LayerResult {
    let kind = layer.kind();
    let started = Instant::now();
    let guarded = AssertUnwindSafe(layer.analyze(address, ctx)).catch_unwind();

    let err = match tokio::time::timeout(budget, guarded).await {
        Ok(Ok(Ok(result))) => {
            debug!(
                layer = %kind,
                score = result.score,
                confidence = result.confidence,
                latency_ms = started.elapsed().as_millis() as u64,
                "Layer complete"
            );
            return result;
        }
        Ok(Ok(Err(err))) => err,
        Ok(Err(panic)) => AppError::layer_panicked(format!(
            "{} layer panicked: {}",
            kind,
            panic_message(&*panic)
        )),
        Err(_) => AppError::layer_timeout(kind.name(), budget.as_millis()),
    };

    warn!(
        layer = %kind,
        code = err.code_str(),
        error = %err.message,
        "⚠️ Layer failed, using neutral fallback"
    );
    LayerResult::fallback(err.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Unwrap a `json!` object literal into an evidence map
pub(crate) fn into_evidence(value: Value) -> Evidence {
    match value {
        Value::Object(map) => map,
        _ => Evidence::new(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::Arc;

    fn liquidity_with(chain: FakeChain) -> Layer {
        Layer::Liquidity(LiquidityLayer::new(Arc::new(chain)))
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let sum: f64 = LayerKind::ALL.iter().map(|k| k.default_weight()).sum();
        assert!((sum - 1.0).abs() < 1e-3, "Sum was {}", sum);
    }

    #[test]
    fn test_kind_index_matches_order() {
        for (i, kind) in LayerKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert_eq!(LayerKind::Temporal.to_string(), "temporal");
    }

    #[test]
    fn test_budget_scales_with_calls() {
        let t = Duration::from_secs(15);
        assert_eq!(LayerKind::Liquidity.budget(t), Duration::from_secs(30));
        assert_eq!(LayerKind::Market.budget(t), t);
    }

    #[tokio::test]
    async fn test_safe_analyze_passes_through_success() {
        let layer = liquidity_with(FakeChain::new(vec![], None, 0.0));
        let ctx = AnalysisContext::new();
        let result = safe_analyze(&layer, "Mint", &ctx, Duration::from_secs(1)).await;
        assert_eq!(result.score, 0.8);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_safe_analyze_error_becomes_fallback() {
        let chain = FakeChain {
            accounts: Behavior::Fail(|| AppError::source_connection_failed("rpc down")),
            owner: Behavior::Return(None),
            supply: Behavior::Return(0.0),
        };
        let layer = liquidity_with(chain);
        let ctx = AnalysisContext::new();
        let result = safe_analyze(&layer, "Mint", &ctx, Duration::from_secs(1)).await;
        assert_eq!(result.score, 0.5);
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.unwrap().contains("rpc down"));
    }

    #[tokio::test]
    async fn test_safe_analyze_contains_panics() {
        let chain = FakeChain {
            accounts: Behavior::Panic,
            owner: Behavior::Return(None),
            supply: Behavior::Return(0.0),
        };
        let layer = liquidity_with(chain);
        let ctx = AnalysisContext::new();
        let result = safe_analyze(&layer, "Mint", &ctx, Duration::from_secs(1)).await;
        assert_eq!(result.score, 0.5);
        assert_eq!(result.confidence, 0.0);
        let error = result.error.unwrap();
        assert!(error.contains("LAYER_PANICKED"), "Error was {}", error);
        assert!(error.contains("source exploded"));
    }

    #[tokio::test]
    async fn test_safe_analyze_times_out() {
        let chain = FakeChain {
            accounts: Behavior::Hang,
            owner: Behavior::Return(None),
            supply: Behavior::Return(0.0),
        };
        let layer = liquidity_with(chain);
        let ctx = AnalysisContext::new();
        let result = safe_analyze(&layer, "Mint", &ctx, Duration::from_millis(20)).await;
        assert_eq!(result.score, 0.5);
        assert!(result.error.unwrap().contains("LAYER_TIMEOUT"));
    }
}
