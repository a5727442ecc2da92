//! Type definitions for RugIntel
//! Core data structures shared by layers, the fusion engine and the verifier

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered evidence map attached to every layer result
pub type Evidence = Map<String, Value>;

/// Neutral score substituted when a layer cannot complete
pub const FALLBACK_SCORE: f64 = 0.5;

/// Confidence substituted when a layer cannot complete
pub const FALLBACK_CONFIDENCE: f64 = 0.0;

/// Result of a single layer invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    /// Risk estimate (0.0 = safe, 1.0 = certain rugpull)
    pub score: f64,
    /// Layer's self-reported certainty
    pub confidence: f64,
    /// Explanatory detail, always present
    #[serde(default)]
    pub evidence: Evidence,
    /// Set only when the layer could not complete normal analysis
    #[serde(default)]
    pub error: Option<String>,
}

impl LayerResult {
    /// Build a successful result; score and confidence are clamped to [0, 1]
    pub fn new(score: f64, confidence: f64, evidence: Evidence) -> Self {
        Self {
            score: clamp_unit(score),
            confidence: clamp_unit(confidence),
            evidence,
            error: None,
        }
    }

    /// Neutral result used when a layer faults
    pub fn fallback(error: impl Into<String>) -> Self {
        let mut message: String = error.into();
        if message.is_empty() {
            message = "layer failed without a message".to_string();
        }
        Self {
            score: FALLBACK_SCORE,
            confidence: FALLBACK_CONFIDENCE,
            evidence: Evidence::new(),
            error: Some(message),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Human-readable reasons recorded by the layer
    pub fn reasons(&self) -> Vec<&str> {
        self.evidence
            .get("reasons")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl Default for LayerResult {
    fn default() -> Self {
        Self {
            score: 0.0,
            confidence: 0.0,
            evidence: Evidence::new(),
            error: None,
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return FALLBACK_SCORE;
    }
    value.clamp(0.0, 1.0)
}

/// Optional inputs some layers use (temporal, visual)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Unix timestamp (seconds) the token launched
    pub launch_timestamp: Option<i64>,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero or negative timestamps mean "unknown"
    pub fn with_launch_timestamp(mut self, timestamp: i64) -> Self {
        self.launch_timestamp = (timestamp > 0).then_some(timestamp);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.token_name = (!name.trim().is_empty()).then_some(name);
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        self.token_symbol = (!symbol.trim().is_empty()).then_some(symbol);
        self
    }
}

/// Output of one full fusion round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionOutput {
    pub risk_score: f64,
    pub confidence: f64,
    /// Keyed by layer name, or `{"error": message}` for the engine fallback
    pub evidence: Evidence,
    /// Hours until the predicted event, if risk is material
    pub time_to_event: Option<f64>,
    pub elapsed_seconds: f64,
}

impl FusionOutput {
    /// Well-formed neutral answer for an engine-level fault
    pub fn fallback(message: impl Into<String>, elapsed_seconds: f64) -> Self {
        let mut evidence = Evidence::new();
        evidence.insert("error".to_string(), Value::String(message.into()));
        Self {
            risk_score: FALLBACK_SCORE,
            confidence: FALLBACK_CONFIDENCE,
            evidence,
            time_to_event: None,
            elapsed_seconds,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }

    /// Engine fallback carries a top-level error entry
    pub fn is_fallback(&self) -> bool {
        self.evidence.get("error").map_or(false, Value::is_string)
    }
}

/// Risk level classification for fused scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Token appears safe
    Safe,
    /// Low risk - minor concerns
    Low,
    /// Medium risk - proceed with caution
    Medium,
    /// High risk - rugpull likely
    High,
    /// Critical - rugpull almost certain
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::Critical
        } else if score >= 0.6 {
            RiskLevel::High
        } else if score >= 0.4 {
            RiskLevel::Medium
        } else if score >= 0.2 {
            RiskLevel::Low
        } else {
            RiskLevel::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "✅",
            RiskLevel::Low => "🟡",
            RiskLevel::Medium => "🟠",
            RiskLevel::High => "🔴",
            RiskLevel::Critical => "💀",
        }
    }
}

/// Discretized temporal risk window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskWindow {
    Unknown,
    /// < 5 minutes since launch
    Extreme,
    /// < 12 minutes
    High,
    /// < 30 minutes
    Elevated,
    /// < 60 minutes
    Moderate,
    Low,
}

impl RiskWindow {
    pub const EXTREME_MINUTES: f64 = 5.0;
    pub const HIGH_MINUTES: f64 = 12.0;
    pub const ELEVATED_MINUTES: f64 = 30.0;
    pub const MODERATE_MINUTES: f64 = 60.0;

    /// Classify minutes since launch (negative = unknown)
    pub fn from_minutes(minutes: f64) -> Self {
        if minutes < 0.0 {
            RiskWindow::Unknown
        } else if minutes < Self::EXTREME_MINUTES {
            RiskWindow::Extreme
        } else if minutes < Self::HIGH_MINUTES {
            RiskWindow::High
        } else if minutes < Self::ELEVATED_MINUTES {
            RiskWindow::Elevated
        } else if minutes < Self::MODERATE_MINUTES {
            RiskWindow::Moderate
        } else {
            RiskWindow::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskWindow::Unknown => "UNKNOWN",
            RiskWindow::Extreme => "EXTREME",
            RiskWindow::High => "HIGH",
            RiskWindow::Elevated => "ELEVATED",
            RiskWindow::Moderate => "MODERATE",
            RiskWindow::Low => "LOW",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "EXTREME" => RiskWindow::Extreme,
            "HIGH" => RiskWindow::High,
            "ELEVATED" => RiskWindow::Elevated,
            "MODERATE" => RiskWindow::Moderate,
            "LOW" => RiskWindow::Low,
            _ => RiskWindow::Unknown,
        }
    }
}

// ============================================
// Verification
// ============================================

/// Chain-state cross-check: is the dominant liquidity account empty?
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainCheck {
    pub lp_removed: bool,
    pub cex_deposit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_account_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Security-report cross-check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityCheck {
    /// `rugged`, `risky`, `clean` or `unknown`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_score: Option<f64>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for SecurityCheck {
    fn default() -> Self {
        Self {
            status: "unknown".to_string(),
            report_score: None,
            risks: Vec::new(),
            error: None,
        }
    }
}

/// Market-data cross-check: 24h price and volume
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketCheck {
    pub price_change_24h: f64,
    pub volume_collapsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Raw per-source sub-records kept for audit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationSources {
    pub chain: ChainCheck,
    pub security: SecurityCheck,
    pub market: MarketCheck,
}

/// Ground truth for one token after the maturation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub is_rugpull: bool,
    pub liquidity_drained: bool,
    pub funds_moved_to_exchange: bool,
    pub price_drop_percent: f64,
    pub volume_collapsed: bool,
    pub security_status: String,
    pub sources: VerificationSources,
    pub verified_at: i64,
    pub hours_after_launch: f64,
}

/// One producer's prediction awaiting verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub risk_score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Value,
    pub time_to_event: Option<f64>,
    pub launch_timestamp: i64,
    pub queried_at: i64,
}

/// Recently launched token found by discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
    /// Unix seconds
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_neutral() {
        let result = LayerResult::fallback("boom");
        assert_eq!(result.score, 0.5);
        assert_eq!(result.confidence, 0.0);
        assert!(result.evidence.is_empty());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_fallback_never_has_empty_error() {
        let result = LayerResult::fallback("");
        assert!(!result.error.unwrap().is_empty());
    }

    #[test]
    fn test_new_clamps_scores() {
        let result = LayerResult::new(1.7, -0.2, Evidence::new());
        assert_eq!(result.score, 1.0);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.is_error());
    }

    #[test]
    fn test_risk_window_boundaries() {
        assert_eq!(RiskWindow::from_minutes(-1.0), RiskWindow::Unknown);
        assert_eq!(RiskWindow::from_minutes(4.9), RiskWindow::Extreme);
        assert_eq!(RiskWindow::from_minutes(5.0), RiskWindow::High);
        assert_eq!(RiskWindow::from_minutes(29.9), RiskWindow::Elevated);
        assert_eq!(RiskWindow::from_minutes(59.0), RiskWindow::Moderate);
        assert_eq!(RiskWindow::from_minutes(60.0), RiskWindow::Low);
        assert_eq!(RiskWindow::from_label("ELEVATED"), RiskWindow::Elevated);
        assert_eq!(RiskWindow::from_label("nonsense"), RiskWindow::Unknown);
    }

    #[test]
    fn test_context_ignores_blank_values() {
        let ctx = AnalysisContext::new()
            .with_launch_timestamp(0)
            .with_name("  ")
            .with_symbol("BONK");
        assert_eq!(ctx.launch_timestamp, None);
        assert_eq!(ctx.token_name, None);
        assert_eq!(ctx.token_symbol.as_deref(), Some("BONK"));
    }

    #[test]
    fn test_engine_fallback_shape() {
        let output = FusionOutput::fallback("engine exploded", 0.1);
        assert_eq!(output.risk_score, 0.5);
        assert_eq!(output.confidence, 0.0);
        assert!(output.is_fallback());
        assert_eq!(output.time_to_event, None);
    }
}
