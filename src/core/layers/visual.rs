//! Visual Layer - impersonation of well-known tokens
//!
//! Compares the token's name and symbol against a fixed list of established
//! tokens. Near-identical names ("SOLANAA", "B0NK") are a common lure.
//! Lowest fusion weight (0.03).

use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::into_evidence;
use crate::models::errors::AppResult;
use crate::models::types::{AnalysisContext, LayerResult};
use crate::providers::{main_pair, MarketSource};
use crate::utils::constants::KNOWN_TOKENS;
use crate::utils::numeric::round_dp;
use crate::utils::similarity::similarity_ratio;

const CRITICAL_SIMILARITY: f64 = 0.85;
const WARNING_SIMILARITY: f64 = 0.70;

/// Closest known token for one field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameMatch {
    pub similarity: f64,
    pub matched: Option<String>,
    pub exact: bool,
}

/// Best match of `value` against one column of the known-token table
pub fn closest_known(value: &str, by_symbol: bool) -> NameMatch {
    let candidate = value.trim().to_uppercase();
    if candidate.is_empty() {
        return NameMatch::default();
    }

    let mut best = NameMatch::default();
    for (symbol, name) in KNOWN_TOKENS {
        let known = if by_symbol {
            symbol.to_uppercase()
        } else {
            name.to_uppercase()
        };
        if candidate == known {
            return NameMatch {
                similarity: 1.0,
                matched: Some(known),
                exact: true,
            };
        }
        let similarity = round_dp(similarity_ratio(&candidate, &known), 4);
        if similarity > best.similarity {
            best = NameMatch {
                similarity,
                matched: Some(known),
                exact: false,
            };
        }
    }
    best
}

/// Score name and symbol matches
pub fn calculate_risk(name: &NameMatch, symbol: &NameMatch) -> LayerResult {
    let mut reasons = Vec::new();

    for (field, m) in [("Name", name), ("Symbol", symbol)] {
        let Some(target) = &m.matched else { continue };
        if m.exact {
            continue;
        }
        if m.similarity >= CRITICAL_SIMILARITY {
            reasons.push(format!(
                "CRITICAL: {} {:.0}% similar to {}",
                field,
                m.similarity * 100.0,
                target
            ));
        } else if m.similarity >= WARNING_SIMILARITY {
            reasons.push(format!(
                "WARNING: {} {:.0}% similar to {}",
                field,
                m.similarity * 100.0,
                target
            ));
        }
    }

    let best = if name.similarity > symbol.similarity {
        name
    } else {
        symbol
    };
    let s = best.similarity;

    let score = if best.exact {
        reasons.push(format!(
            "Exact match with {} (likely the genuine token)",
            best.matched.as_deref().unwrap_or_default()
        ));
        0.0
    } else if s >= CRITICAL_SIMILARITY {
        0.85
    } else if s >= WARNING_SIMILARITY {
        0.3 + (s - WARNING_SIMILARITY) * 1.33
    } else {
        s * 0.2
    };
    let score = round_dp(score, 4);
    let confidence = if s > 0.5 { 0.8 } else { 0.4 };

    let evidence = into_evidence(json!({
        "score": score,
        "max_similarity": s,
        "matched_token": best.matched,
        "exact_match": best.exact,
        "name_similarity": name.similarity,
        "symbol_similarity": symbol.similarity,
        "reasons": reasons,
    }));

    LayerResult::new(score, confidence, evidence)
}

pub struct VisualLayer {
    market: Arc<dyn MarketSource>,
}

impl VisualLayer {
    pub fn new(market: Arc<dyn MarketSource>) -> Self {
        Self { market }
    }

    pub async fn analyze(&self, address: &str, ctx: &AnalysisContext) -> AppResult<LayerResult> {
        let (mut name, mut symbol) = (ctx.token_name.clone(), ctx.token_symbol.clone());

        if name.is_none() && symbol.is_none() {
            match self.market.token_pairs(address).await {
                Ok(pairs) => {
                    if let Some(pair) = main_pair(&pairs) {
                        name = pair.base_token.name.clone();
                        symbol = pair.base_token.symbol.clone();
                    }
                }
                Err(e) => {
                    warn!(token = address, error = %e, "Name lookup failed");
                }
            }
        }

        let name = name.filter(|n| !n.trim().is_empty());
        let symbol = symbol.filter(|s| !s.trim().is_empty());
        if name.is_none() && symbol.is_none() {
            return Ok(LayerResult::new(
                0.0,
                0.1,
                into_evidence(json!({
                    "note": "No token name/symbol provided",
                    "reasons": [],
                })),
            ));
        }

        let name_match = name.map(|n| closest_known(&n, false)).unwrap_or_default();
        let symbol_match = symbol.map(|s| closest_known(&s, true)).unwrap_or_default();
        Ok(calculate_risk(&name_match, &symbol_match))
    }
}
