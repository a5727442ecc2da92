//! DexScreener API Client
//!
//! Market data aggregator used by the market, temporal and visual layers,
//! by the verifier's 24h market check and by token discovery.
//!
//! API: https://api.dexscreener.com/latest/dex/tokens/{tokenAddress}
//! Free, no API key required. Data lags real time by a few seconds.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{build_http_client, check_status, MarketSource, SourceKind};
use crate::models::errors::{AppError, AppResult};
use crate::models::types::NewToken;
use crate::utils::constants::{DEXSCREENER_CHAIN, DISCOVERY_SCAN_LIMIT, NEW_PAIR_WINDOW_MS};

/// DexScreener API response
#[derive(Debug, Deserialize)]
pub struct DexScreenerResponse {
    #[serde(default)]
    pub pairs: Option<Vec<DexPair>>,
}

/// A trading pair from DexScreener
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub dex_id: String,
    #[serde(default)]
    pub pair_address: String,
    #[serde(default)]
    pub base_token: DexToken,
    /// Price in USD (string-encoded by the API)
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub liquidity: Option<DexLiquidity>,
    #[serde(default)]
    pub volume: Option<DexWindows>,
    #[serde(default)]
    pub price_change: Option<DexWindows>,
    #[serde(default)]
    pub txns: Option<DexTxnWindows>,
    /// Pair creation time (unix ms)
    #[serde(default)]
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexToken {
    #[serde(default)]
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexLiquidity {
    pub usd: Option<f64>,
    pub base: Option<f64>,
    pub quote: Option<f64>,
}

/// Per-window values (volume in USD or price change in percent)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexWindows {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexTxnCount {
    #[serde(default)]
    pub buys: u64,
    #[serde(default)]
    pub sells: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexTxnWindows {
    #[serde(default)]
    pub m5: DexTxnCount,
    #[serde(default)]
    pub h1: DexTxnCount,
}

impl DexPair {
    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    pub fn price_usd(&self) -> f64 {
        self.price_usd
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    pub fn volume(&self) -> DexWindows {
        self.volume.clone().unwrap_or_default()
    }

    pub fn price_change(&self) -> DexWindows {
        self.price_change.clone().unwrap_or_default()
    }

    pub fn txns(&self) -> DexTxnWindows {
        self.txns.clone().unwrap_or_default()
    }
}

/// Pair with the highest USD liquidity; first one wins ties
pub fn main_pair(pairs: &[DexPair]) -> Option<&DexPair> {
    pairs.iter().fold(None, |best: Option<&DexPair>, pair| match best {
        Some(b) if b.liquidity_usd() >= pair.liquidity_usd() => Some(b),
        _ => Some(pair),
    })
}

/// Recently created pairs as discovery candidates.
/// Scans the first 50 listings, keeps pairs created after `now_ms - 1h`.
pub fn new_tokens_from_pairs(pairs: &[DexPair], now_ms: i64, limit: usize) -> Vec<NewToken> {
    let cutoff = now_ms - NEW_PAIR_WINDOW_MS;

    pairs
        .iter()
        .take(DISCOVERY_SCAN_LIMIT)
        .filter_map(|pair| {
            let created = pair.pair_created_at?;
            if created <= cutoff || pair.base_token.address.is_empty() {
                return None;
            }
            Some(NewToken {
                address: pair.base_token.address.clone(),
                name: pair.base_token.name.clone().unwrap_or_default(),
                symbol: pair.base_token.symbol.clone().unwrap_or_default(),
                timestamp: created / 1000,
            })
        })
        .take(limit)
        .collect()
}

/// DexScreener API client
pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_pairs(&self, url: &str) -> AppResult<Vec<DexPair>> {
        let response = self.client.get(url).send().await?;
        check_status(SourceKind::Market, response.status())?;

        let data: DexScreenerResponse = response.json().await.map_err(|e| {
            AppError::invalid_response(format!("Failed to parse DexScreener response: {}", e))
        })?;

        Ok(data.pairs.unwrap_or_default())
    }
}

#[async_trait]
impl MarketSource for DexScreenerClient {
    async fn token_pairs(&self, token: &str) -> AppResult<Vec<DexPair>> {
        let url = format!("{}/tokens/{}", self.base_url, token);
        let pairs = self.fetch_pairs(&url).await?;
        debug!(token, pairs = pairs.len(), "📊 DexScreener pairs fetched");
        Ok(pairs)
    }

    async fn chain_pairs(&self) -> AppResult<Vec<DexPair>> {
        let url = format!("{}/pairs/{}", self.base_url, DEXSCREENER_CHAIN);
        self.fetch_pairs(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "solana",
                "dexId": "raydium",
                "pairAddress": "PairLow",
                "baseToken": {"address": "Mint111", "name": "Bonk", "symbol": "BONK"},
                "priceUsd": "0.00002",
                "liquidity": {"usd": 1500.5},
                "volume": {"m5": 10.0, "h1": 120.0, "h6": 500.0, "h24": 900.0},
                "priceChange": {"m5": 1.5, "h1": -3.0, "h24": 12.0},
                "txns": {"m5": {"buys": 3, "sells": 1}, "h1": {"buys": 20, "sells": 9}},
                "pairCreatedAt": 1700000000000
            },
            {
                "chainId": "solana",
                "dexId": "orca",
                "pairAddress": "PairHigh",
                "baseToken": {"address": "Mint111"},
                "liquidity": {"usd": 88000}
            }
        ]
    }"#;

    #[test]
    fn test_parse_pairs() {
        let data: DexScreenerResponse = serde_json::from_str(SAMPLE).unwrap();
        let pairs = data.pairs.unwrap();
        assert_eq!(pairs.len(), 2);

        let first = &pairs[0];
        assert_eq!(first.price_usd(), 0.00002);
        assert_eq!(first.volume().h1, Some(120.0));
        assert_eq!(first.price_change().h6, None);
        assert_eq!(first.txns().m5.buys, 3);
        assert_eq!(first.pair_created_at, Some(1_700_000_000_000));

        let second = &pairs[1];
        assert_eq!(second.price_usd(), 0.0);
        assert_eq!(second.txns().h1.sells, 0);
    }

    #[test]
    fn test_null_pairs() {
        let data: DexScreenerResponse = serde_json::from_str(r#"{"pairs": null}"#).unwrap();
        assert!(data.pairs.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_main_pair_highest_liquidity() {
        let data: DexScreenerResponse = serde_json::from_str(SAMPLE).unwrap();
        let pairs = data.pairs.unwrap();
        assert_eq!(main_pair(&pairs).unwrap().pair_address, "PairHigh");
        assert!(main_pair(&[]).is_none());
    }

    #[test]
    fn test_new_tokens_window() {
        let now_ms = 1_700_000_000_000;
        let fresh = DexPair {
            base_token: DexToken {
                address: "Fresh".into(),
                name: Some("Fresh Token".into()),
                symbol: Some("FRSH".into()),
            },
            pair_created_at: Some(now_ms - 60_000),
            ..DexPair::default()
        };
        let stale = DexPair {
            base_token: DexToken {
                address: "Stale".into(),
                ..DexToken::default()
            },
            pair_created_at: Some(now_ms - 2 * 3_600_000),
            ..DexPair::default()
        };
        let undated = DexPair {
            base_token: DexToken {
                address: "Undated".into(),
                ..DexToken::default()
            },
            ..DexPair::default()
        };

        let tokens = new_tokens_from_pairs(&[stale, fresh.clone(), undated, fresh], now_ms, 1);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].address, "Fresh");
        assert_eq!(tokens[0].symbol, "FRSH");
        assert_eq!(tokens[0].timestamp, (now_ms - 60_000) / 1000);
    }
}
