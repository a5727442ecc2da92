//! Providers Module - External Data Sources
//!
//! One async capability trait per source kind. Layers and the verifier hold
//! sources as `Arc<dyn ...>` so tests can substitute in-memory fakes.
//!
//! - `solana`: chain state over JSON-RPC
//! - `dexscreener`: market data aggregator
//! - `rugcheck`: contract security reports
//! - `twitter`: social mention search
//! - `producer`: prediction requests to producer nodes

pub mod dexscreener;
pub mod producer;
pub mod rugcheck;
pub mod solana;
pub mod twitter;

pub use dexscreener::*;
pub use producer::*;
pub use rugcheck::*;
pub use solana::*;
pub use twitter::*;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::api::types::{PredictRequest, PredictResponse};
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::USER_AGENT;

/// Category of external source, used in logs and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Chain,
    Market,
    SecurityReport,
    Social,
    Producer,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Chain => "solana_rpc",
            SourceKind::Market => "dexscreener",
            SourceKind::SecurityReport => "rugcheck",
            SourceKind::Social => "twitter",
            SourceKind::Producer => "producer",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Capability traits
// ============================================

/// Chain-state queries (token accounts, supply, account owners)
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Largest token accounts for a mint, largest first
    async fn largest_accounts(&self, mint: &str) -> AppResult<Vec<TokenAccount>>;

    /// Owner program of an account, `None` if the account does not exist
    async fn account_owner(&self, account: &str) -> AppResult<Option<String>>;

    /// Raw total supply of a mint
    async fn token_supply(&self, mint: &str) -> AppResult<f64>;
}

/// Market data aggregator
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// All trading pairs for a token, in source order
    async fn token_pairs(&self, token: &str) -> AppResult<Vec<DexPair>>;

    /// Latest pair listings on the configured chain
    async fn chain_pairs(&self) -> AppResult<Vec<DexPair>>;
}

/// Contract security report provider
#[async_trait]
pub trait SecurityReportSource: Send + Sync {
    /// `None` when the token has no report
    async fn report(&self, token: &str) -> AppResult<Option<SecurityReport>>;
}

/// Social mention search
#[async_trait]
pub trait SocialSource: Send + Sync {
    /// False when credentials are missing; callers fall back to heuristics
    fn is_configured(&self) -> bool;

    async fn recent_mentions(&self, token: &str) -> AppResult<MentionBatch>;
}

/// Prediction transport towards producer nodes
#[async_trait]
pub trait ProducerSource: Send + Sync {
    async fn predict(&self, producer: &str, request: &PredictRequest) -> AppResult<PredictResponse>;
}

// ============================================
// Shared HTTP helpers
// ============================================

/// Build the HTTP client a provider owns for its lifetime
pub fn build_http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .gzip(true)
        .build()
        .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))
}

/// Map a non-success status to the matching error
pub fn check_status(kind: SourceKind, status: reqwest::StatusCode) -> AppResult<()> {
    if status.is_success() {
        Ok(())
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Err(AppError::source_rate_limited(kind.as_str()))
    } else {
        Err(AppError::source_status(kind.as_str(), status.as_u16()))
    }
}

/// Lenient float parse for string-encoded amounts; bad input reads as 0
pub(crate) fn parse_amount(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}
