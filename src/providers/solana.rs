//! Solana JSON-RPC Provider
//!
//! Chain-state queries used by the liquidity and wallet layers and by the
//! verifier's liquidity-drain check:
//! - getTokenLargestAccounts: top token accounts of a mint
//! - getAccountInfo (jsonParsed): owner program of an account
//! - getTokenSupply: raw total supply

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{build_http_client, check_status, parse_amount, ChainSource, SourceKind};
use crate::models::errors::{AppError, AppResult};

// ============================================
// SOLANA RPC TYPES
// ============================================

/// Token account entry from getTokenLargestAccounts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccount {
    pub address: String,
    /// Raw amount, string-encoded to avoid u64 precision loss
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount: Option<f64>,
}

impl TokenAccount {
    pub fn raw_amount(&self) -> f64 {
        parse_amount(&self.amount)
    }
}

/// Account info, only the fields we read
#[derive(Debug, Clone, Deserialize)]
pub struct AccountOwner {
    pub owner: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenSupply {
    pub amount: String,
}

/// `{"context": {...}, "value": T}` wrapper
#[derive(Debug, Deserialize)]
pub struct RpcValue<T> {
    pub value: T,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// Rate limit (HTTP 429 surfaced as code -32005 by some providers)
    pub fn is_rate_limit(&self) -> bool {
        self.code == -32005 || self.message.to_lowercase().contains("rate limit")
    }
}

impl<T> RpcResponse<T> {
    /// Result or a classified error
    pub fn into_result(self, method: &str) -> AppResult<T> {
        if let Some(error) = self.error {
            if error.is_rate_limit() {
                return Err(AppError::source_rate_limited(SourceKind::Chain.as_str()));
            }
            return Err(AppError::invalid_response(format!(
                "{} RPC error: {} (code: {})",
                method, error.message, error.code
            )));
        }
        self.result
            .ok_or_else(|| AppError::invalid_response(format!("{}: no result in response", method)))
    }
}

// ============================================
// CLIENT
// ============================================

/// Solana JSON-RPC client
pub struct SolanaRpcClient {
    client: reqwest::Client,
    rpc_url: String,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            rpc_url: rpc_url.into(),
        })
    }

    /// Execute single RPC call
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> AppResult<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self.client.post(&self.rpc_url).json(&payload).send().await?;
        check_status(SourceKind::Chain, response.status())?;

        let json: RpcResponse<T> = response.json().await.map_err(|e| {
            AppError::invalid_response(format!("Failed to parse {} response: {}", method, e))
        })?;

        json.into_result(method)
    }
}

#[async_trait]
impl ChainSource for SolanaRpcClient {
    async fn largest_accounts(&self, mint: &str) -> AppResult<Vec<TokenAccount>> {
        let result: RpcValue<Vec<TokenAccount>> = self
            .call("getTokenLargestAccounts", serde_json::json!([mint]))
            .await?;
        debug!(token = mint, accounts = result.value.len(), "Largest accounts fetched");
        Ok(result.value)
    }

    async fn account_owner(&self, account: &str) -> AppResult<Option<String>> {
        let result: RpcValue<Option<AccountOwner>> = self
            .call(
                "getAccountInfo",
                serde_json::json!([account, { "encoding": "jsonParsed" }]),
            )
            .await?;
        Ok(result.value.map(|info| info.owner))
    }

    async fn token_supply(&self, mint: &str) -> AppResult<f64> {
        let result: RpcValue<TokenSupply> = self
            .call("getTokenSupply", serde_json::json!([mint]))
            .await?;
        Ok(parse_amount(&result.value.amount))
    }
}
