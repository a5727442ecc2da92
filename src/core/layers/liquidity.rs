//! Liquidity Layer - LP pool and lock analysis
//!
//! Unlocked liquidity is the most direct rugpull vector, hence the highest
//! fusion weight (0.25). The layer finds the dominant pool account and
//! checks whether its owner program is a known locker.

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::into_evidence;
use crate::models::errors::AppResult;
use crate::models::types::LayerResult;
use crate::providers::{ChainSource, TokenAccount};
use crate::utils::constants::is_lp_locker;

/// Largest accounts summed into `total_in_top_pools`
const TOP_POOL_ACCOUNTS: usize = 3;

/// Where the liquidity sits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolInfo {
    pub pool_found: bool,
    pub largest_account: Option<String>,
    pub largest_amount: f64,
    pub top_accounts: usize,
    pub total_in_top_pools: f64,
}

impl PoolInfo {
    pub fn from_accounts(accounts: &[TokenAccount]) -> Self {
        let Some(largest) = accounts.first() else {
            return Self::default();
        };

        Self {
            pool_found: true,
            largest_account: Some(largest.address.clone()),
            largest_amount: largest.raw_amount(),
            top_accounts: accounts.len(),
            total_in_top_pools: accounts
                .iter()
                .take(TOP_POOL_ACCOUNTS)
                .map(TokenAccount::raw_amount)
                .sum(),
        }
    }
}

/// Lock state of the dominant pool account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockStatus {
    pub locked: bool,
    pub owner_program: Option<String>,
    /// Chain state does not expose lock expiry; always `None` from RPC
    pub lock_duration_hours: Option<f64>,
    pub reason: String,
}

impl LockStatus {
    pub fn from_owner(owner: Option<String>) -> Self {
        match owner {
            None => Self {
                reason: "Account not found".to_string(),
                ..Self::default()
            },
            Some(program) if is_lp_locker(&program) => Self {
                locked: true,
                reason: "Owned by known locker program".to_string(),
                owner_program: Some(program),
                lock_duration_hours: None,
            },
            Some(program) => Self {
                locked: false,
                reason: "Owner is not a locker program".to_string(),
                owner_program: Some(program),
                lock_duration_hours: None,
            },
        }
    }
}

/// Score pool and lock status
pub fn calculate_risk(pool: &PoolInfo, lock: &LockStatus) -> LayerResult {
    let mut reasons = Vec::new();

    let score = if !pool.pool_found {
        reasons.push("No liquidity pool found".to_string());
        0.8
    } else if !lock.locked {
        reasons.push("LP tokens NOT locked - high rugpull risk".to_string());
        0.9
    } else {
        match lock.lock_duration_hours {
            Some(hours) if hours < 72.0 => {
                reasons.push(format!("LP lock expires soon ({:.1}h)", hours));
                0.7
            }
            Some(hours) if hours < 720.0 => {
                reasons.push(format!("LP locked for {:.0} days", hours / 24.0));
                0.3
            }
            Some(hours) => {
                reasons.push(format!("LP locked long-term ({:.0} days)", hours / 24.0));
                0.1
            }
            None => {
                reasons.push("LP locked, duration unknown".to_string());
                0.4
            }
        }
    };

    let confidence = if pool.pool_found { 0.7 } else { 0.3 };

    let evidence = into_evidence(json!({
        "score": score,
        "lp_found": pool.pool_found,
        "lp_locked": lock.locked,
        "lock_duration_hours": lock.lock_duration_hours,
        "largest_lp_account": pool.largest_account,
        "reasons": reasons,
    }));

    LayerResult::new(score, confidence, evidence)
}

pub struct LiquidityLayer {
    chain: Arc<dyn ChainSource>,
}

impl LiquidityLayer {
    pub fn new(chain: Arc<dyn ChainSource>) -> Self {
        Self { chain }
    }

    pub async fn analyze(&self, address: &str) -> AppResult<LayerResult> {
        let accounts = self.chain.largest_accounts(address).await?;
        let pool = PoolInfo::from_accounts(&accounts);

        let lock = match &pool.largest_account {
            Some(account) => LockStatus::from_owner(self.chain.account_owner(account).await?),
            None => LockStatus::default(),
        };

        debug!(
            token = address,
            pool_found = pool.pool_found,
            locked = lock.locked,
            "Liquidity status"
        );

        Ok(calculate_risk(&pool, &lock))
    }
}
