//! Configuration for RugIntel
//!
//! Endpoints and defaults live in utils/constants.rs; this file only reads
//! the environment and falls back to them.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_API_PORT, DEFAULT_CACHE_TTL_SECS, DEFAULT_DATA_DIR, DEFAULT_DEXSCREENER_URL,
    DEFAULT_DISCOVERY_LIMIT, DEFAULT_MATURATION_HOURS, DEFAULT_PRODUCER_TIMEOUT_SECS,
    DEFAULT_ROUND_TIMEOUT_SECS, DEFAULT_RUGCHECK_URL, DEFAULT_SOLANA_RPC_URL,
    DEFAULT_SOURCE_TIMEOUT_SECS, DEFAULT_TWITTER_SEARCH_URL, DEFAULT_VERIFY_INTERVAL_SECS,
};

/// Runtime configuration shared by the producer API and the verifier loop
#[derive(Debug, Clone)]
pub struct RugIntelConfig {
    /// Chain-state JSON-RPC endpoint
    pub solana_rpc_url: String,
    /// Market data aggregator base URL
    pub dexscreener_url: String,
    /// Contract security report base URL
    pub rugcheck_url: String,
    /// Social mentions search endpoint
    pub twitter_search_url: String,
    /// Never logged
    pub twitter_bearer_token: Option<String>,
    /// Timeout for each external call
    pub source_timeout: Duration,
    /// Deadline for one whole fan-out round
    pub round_timeout: Duration,
    /// Delay before a prediction can be checked against ground truth
    pub maturation_window: Duration,
    /// Directory holding the pending-verification store
    pub data_dir: PathBuf,
    /// Pause between verifier rounds
    pub verification_interval: Duration,
    /// Producer base URLs the verifier queries
    pub producers: Vec<String>,
    pub producer_timeout: Duration,
    /// Key presented to producers that restrict requesters
    pub producer_api_key: Option<String>,
    /// Tokens discovered per verifier round
    pub discovery_limit: usize,
    pub api_host: String,
    pub api_port: u16,
    /// Empty = open access
    pub api_keys: Vec<String>,
    pub cache_ttl: Duration,
}

impl Default for RugIntelConfig {
    fn default() -> Self {
        Self {
            solana_rpc_url: DEFAULT_SOLANA_RPC_URL.to_string(),
            dexscreener_url: DEFAULT_DEXSCREENER_URL.to_string(),
            rugcheck_url: DEFAULT_RUGCHECK_URL.to_string(),
            twitter_search_url: DEFAULT_TWITTER_SEARCH_URL.to_string(),
            twitter_bearer_token: None,
            source_timeout: Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS),
            round_timeout: Duration::from_secs(DEFAULT_ROUND_TIMEOUT_SECS),
            maturation_window: Duration::from_secs(DEFAULT_MATURATION_HOURS * 3600),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            verification_interval: Duration::from_secs(DEFAULT_VERIFY_INTERVAL_SECS),
            producers: Vec::new(),
            producer_timeout: Duration::from_secs(DEFAULT_PRODUCER_TIMEOUT_SECS),
            producer_api_key: None,
            discovery_limit: DEFAULT_DISCOVERY_LIMIT,
            api_host: "0.0.0.0".to_string(),
            api_port: DEFAULT_API_PORT,
            api_keys: Vec::new(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl RugIntelConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let twitter_bearer_token = std::env::var("TWITTER_BEARER_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        if twitter_bearer_token.is_some() {
            info!("🔑 TWITTER_BEARER_TOKEN configured (token hidden)");
        }

        let api_port = env_parse("PORT")
            .or_else(|| env_parse("RUGINTEL_PORT"))
            .unwrap_or(defaults.api_port);

        Self {
            solana_rpc_url: env_string("SOLANA_RPC_URL").unwrap_or(defaults.solana_rpc_url),
            dexscreener_url: env_string("DEXSCREENER_URL").unwrap_or(defaults.dexscreener_url),
            rugcheck_url: env_string("RUGCHECK_URL").unwrap_or(defaults.rugcheck_url),
            twitter_search_url: env_string("TWITTER_SEARCH_URL")
                .unwrap_or(defaults.twitter_search_url),
            twitter_bearer_token,
            source_timeout: env_secs("RUGINTEL_SOURCE_TIMEOUT_SECS")
                .unwrap_or(defaults.source_timeout),
            round_timeout: env_secs("RUGINTEL_ROUND_TIMEOUT_SECS")
                .unwrap_or(defaults.round_timeout),
            maturation_window: env_parse::<u64>("GROUND_TRUTH_WAIT_HOURS")
                .map(|h| Duration::from_secs(h.saturating_mul(3600)))
                .unwrap_or(defaults.maturation_window),
            data_dir: env_string("RUGINTEL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            verification_interval: env_secs("RUGINTEL_VERIFY_INTERVAL_SECS")
                .unwrap_or(defaults.verification_interval),
            producers: env_list("RUGINTEL_PRODUCERS"),
            producer_timeout: env_secs("RUGINTEL_PRODUCER_TIMEOUT_SECS")
                .unwrap_or(defaults.producer_timeout),
            producer_api_key: env_string("RUGINTEL_PRODUCER_API_KEY"),
            discovery_limit: env_parse("RUGINTEL_DISCOVERY_LIMIT")
                .unwrap_or(defaults.discovery_limit),
            api_host: env_string("RUGINTEL_HOST").unwrap_or(defaults.api_host),
            api_port,
            api_keys: env_list("RUGINTEL_API_KEYS"),
            cache_ttl: env_secs("RUGINTEL_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
        }
    }

    /// Reject values that would make a round meaningless
    pub fn validate(&self) -> AppResult<()> {
        if self.source_timeout.is_zero() {
            return Err(AppError::invalid_config("source timeout must be non-zero"));
        }
        if self.round_timeout.is_zero() {
            return Err(AppError::invalid_config("round timeout must be non-zero"));
        }
        if self.producer_timeout.is_zero() {
            return Err(AppError::invalid_config("producer timeout must be non-zero"));
        }
        if self.maturation_window.is_zero() {
            return Err(AppError::invalid_config(
                "maturation window must be at least one hour",
            ));
        }
        Ok(())
    }

    /// Path of the pending-verification document
    pub fn pending_path(&self) -> PathBuf {
        self.data_dir.join("pending_verifications.json")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Unparseable config value, using default");
            None
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

fn env_list(key: &str) -> Vec<String> {
    env_string(key)
        .map(|raw| split_list(&raw))
        .unwrap_or_default()
}

/// Split a comma-separated list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RugIntelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.maturation_window, Duration::from_secs(24 * 3600));
        assert_eq!(config.source_timeout, Duration::from_secs(15));
        assert!(config.producers.is_empty());
        assert!(config.pending_path().ends_with("pending_verifications.json"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = RugIntelConfig {
            round_timeout: Duration::ZERO,
            ..RugIntelConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code_str(), "CFG_INVALID_VALUE");
    }

    #[test]
    fn test_zero_maturation_rejected() {
        let config = RugIntelConfig {
            maturation_window: Duration::ZERO,
            ..RugIntelConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" http://a:8080, ,http://b:8080 "),
            vec!["http://a:8080".to_string(), "http://b:8080".to_string()]
        );
        assert!(split_list("").is_empty());
    }
}
