//! Constants Module - Single Source of Truth
//!
//! Endpoints, timeouts, thresholds and reference tables used across layers
//! and the verifier. Other modules import from here instead of hardcoding.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "RugIntel";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound HTTP requests
pub const USER_AGENT: &str = concat!("RugIntel/", env!("CARGO_PKG_VERSION"));

// ============================================
// ENDPOINT DEFAULTS
// ============================================

pub const DEFAULT_SOLANA_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_DEXSCREENER_URL: &str = "https://api.dexscreener.com/latest/dex";
pub const DEFAULT_RUGCHECK_URL: &str = "https://api.rugcheck.xyz/v1";
pub const DEFAULT_TWITTER_SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

/// Chain slug used for DexScreener pair listings
pub const DEXSCREENER_CHAIN: &str = "solana";

// ============================================
// TIMING DEFAULTS
// ============================================

/// Per external call (seconds)
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 15;
/// Whole fusion fan-out (seconds)
pub const DEFAULT_ROUND_TIMEOUT_SECS: u64 = 30;
/// Transport timeout when querying producers (seconds)
pub const DEFAULT_PRODUCER_TIMEOUT_SECS: u64 = 30;
/// Ground-truth maturation window (hours)
pub const DEFAULT_MATURATION_HOURS: u64 = 24;
/// Pause between verifier rounds (seconds)
pub const DEFAULT_VERIFY_INTERVAL_SECS: u64 = 300;
/// Prediction cache TTL (seconds)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

pub const DEFAULT_DATA_DIR: &str = "data/validator";
pub const DEFAULT_DISCOVERY_LIMIT: usize = 5;
pub const DEFAULT_API_PORT: u16 = 8080;

// ============================================
// DISCOVERY
// ============================================

/// Only pairs created within this window count as new (ms)
pub const NEW_PAIR_WINDOW_MS: i64 = 3_600_000;
/// Pairs inspected per discovery call
pub const DISCOVERY_SCAN_LIMIT: usize = 50;

// ============================================
// LIQUIDITY
// ============================================

/// Owner programs treated as LP lockers
pub const LP_LOCKER_PROGRAMS: &[&str] = &["TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"];

/// Raydium AMM v4 program
pub const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

pub fn is_lp_locker(owner: &str) -> bool {
    LP_LOCKER_PROGRAMS.contains(&owner)
}

// ============================================
// SOCIAL
// ============================================

/// Shill phrases; one hit counted per mention
pub const PUMP_KEYWORDS: &[&str] = &[
    "100x",
    "1000x",
    "moonshot",
    "gem",
    "next sol",
    "early",
    "presale",
    "stealth launch",
    "safu",
    "based dev",
    "lfg",
    "dont miss",
    "last chance",
    "generational",
    "alpha leak",
];

/// Mentions fetched per search
pub const SOCIAL_MAX_RESULTS: u32 = 100;

// ============================================
// VISUAL
// ============================================

/// Well-known tokens commonly impersonated (symbol, name)
pub const KNOWN_TOKENS: &[(&str, &str)] = &[
    ("SOL", "Solana"),
    ("USDC", "USD Coin"),
    ("USDT", "Tether"),
    ("BONK", "Bonk"),
    ("WIF", "dogwifhat"),
    ("JTO", "Jito"),
    ("JUP", "Jupiter"),
    ("PYTH", "Pyth Network"),
    ("RAY", "Raydium"),
    ("ORCA", "Orca"),
    ("MNGO", "Mango Markets"),
    ("SAMO", "Samoyed Coin"),
    ("FIDA", "Bonfida"),
    ("SRM", "Serum"),
    ("STEP", "Step Finance"),
    ("COPE", "Cope"),
    ("ATLAS", "Star Atlas"),
    ("POLIS", "Star Atlas DAO"),
    ("RNDR", "Render Token"),
    ("HNT", "Helium"),
    ("MOBILE", "Helium Mobile"),
    ("W", "Wormhole"),
    ("TENSOR", "Tensor"),
    ("KMNO", "Kamino"),
    ("DRIFT", "Drift Protocol"),
    ("POPCAT", "Popcat"),
    ("MEW", "cat in a dogs world"),
    ("BOME", "BOOK OF MEME"),
    ("WEN", "Wen"),
    ("MYRO", "Myro"),
    ("SLERF", "SLERF"),
    ("TRUMP", "TRUMP"),
    ("PEPE", "Pepe"),
    ("DOGE", "Dogecoin"),
    ("SHIB", "Shiba Inu"),
    ("LINK", "Chainlink"),
    ("UNI", "Uniswap"),
    ("AAVE", "Aave"),
    ("BTC", "Bitcoin"),
    ("ETH", "Ethereum"),
    ("BNB", "BNB"),
    ("ADA", "Cardano"),
    ("DOT", "Polkadot"),
    ("AVAX", "Avalanche"),
    ("MATIC", "Polygon"),
    ("ARB", "Arbitrum"),
    ("OP", "Optimism"),
    ("SUI", "Sui"),
    ("APT", "Aptos"),
    ("SEI", "Sei"),
];

// ============================================
// VERIFICATION
// ============================================

/// 24h price change at or below this confirms a rugpull (percent)
pub const RUGPULL_PRICE_DROP_THRESHOLD: f64 = -90.0;

/// 24h volume below this counts as collapsed (USD)
pub const VOLUME_COLLAPSE_USD: f64 = 100.0;

/// Risk names kept in the security sub-check
pub const VERIFY_MAX_RISK_NAMES: usize = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tokens_table() {
        assert_eq!(KNOWN_TOKENS.len(), 50);
        assert!(KNOWN_TOKENS.iter().any(|(s, n)| *s == "BONK" && *n == "Bonk"));
    }

    #[test]
    fn test_lp_locker() {
        assert!(is_lp_locker("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"));
        assert!(!is_lp_locker(RAYDIUM_AMM_V4));
    }
}
