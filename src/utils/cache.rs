//! In-Memory Prediction Cache
//!
//! Several requesters tend to ask about the same fresh token within seconds
//! of each other. A short TTL cache lets the producer answer all of them
//! from one fusion round.
//!
//! Features:
//! - TTL-based expiration (30s default)
//! - Keyed by address plus request context, since temporal and visual
//!   scores depend on it
//! - Whitespace-trimmed addresses (base58 is case-sensitive)
//! - Hit/miss counters for /v1/stats
//! - Thread-safe with DashMap

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::types::{AnalysisContext, FusionOutput};
use crate::utils::constants::DEFAULT_CACHE_TTL_SECS;

/// Cache entry with creation time for TTL checks
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub output: FusionOutput,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    /// Seconds left before expiry
    pub fn remaining_ttl(&self) -> u64 {
        self.ttl.saturating_sub(self.created_at.elapsed()).as_secs()
    }
}

/// Token address plus the context the output was computed with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub address: String,
    pub ctx: AnalysisContext,
}

impl CacheKey {
    pub fn new(address: &str, ctx: &AnalysisContext) -> Self {
        Self {
            address: address.trim().to_string(),
            ctx: ctx.clone(),
        }
    }
}

/// Shared TTL cache of fusion outputs
#[derive(Clone)]
pub struct PredictionCache {
    store: Arc<DashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl Default for PredictionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached output if present and still fresh
    pub fn get(&self, address: &str, ctx: &AnalysisContext) -> Option<FusionOutput> {
        let key = CacheKey::new(address, ctx);

        let Some(entry) = self.store.get(&key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(token = %key.address, "📭 CACHE MISS");
            return None;
        };

        if entry.is_expired() {
            drop(entry);
            self.store.remove(&key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(token = %key.address, "📭 CACHE MISS (expired)");
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(token = %key.address, remaining_secs = entry.remaining_ttl(), "✅ CACHE HIT");
        Some(entry.output.clone())
    }

    /// Store an output. Engine fallbacks are never cached so the next
    /// request gets a fresh attempt.
    pub fn set(&self, address: &str, ctx: &AnalysisContext, output: FusionOutput) {
        if output.is_fallback() {
            return;
        }
        self.store.insert(
            CacheKey::new(address, ctx),
            CacheEntry {
                output,
                created_at: Instant::now(),
                ttl: self.ttl,
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.store.len())
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::Evidence;

    fn mock_output() -> FusionOutput {
        FusionOutput {
            risk_score: 0.42,
            confidence: 0.6,
            evidence: Evidence::new(),
            time_to_event: None,
            elapsed_seconds: 0.2,
        }
    }

    fn no_ctx() -> AnalysisContext {
        AnalysisContext::new()
    }

    #[test]
    fn test_cache_set_get() {
        let cache = PredictionCache::new();
        cache.set("So11111111111111111111111111111111111111112", &no_ctx(), mock_output());
        let hit = cache.get(" So11111111111111111111111111111111111111112 ", &no_ctx());
        assert_eq!(hit.map(|o| o.risk_score), Some(0.42));
    }

    #[test]
    fn test_addresses_are_case_sensitive() {
        let cache = PredictionCache::new();
        cache.set("AbCdEf", &no_ctx(), mock_output());
        assert!(cache.get("abcdef", &no_ctx()).is_none());
    }

    #[test]
    fn test_context_is_part_of_key() {
        let cache = PredictionCache::new();
        let launched = AnalysisContext::new().with_launch_timestamp(1_700_000_000);
        let named = launched.clone().with_name("Bonk").with_symbol("BONK");

        cache.set("token", &launched, mock_output());
        assert!(cache.get("token", &no_ctx()).is_none());
        assert!(cache.get("token", &named).is_none());
        assert!(cache.get("token", &launched).is_some());
    }

    #[test]
    fn test_fallback_not_cached() {
        let cache = PredictionCache::new();
        cache.set("token", &no_ctx(), FusionOutput::fallback("boom", 0.0));
        assert!(cache.get("token", &no_ctx()).is_none());
    }

    #[test]
    fn test_expired_entries_miss() {
        let cache = PredictionCache::with_ttl(Duration::ZERO);
        cache.set("token", &no_ctx(), mock_output());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("token", &no_ctx()).is_none());
        assert_eq!(cache.cleanup_expired(), 0);
    }

    #[test]
    fn test_cleanup_counts_removed() {
        let cache = PredictionCache::with_ttl(Duration::ZERO);
        cache.set("a", &no_ctx(), mock_output());
        cache.set("b", &no_ctx(), mock_output());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.cleanup_expired(), 2);
        assert_eq!(cache.cleanup_expired(), 0);
    }

    #[test]
    fn test_cache_stats() {
        let cache = PredictionCache::new();
        cache.set("token", &no_ctx(), mock_output());
        cache.get("token", &no_ctx());
        cache.get("missing", &no_ctx());

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 50.0).abs() < 1e-9);
    }
}
