//! Producer-side request statistics
//!
//! Lock-free counters updated on every prediction served. Nothing about the
//! requester or the token is retained.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::types::FusionOutput;

/// Scores at or above this count as high risk in the stats
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;

/// Snapshot of the counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServeStats {
    pub total_analyzed: u64,
    pub high_risk_count: u64,
    pub fallback_count: u64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Default)]
pub struct StatsCollector {
    total_analyzed: AtomicU64,
    high_risk_count: AtomicU64,
    fallback_count: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one served prediction (cached or fresh)
    pub fn record(&self, output: &FusionOutput, latency_ms: u64) {
        self.total_analyzed.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);

        if output.is_fallback() {
            self.fallback_count.fetch_add(1, Ordering::Relaxed);
        } else if output.risk_score >= HIGH_RISK_THRESHOLD {
            self.high_risk_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ServeStats {
        let total_analyzed = self.total_analyzed.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency_ms = if total_analyzed > 0 {
            total_latency as f64 / total_analyzed as f64
        } else {
            0.0
        };

        ServeStats {
            total_analyzed,
            high_risk_count: self.high_risk_count.load(Ordering::Relaxed),
            fallback_count: self.fallback_count.load(Ordering::Relaxed),
            avg_latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::Evidence;

    fn output(risk: f64) -> FusionOutput {
        FusionOutput {
            risk_score: risk,
            confidence: 0.6,
            evidence: Evidence::new(),
            time_to_event: None,
            elapsed_seconds: 0.1,
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let stats = StatsCollector::new().snapshot();
        assert_eq!(stats, ServeStats::default());
    }

    #[test]
    fn test_counts_and_average() {
        let stats = StatsCollector::new();
        stats.record(&output(0.9), 100);
        stats.record(&output(0.7), 50);
        stats.record(&output(0.2), 30);
        stats.record(&FusionOutput::fallback("boom", 0.0), 20);

        let snap = stats.snapshot();
        assert_eq!(snap.total_analyzed, 4);
        assert_eq!(snap.high_risk_count, 2);
        assert_eq!(snap.fallback_count, 1);
        assert!((snap.avg_latency_ms - 50.0).abs() < 1e-9);
    }
}
