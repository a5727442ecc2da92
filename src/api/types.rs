//! API Request/Response Types
//!
//! `PredictRequest` / `PredictResponse` are the producer transport contract;
//! the verifier's producer client speaks the same types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::errors::AppError;
use crate::models::types::FusionOutput;
use crate::utils::cache::CacheStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            code: "API_UNAUTHORIZED".to_string(),
            message: "Invalid or missing API key".to_string(),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
        }
    }
}

// ============================================
// Prediction (transport contract)
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub token_address: String,
    /// Unix seconds; 0 = unknown
    #[serde(default)]
    pub launch_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub risk_score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Value,
    #[serde(default)]
    pub time_to_event: Option<f64>,
}

impl PredictResponse {
    /// A prediction is recordable only with in-range numbers
    pub fn is_well_formed(&self) -> bool {
        (0.0..=1.0).contains(&self.risk_score) && (0.0..=1.0).contains(&self.confidence)
    }
}

impl From<FusionOutput> for PredictResponse {
    fn from(output: FusionOutput) -> Self {
        Self {
            risk_score: output.risk_score,
            confidence: output.confidence,
            evidence: Value::Object(output.evidence),
            time_to_event: output.time_to_event,
        }
    }
}

// ============================================
// Stats
// ============================================

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub total_analyzed: u64,
    /// Predictions with risk_score >= 0.7
    pub high_risk_count: u64,
    pub fallback_count: u64,
    pub avg_latency_ms: f64,
    pub cache: CacheStats,
    pub uptime_seconds: u64,
    pub api_version: String,
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
