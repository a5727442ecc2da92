//! RugIntel Library
//!
//! Multi-source rugpull risk intelligence for newly launched tokens:
//! - Seven independent analysis layers (social, liquidity, wallet, market,
//!   contract, visual, temporal) fused into one risk score
//! - A producer HTTP API serving predictions
//! - A verifier that checks predictions against ground truth after the
//!   maturation window and scores each producer

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod storage;
pub mod utils;

pub use crate::core::{FusionEngine, OutcomeVerifier, Validator, Weights};
pub use models::config::RugIntelConfig;
pub use models::errors::{AppError, AppResult, ErrorCode};
pub use models::types::{AnalysisContext, FusionOutput, LayerResult, OutcomeRecord, RiskLevel};
pub use storage::PendingStore;
pub use utils::cache::{CacheStats, PredictionCache};
