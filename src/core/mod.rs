//! Core Module - Business Logic
//!
//! Layers, the fusion engine, ground-truth verification and the
//! validator round that ties them to the pending store.

pub mod fusion;
pub mod layers;
pub mod validator;
pub mod verification;

pub use fusion::{FusionEngine, LayerResults, Weights};
pub use layers::{safe_analyze, Layer, LayerKind};
pub use validator::Validator;
pub use verification::{calculate_accuracy, OutcomeVerifier};
