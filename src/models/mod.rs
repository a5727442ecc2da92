//! Models Module - Data Structures & Configuration
//!
//! Shared result types, the application error type and runtime config.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
