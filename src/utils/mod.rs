//! Utils Module - Helper Functions & Shared Utilities

pub mod cache;
pub mod constants;
pub mod numeric;
pub mod similarity;
pub mod telemetry;

pub use cache::*;
pub use constants::*;
pub use numeric::*;
pub use similarity::*;
pub use telemetry::*;
