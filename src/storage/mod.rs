//! Storage Module - persisted state of the verifying actor

pub mod pending;

pub use pending::{PendingStore, ProducerPredictions};
