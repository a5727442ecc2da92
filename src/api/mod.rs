//! Producer API Module
//! HTTP transport answering prediction requests from verifiers

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use handlers::{start_cleanup_task, AppState};
pub use routes::create_router;
pub use types::*;
