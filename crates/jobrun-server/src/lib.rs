//! JobRun Server Library
//!
//! HTTP boundary for an embedded [`jobrun_engine::JobEngine`]: public
//! progress polling guarded by scoped tokens, run queries and
//! cancellation, plus health and metrics endpoints.

pub mod config;
pub mod http;
pub mod metrics;
pub mod state;

pub use config::Config;
pub use http::create_router;
pub use state::AppState;
