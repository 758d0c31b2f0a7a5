//! HTTP boundary for the embedded engine.
//!
//! Provides endpoints for:
//! - Public progress polling (`/api/jobs/progress`)
//! - Run queries and cancellation (`/v1/runs`)
//! - Health checks (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer for browser-based polling clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Public polling route
        .route("/api/jobs/progress", get(handlers::job_progress))
        // Run management routes
        .route("/v1/runs", get(handlers::list_runs))
        .route("/v1/runs/:id/cancel", post(handlers::cancel_run))
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(cors)
        .with_state(state)
}
