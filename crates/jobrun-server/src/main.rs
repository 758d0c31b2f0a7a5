//! JobRun Server
//!
//! Serves the HTTP boundary for an embedded job engine.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use jobrun_engine::JobEngine;

mod config;
mod http;
mod metrics;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let engine = JobEngine::new(config.engine_config());
    let state = AppState::new(engine);

    let router = http::create_router(state);
    let listener = TcpListener::bind(&config.http_bind_addr).await?;
    info!(addr = %config.http_bind_addr, "JobRun server listening");

    axum::serve(listener, router).await?;

    Ok(())
}
