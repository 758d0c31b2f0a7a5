//! Server configuration.

use std::time::Duration;

use jobrun_engine::EngineConfig;
use tracing::warn;

/// Server configuration, read from `JOBRUN_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to (`JOBRUN_HTTP_ADDR`).
    pub http_bind_addr: String,

    /// Secret used to sign progress tokens (`JOBRUN_TOKEN_SECRET`).
    /// When unset the engine generates a process-local secret, so
    /// tokens do not survive a restart.
    pub token_secret: Option<String>,

    /// How many seconds finished runs stay queryable
    /// (`JOBRUN_RUN_RETENTION_SECS`).
    pub run_retention_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_bind_addr: "127.0.0.1:8472".to_string(),
            token_secret: None,
            run_retention_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let http_bind_addr =
            std::env::var("JOBRUN_HTTP_ADDR").unwrap_or(defaults.http_bind_addr);
        let token_secret = std::env::var("JOBRUN_TOKEN_SECRET").ok();
        let run_retention_secs = match std::env::var("JOBRUN_RUN_RETENTION_SECS") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, "Unparseable JOBRUN_RUN_RETENTION_SECS, using default");
                defaults.run_retention_secs
            }),
            Err(_) => defaults.run_retention_secs,
        };

        Self {
            http_bind_addr,
            token_secret,
            run_retention_secs,
        }
    }

    /// Engine configuration derived from this server configuration.
    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default()
            .with_run_retention(Duration::from_secs(self.run_retention_secs));
        match &self.token_secret {
            Some(secret) => config.with_token_secret(secret.clone()),
            None => config,
        }
    }
}
