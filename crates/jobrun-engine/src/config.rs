//! Engine configuration.

use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Configuration for a [`JobEngine`](crate::JobEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long terminal runs and their progress stay queryable before
    /// being pruned.
    pub run_retention: Duration,

    /// HS256 secret used to sign and verify public progress tokens.
    pub token_secret: String,
}

impl EngineConfig {
    /// Builder method to set the retention window.
    pub fn with_run_retention(mut self, run_retention: Duration) -> Self {
        self.run_retention = run_retention;
        self
    }

    /// Builder method to set the token secret.
    pub fn with_token_secret(mut self, token_secret: impl Into<String>) -> Self {
        self.token_secret = token_secret.into();
        self
    }
}

impl Default for EngineConfig {
    /// One hour of retention and a process-local random secret. Tokens
    /// signed with a random secret do not survive restarts; deployments
    /// that hand tokens out should supply their own secret.
    fn default() -> Self {
        let token_secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect();
        Self {
            run_retention: Duration::from_secs(3600),
            token_secret,
        }
    }
}
