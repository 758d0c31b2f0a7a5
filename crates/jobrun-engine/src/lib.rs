//! JobRun Engine
//!
//! In-process job engine: define tasks, trigger runs with retries and
//! delayed execution, report progress from inside task bodies, and issue
//! scoped tokens so less-trusted clients can poll that progress.
//!
//! # Example
//!
//! ```no_run
//! use jobrun_core::TaskError;
//! use jobrun_engine::{EngineConfig, JobEngine, TaskConfig, TriggerOptions};
//!
//! # async fn example() -> Result<(), TaskError> {
//! let engine = JobEngine::new(EngineConfig::default());
//! let ping = engine.task(TaskConfig::new("ping"), |name: String| async move {
//!     Ok(format!("pong: {name}"))
//! });
//!
//! let reply = ping
//!     .trigger_and_wait("alice".to_string(), TriggerOptions::default())
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod fetch;
pub mod metadata;
pub mod progress;
pub mod registry;
pub mod scheduler;
pub mod token;

mod context;
mod duration;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{JobEngine, Runs};
pub use fetch::{BackoffOptions, FetchError, FetchRetry, RetryClient, StatusRange};
pub use progress::{parse_status, ProgressError, ProgressStore};
pub use registry::RunRegistry;
pub use scheduler::{RetryPolicy, TaskConfig, TaskHandle, TriggerOptions, TriggeredRun};
pub use token::{ReadScope, TokenError, TokenIssuer, TokenScopes, VerifiedToken};
