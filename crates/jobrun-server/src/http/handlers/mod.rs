//! HTTP request handlers.

mod health;
mod progress;
mod runs;

pub use health::{health_check, metrics_handler};
pub use progress::job_progress;
pub use runs::{cancel_run, list_runs};
