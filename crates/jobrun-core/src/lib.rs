//! JobRun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Runtime specifics
//!
//! All types here represent the core business domain of JobRun.

pub mod error;
pub mod ids;
pub mod progress;
pub mod run;
pub mod status;
pub mod tags;

// Re-export commonly used types
pub use error::TaskError;
pub use ids::{RunId, TaskId};
pub use progress::ProgressSnapshot;
pub use run::{Run, RunFilter, TagMatch};
pub use status::RunStatus;
