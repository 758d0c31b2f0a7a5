//! Progress snapshots reported by running tasks.

use serde::{Deserialize, Serialize};

/// A point-in-time progress report for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Numeric completion value as reported by the task. Stored verbatim,
    /// never clamped.
    pub progress: f64,

    /// Human-readable progress label.
    pub text: String,
}

impl ProgressSnapshot {
    /// Create a new snapshot.
    pub fn new(progress: f64, text: impl Into<String>) -> Self {
        Self {
            progress,
            text: text.into(),
        }
    }
}
