//! Status enum for Runs.

use serde::{Deserialize, Serialize};

/// Status of a Run in the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run registered but not yet picked up for execution.
    #[default]
    Queued,
    /// Run is actively executing a task attempt.
    Executing,
    /// Run completed successfully.
    Completed,
    /// Run failed after exhausting its retry policy, or was canceled.
    Failed,
    /// Run terminated abnormally.
    Crashed,
    /// Run was canceled before it was picked up.
    Canceled,
    /// Run failed due to an engine-level fault rather than the task body.
    SystemFailure,
}

impl RunStatus {
    /// Returns true if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Crashed | Self::Canceled | Self::SystemFailure
        )
    }

    /// Returns true if the run is still active (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}
