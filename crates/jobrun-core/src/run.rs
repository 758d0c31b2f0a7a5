//! Run records and query filters.

use crate::{RunId, RunStatus, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Run is one triggered execution of a task, tracked from the moment
/// it is registered until it is pruned after reaching a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Unique run identifier.
    pub id: RunId,

    /// Identifier of the task this run executes.
    pub task_identifier: TaskId,

    /// Current run status.
    pub status: RunStatus,

    /// Tags attached when the run was triggered.
    pub tags: Vec<String>,

    /// When the run was registered.
    pub created_at: DateTime<Utc>,

    /// Error message if the run failed.
    pub error_message: Option<String>,
}

impl Run {
    /// Create a new queued Run.
    pub fn new(id: RunId, task_identifier: TaskId, tags: Vec<String>) -> Self {
        Self {
            id,
            task_identifier,
            status: RunStatus::Queued,
            tags,
            created_at: Utc::now(),
            error_message: None,
        }
    }

    /// Mark the run as executing.
    pub fn start(&mut self) {
        self.status = RunStatus::Executing;
    }

    /// Mark the run as completed.
    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
    }

    /// Mark the run as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error_message = Some(error.into());
    }

    /// Mark the run as canceled. Cancellation is recorded as `FAILED`.
    pub fn cancel(&mut self) {
        self.status = RunStatus::Failed;
    }

    /// Check if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Tag comparison mode for run queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagMatch {
    /// The queried tag must equal a run tag exactly.
    #[default]
    Exact,
    /// The queried tag matches when either side contains the other.
    Fuzzy,
}

/// Filter for querying runs. Every populated field must match (logical AND).
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// Match runs of this task.
    pub task_identifier: Option<TaskId>,

    /// Match runs carrying this tag.
    pub tag: Option<String>,

    /// How `tag` is compared against run tags.
    pub tag_match: TagMatch,

    /// Match runs with this status.
    pub status: Option<RunStatus>,

    /// Match runs created within this window, e.g. `"30s"`, `"15m"` or `"2h"`.
    pub period: Option<String>,
}

impl RunFilter {
    /// Builder method to filter by task identifier.
    pub fn with_task(mut self, task: impl Into<TaskId>) -> Self {
        self.task_identifier = Some(task.into());
        self
    }

    /// Builder method to filter by tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Builder method to set the tag comparison mode.
    pub fn with_tag_match(mut self, tag_match: TagMatch) -> Self {
        self.tag_match = tag_match;
        self
    }

    /// Builder method to filter by status.
    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Builder method to filter by creation window.
    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }
}
