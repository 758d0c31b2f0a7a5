//! In-memory run registry.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use jobrun_core::tags::fuzzy_matches;
use jobrun_core::{Run, RunFilter, RunId, RunStatus, TagMatch, TaskId};

use crate::duration::parse_duration;

/// In-memory registry of every run the engine has triggered.
///
/// Entries stay queryable after reaching a terminal state until the engine
/// prunes them at the end of the retention window.
#[derive(Default)]
pub struct RunRegistry {
    runs: RwLock<HashMap<RunId, Run>>,
}

impl RunRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new queued run.
    pub async fn register(&self, id: RunId, task_identifier: TaskId, tags: Vec<String>) {
        debug!(run_id = %id, task = %task_identifier, "Registering run");
        let run = Run::new(id.clone(), task_identifier, tags);
        self.runs.write().await.insert(id, run);
    }

    /// Overwrite the status of a run. Unknown run ids are ignored.
    pub async fn update_status(&self, id: &RunId, status: RunStatus) {
        let mut runs = self.runs.write().await;
        match runs.get_mut(id) {
            Some(run) => {
                run.status = status;
                info!(run_id = %id, status = ?status, "Run status updated");
            }
            None => warn!(run_id = %id, "Status update for unknown run"),
        }
    }

    /// Record an error message on a run. Unknown run ids are ignored.
    pub async fn set_error(&self, id: &RunId, error: impl Into<String>) {
        if let Some(run) = self.runs.write().await.get_mut(id) {
            run.error_message = Some(error.into());
        }
    }

    /// Cancel a run, marking it `FAILED`. Returns false for unknown ids.
    pub async fn cancel(&self, id: &RunId) -> bool {
        let mut runs = self.runs.write().await;
        match runs.get_mut(id) {
            Some(run) => {
                run.cancel();
                info!(run_id = %id, "Run canceled");
                true
            }
            None => {
                debug!(run_id = %id, "Cancel requested for unknown run");
                false
            }
        }
    }

    /// Fetch a single run by id.
    pub async fn get(&self, id: &RunId) -> Option<Run> {
        self.runs.read().await.get(id).cloned()
    }

    /// Remove a run from the registry. Unknown run ids are ignored.
    pub async fn remove(&self, id: &RunId) {
        self.runs.write().await.remove(id);
    }

    /// List runs matching `filter`, oldest first.
    pub async fn list(&self, filter: &RunFilter) -> Vec<Run> {
        let runs = self.runs.read().await;
        let mut matched: Vec<Run> = runs
            .values()
            .filter(|run| Self::matches(run, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        matched
    }

    fn matches(run: &Run, filter: &RunFilter) -> bool {
        if let Some(task) = &filter.task_identifier {
            if &run.task_identifier != task {
                return false;
            }
        }
        if let Some(tag) = &filter.tag {
            let hit = match filter.tag_match {
                TagMatch::Exact => run.tags.iter().any(|t| t == tag),
                TagMatch::Fuzzy => run.tags.iter().any(|t| fuzzy_matches(t, tag)),
            };
            if !hit {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if run.status != status {
                return false;
            }
        }
        if let Some(period) = &filter.period {
            match parse_duration(period).and_then(|d| chrono::Duration::from_std(d).ok()) {
                Some(window) => {
                    if run.created_at < Utc::now() - window {
                        return false;
                    }
                }
                None => debug!(period = %period, "Ignoring unparseable period filter"),
            }
        }
        true
    }
}
