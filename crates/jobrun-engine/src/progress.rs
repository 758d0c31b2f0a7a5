//! Progress store with tag lookup.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use jobrun_core::tags::fuzzy_matches;
use jobrun_core::{ProgressSnapshot, RunId};

/// Failed to interpret a progress payload.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Payload matched neither the bare snapshot shape nor the
    /// `{"status": {...}}` wrapper.
    #[error("invalid progress payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusPayload {
    Wrapped { status: ProgressSnapshot },
    Bare(ProgressSnapshot),
}

/// Parse a progress payload that is either a bare snapshot or a snapshot
/// wrapped in a `status` field.
pub fn parse_status(value: serde_json::Value) -> Result<ProgressSnapshot, ProgressError> {
    match serde_json::from_value(value)? {
        StatusPayload::Wrapped { status } => Ok(status),
        StatusPayload::Bare(snapshot) => Ok(snapshot),
    }
}

#[derive(Default)]
struct ProgressState {
    snapshots: HashMap<RunId, ProgressSnapshot>,
    tag_to_run: HashMap<String, RunId>,
    run_tags: HashMap<RunId, Vec<String>>,
}

/// Stores the latest progress snapshot per run, with tag-based lookup for
/// pollers that know a tag but not the run id.
#[derive(Default)]
pub struct ProgressStore {
    state: RwLock<ProgressState>,
}

impl ProgressStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `tags` so they resolve to `run_id`. A tag already claimed by
    /// an earlier run is re-pointed at the new one.
    pub async fn register_tags(&self, run_id: &RunId, tags: &[String]) {
        if tags.is_empty() {
            return;
        }
        let mut state = self.state.write().await;
        for tag in tags {
            state.tag_to_run.insert(tag.clone(), run_id.clone());
        }
        state
            .run_tags
            .entry(run_id.clone())
            .or_default()
            .extend(tags.iter().cloned());
        debug!(run_id = %run_id, tags = ?tags, "Registered progress tags");
    }

    /// Store the latest snapshot for a run, replacing any previous one.
    pub async fn update(&self, run_id: &RunId, snapshot: ProgressSnapshot) {
        debug!(run_id = %run_id, progress = snapshot.progress, "Progress updated");
        self.state
            .write()
            .await
            .snapshots
            .insert(run_id.clone(), snapshot);
    }

    /// Latest snapshot for a run, if any.
    pub async fn get(&self, run_id: &RunId) -> Option<ProgressSnapshot> {
        self.state.read().await.snapshots.get(run_id).cloned()
    }

    /// Resolve a tag to its run and latest snapshot using exact matching.
    pub async fn get_by_tag(&self, tag: &str) -> Option<(RunId, ProgressSnapshot)> {
        let state = self.state.read().await;
        let run_id = state.tag_to_run.get(tag)?;
        let snapshot = state.snapshots.get(run_id)?;
        Some((run_id.clone(), snapshot.clone()))
    }

    /// Resolve a tag like [`get_by_tag`](Self::get_by_tag), falling back to
    /// a fuzzy scan over every indexed tag set. Runs without a snapshot are
    /// skipped.
    ///
    /// When several runs carry fuzzily-colliding tags (`"doc-1"` and
    /// `"doc-10"`), which one wins is unspecified.
    pub async fn get_by_tag_fuzzy(&self, tag: &str) -> Option<(RunId, ProgressSnapshot)> {
        let state = self.state.read().await;
        if let Some(run_id) = state.tag_to_run.get(tag) {
            if let Some(snapshot) = state.snapshots.get(run_id) {
                return Some((run_id.clone(), snapshot.clone()));
            }
        }
        for (run_id, tags) in &state.run_tags {
            if tags.iter().any(|t| fuzzy_matches(t, tag)) {
                if let Some(snapshot) = state.snapshots.get(run_id) {
                    return Some((run_id.clone(), snapshot.clone()));
                }
            }
        }
        None
    }

    /// Drop a run's snapshot and every tag pointing at it. Unknown run ids
    /// are ignored.
    pub async fn clear(&self, run_id: &RunId) {
        let mut state = self.state.write().await;
        state.snapshots.remove(run_id);
        state.run_tags.remove(run_id);
        state.tag_to_run.retain(|_, id| id != run_id);
        debug!(run_id = %run_id, "Cleared progress state");
    }

    /// Number of runs with a stored snapshot.
    pub async fn snapshot_count(&self) -> usize {
        self.state.read().await.snapshots.len()
    }
}
