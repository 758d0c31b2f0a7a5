//! Progress reporting from inside task bodies.
//!
//! A task body reports progress without holding a handle to the engine;
//! the ambient run context routes the snapshot to the right run:
//!
//! ```no_run
//! use jobrun_core::ProgressSnapshot;
//! use jobrun_engine::metadata;
//!
//! # async fn example() {
//! metadata::set(ProgressSnapshot::new(50.0, "halfway")).await;
//! # }
//! ```

use tracing::trace;

use jobrun_core::{ProgressSnapshot, RunId};

use crate::context::RunContext;

/// Record a progress snapshot for the task attempt this future is running
/// under. Outside a task attempt this is a no-op.
pub async fn set(snapshot: ProgressSnapshot) {
    match RunContext::current() {
        Some(ctx) => ctx.engine.progress().update(&ctx.run_id, snapshot).await,
        None => trace!("Progress reported outside a task attempt, ignoring"),
    }
}

/// The id of the run this future is executing under, if any.
pub fn current_run_id() -> Option<RunId> {
    RunContext::current().map(|ctx| ctx.run_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_outside_task_attempt_is_noop() {
        // Must not panic or touch any store.
        set(ProgressSnapshot::new(10.0, "orphan")).await;
        assert!(current_run_id().is_none());
    }
}
