//! Ambient run context for executing task bodies.
//!
//! The context is a tokio task-local scoped to a single attempt, so
//! overlapping runs on the same runtime cannot misattribute each other's
//! progress reports.

use std::future::Future;

use jobrun_core::RunId;

use crate::engine::JobEngine;

tokio::task_local! {
    static CURRENT_RUN: RunContext;
}

/// The run a task body is executing under.
#[derive(Clone)]
pub(crate) struct RunContext {
    pub(crate) run_id: RunId,
    pub(crate) engine: JobEngine,
}

impl RunContext {
    pub(crate) fn new(run_id: RunId, engine: JobEngine) -> Self {
        Self { run_id, engine }
    }

    /// Context of the current task attempt, if inside one.
    pub(crate) fn current() -> Option<RunContext> {
        CURRENT_RUN.try_with(|ctx| ctx.clone()).ok()
    }

    /// Run `future` with this context installed.
    pub(crate) async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_RUN.scope(self, future).await
    }
}
