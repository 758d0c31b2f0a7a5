//! Engine root: wires the registry, progress store and token issuer
//! together and owns run lifecycle bookkeeping.

use std::sync::Arc;

use tracing::debug;

use jobrun_core::{Run, RunFilter, RunId, RunStatus};

use crate::config::EngineConfig;
use crate::progress::ProgressStore;
use crate::registry::RunRegistry;
use crate::token::TokenIssuer;

struct EngineInner {
    config: EngineConfig,
    registry: RunRegistry,
    progress: ProgressStore,
    tokens: TokenIssuer,
}

/// Handle to an in-process job engine.
///
/// Cloning is cheap; every clone shares the same state.
#[derive(Clone)]
pub struct JobEngine {
    inner: Arc<EngineInner>,
}

impl JobEngine {
    /// Create an engine from `config`.
    pub fn new(config: EngineConfig) -> Self {
        let tokens = TokenIssuer::new(&config.token_secret);
        Self {
            inner: Arc::new(EngineInner {
                config,
                registry: RunRegistry::new(),
                progress: ProgressStore::new(),
                tokens,
            }),
        }
    }

    /// The run registry.
    pub fn registry(&self) -> &RunRegistry {
        &self.inner.registry
    }

    /// The progress store.
    pub fn progress(&self) -> &ProgressStore {
        &self.inner.progress
    }

    /// The issuer for public progress tokens.
    pub fn auth(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Run-level operations (list, get, cancel).
    pub fn runs(&self) -> Runs<'_> {
        Runs { engine: self }
    }

    /// Record a terminal status for a run and schedule it for pruning.
    pub(crate) async fn finish_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        error: Option<String>,
    ) {
        if let Some(error) = error {
            self.inner.registry.set_error(run_id, error).await;
        }
        self.inner.registry.update_status(run_id, status).await;
        self.schedule_prune(run_id);
    }

    /// Drop the run's registry entry and progress state once the retention
    /// window elapses.
    fn schedule_prune(&self, run_id: &RunId) {
        let engine = self.clone();
        let run_id = run_id.clone();
        let retention = self.inner.config.run_retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            engine.inner.progress.clear(&run_id).await;
            engine.inner.registry.remove(&run_id).await;
            debug!(run_id = %run_id, "Pruned run after retention window");
        });
    }
}

/// Run-level operations on a [`JobEngine`].
pub struct Runs<'a> {
    engine: &'a JobEngine,
}

impl Runs<'_> {
    /// List runs matching `filter`.
    pub async fn list(&self, filter: &RunFilter) -> Vec<Run> {
        self.engine.inner.registry.list(filter).await
    }

    /// Fetch a single run.
    pub async fn get(&self, run_id: &RunId) -> Option<Run> {
        self.engine.inner.registry.get(run_id).await
    }

    /// Cancel a run: mark it `FAILED` and schedule it for pruning. Returns
    /// whether a run was found; unknown ids are ignored.
    ///
    /// Cancellation is advisory. An executing task body is not
    /// interrupted, and when it finishes its own completion or failure
    /// path overwrites the canceled status.
    pub async fn cancel(&self, run_id: &RunId) -> bool {
        if self.engine.inner.registry.cancel(run_id).await {
            self.engine.schedule_prune(run_id);
            return true;
        }
        false
    }
}
