//! Task definition, triggering and the retry-aware executor.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use jobrun_core::{RunId, RunStatus, TaskError, TaskId};

use crate::context::RunContext;
use crate::engine::JobEngine;

/// Retry policy for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts a run gets, including the first. Values below 1
    /// behave as 1.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1 }
    }
}

/// Static configuration of a task definition.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Task identifier, e.g. `"generate-thumbnail"`.
    pub id: TaskId,

    /// Retry policy applied to every run of this task.
    pub retry: RetryPolicy,

    /// Queue name. Accepted for compatibility; the engine runs every task
    /// on the shared runtime.
    pub queue: Option<String>,

    /// Machine preset. Accepted for compatibility and otherwise ignored.
    pub machine: Option<String>,
}

impl TaskConfig {
    /// Create a config with the default single-attempt retry policy.
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            retry: RetryPolicy::default(),
            queue: None,
            machine: None,
        }
    }

    /// Builder method to set the maximum number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    /// Builder method to set the queue name.
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Builder method to set the machine preset.
    pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }
}

/// Options for a single trigger call.
#[derive(Debug, Clone, Default)]
pub struct TriggerOptions {
    /// Tags attached to the run and indexed for progress lookup.
    pub tags: Vec<String>,

    /// Earliest instant the run may start executing. Past or absent
    /// instants start the run immediately.
    pub delay_until: Option<DateTime<Utc>>,

    /// Idempotency key. Accepted for compatibility; the engine does not
    /// deduplicate runs.
    pub idempotency_key: Option<String>,

    /// Queue override. Accepted for compatibility and otherwise ignored.
    pub queue: Option<String>,

    /// Concurrency key. Accepted for compatibility and otherwise ignored.
    pub concurrency_key: Option<String>,
}

impl TriggerOptions {
    /// Builder method to attach tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to delay execution until `when`.
    pub fn with_delay_until(mut self, when: DateTime<Utc>) -> Self {
        self.delay_until = Some(when);
        self
    }
}

/// Handle returned by a fire-and-forget trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredRun {
    /// Id of the registered run.
    pub id: RunId,
}

type TaskBody<P, R> =
    Arc<dyn Fn(P) -> Pin<Box<dyn Future<Output = Result<R, TaskError>> + Send>> + Send + Sync>;

/// A defined task: a body plus the configuration to run it under.
///
/// Handles are cheap to clone and share the defining engine.
pub struct TaskHandle<P, R> {
    id: TaskId,
    retry: RetryPolicy,
    engine: JobEngine,
    body: TaskBody<P, R>,
}

impl<P, R> Clone for TaskHandle<P, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            retry: self.retry,
            engine: self.engine.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

impl JobEngine {
    /// Define a task on this engine.
    pub fn task<P, R, F, Fut>(&self, config: TaskConfig, body: F) -> TaskHandle<P, R>
    where
        P: Clone + Send + 'static,
        R: Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, TaskError>> + Send + 'static,
    {
        TaskHandle {
            id: config.id,
            retry: config.retry,
            engine: self.clone(),
            body: Arc::new(move |payload| Box::pin(body(payload))),
        }
    }
}

impl<P, R> TaskHandle<P, R>
where
    P: Clone + Send + 'static,
    R: Send + 'static,
{
    /// The task identifier.
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Trigger a run without waiting for it.
    ///
    /// The run is registered as `QUEUED` and its tags indexed for progress
    /// lookup before this returns, so the run is immediately visible to
    /// queries even though execution happens in the background.
    pub async fn trigger(&self, payload: P, options: TriggerOptions) -> TriggeredRun {
        let run_id = RunId::generate();
        self.engine
            .progress()
            .register_tags(&run_id, &options.tags)
            .await;
        self.engine
            .registry()
            .register(run_id.clone(), self.id.clone(), options.tags.clone())
            .await;
        info!(run_id = %run_id, task = %self.id, tags = ?options.tags, "Triggered run");

        let handle = self.clone();
        let spawned_id = run_id.clone();
        tokio::spawn(async move {
            wait_until(options.delay_until).await;
            let _ = handle.execute(spawned_id, payload).await;
        });

        TriggeredRun { id: run_id }
    }

    /// Trigger a run and await its result, including retries.
    ///
    /// Awaited runs are registered like background runs, but their tags
    /// are not indexed for progress lookup: the caller gets the result
    /// directly, so nothing needs to poll for it.
    pub async fn trigger_and_wait(
        &self,
        payload: P,
        options: TriggerOptions,
    ) -> Result<R, TaskError> {
        let run_id = RunId::generate();
        self.engine
            .registry()
            .register(run_id.clone(), self.id.clone(), options.tags.clone())
            .await;
        info!(run_id = %run_id, task = %self.id, "Triggered run (awaited)");
        wait_until(options.delay_until).await;
        self.execute(run_id, payload).await
    }

    /// Invoke the task body directly, bypassing registration, retries and
    /// progress indexing.
    pub async fn run(&self, payload: P) -> Result<R, TaskError> {
        (self.body)(payload).await
    }

    /// Drive one run through the attempt loop.
    async fn execute(&self, run_id: RunId, payload: P) -> Result<R, TaskError> {
        let max_attempts = self.retry.max_attempts.max(1);
        self.engine
            .registry()
            .update_status(&run_id, RunStatus::Executing)
            .await;
        let ctx = RunContext::new(run_id.clone(), self.engine.clone());

        let mut attempt = 1u32;
        loop {
            let outcome = ctx.clone().scope((self.body)(payload.clone())).await;
            match outcome {
                Ok(value) => {
                    info!(run_id = %run_id, task = %self.id, attempt, "Run completed");
                    self.engine
                        .finish_run(&run_id, RunStatus::Completed, None)
                        .await;
                    return Ok(value);
                }
                Err(err) if attempt >= max_attempts => {
                    error!(
                        run_id = %run_id,
                        task = %self.id,
                        attempt,
                        error = %err,
                        "Run failed, retries exhausted"
                    );
                    self.engine
                        .finish_run(&run_id, RunStatus::Failed, Some(err.to_string()))
                        .await;
                    return Err(err);
                }
                Err(err) => {
                    let delay = retry_delay(attempt);
                    error!(
                        run_id = %run_id,
                        task = %self.id,
                        attempt,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    debug!(
                        run_id = %run_id,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before next attempt"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Sleep until `when`, if it is in the future.
async fn wait_until(when: Option<DateTime<Utc>>) {
    if let Some(when) = when {
        if let Ok(delay) = when.signed_duration_since(Utc::now()).to_std() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Delay after the `attempt`-th failure: one second, doubled per attempt,
/// uncapped.
fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    Duration::from_millis(1000 * (1u64 << exponent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::metadata;
    use jobrun_core::{ProgressSnapshot, RunFilter};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_engine() -> JobEngine {
        JobEngine::new(EngineConfig::default().with_token_secret("test-secret"))
    }

    #[test]
    fn test_retry_delay_doubles() {
        assert_eq!(retry_delay(1), Duration::from_secs(1));
        assert_eq!(retry_delay(2), Duration::from_secs(2));
        assert_eq!(retry_delay(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_trigger_and_wait_returns_body_result() {
        let engine = test_engine();
        let ping = engine.task(TaskConfig::new("ping"), |name: String| async move {
            Ok(format!("pong: {name}"))
        });

        let result = ping
            .trigger_and_wait("alice".to_string(), TriggerOptions::default())
            .await
            .unwrap();
        assert_eq!(result, "pong: alice");
    }

    #[tokio::test]
    async fn test_completed_run_recorded_in_registry() {
        let engine = test_engine();
        let task = engine.task(TaskConfig::new("noop"), |_: ()| async { Ok(()) });
        task.trigger_and_wait((), TriggerOptions::default())
            .await
            .unwrap();

        let runs = engine.runs().list(&RunFilter::default()).await;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Completed);
        assert_eq!(runs[0].task_identifier, TaskId::new("noop"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggered_run_is_visible_as_queued() {
        let engine = test_engine();
        let task = engine.task(TaskConfig::new("slow"), |_: ()| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        let triggered = task.trigger((), TriggerOptions::default()).await;
        let run = engine.runs().get(&triggered.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Queued);

        tokio::task::yield_now().await;
        let run = engine.runs().get(&triggered.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Executing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_run_retries_until_max_attempts() {
        let engine = test_engine();
        let attempts = Arc::new(AtomicU32::new(0));
        let seen = attempts.clone();
        let task = engine.task(
            TaskConfig::new("flaky").with_max_attempts(3),
            move |_: ()| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TaskError::failed("boom"))
                }
            },
        );

        let err = task
            .trigger_and_wait((), TriggerOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let run = &engine.runs().list(&RunFilter::default()).await[0];
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_backoff_doubles_per_attempt() {
        let engine = test_engine();
        let task = engine.task(
            TaskConfig::new("always-fails").with_max_attempts(3),
            |_: ()| async { Err::<(), _>(TaskError::failed("nope")) },
        );

        let started = tokio::time::Instant::now();
        let _ = task.trigger_and_wait((), TriggerOptions::default()).await;
        // Two backoffs: 1s after the first failure, 2s after the second.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_single_attempt_by_default() {
        let engine = test_engine();
        let attempts = Arc::new(AtomicU32::new(0));
        let seen = attempts.clone();
        let task = engine.task(TaskConfig::new("once"), move |_: ()| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TaskError::failed("boom"))
            }
        });

        let _ = task.trigger_and_wait((), TriggerOptions::default()).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_metadata_set_flows_to_progress_store() {
        let engine = test_engine();
        let task = engine.task(TaskConfig::new("reporting"), |_: ()| async {
            metadata::set(ProgressSnapshot::new(50.0, "halfway")).await;
            Ok(())
        });

        task.trigger_and_wait((), TriggerOptions::default())
            .await
            .unwrap();

        let runs = engine.runs().list(&RunFilter::default()).await;
        let snapshot = engine.progress().get(&runs[0].id).await.unwrap();
        assert_eq!(snapshot.progress, 50.0);
        assert_eq!(snapshot.text, "halfway");
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_run_progress_visible_by_tag() {
        let engine = test_engine();
        let task = engine.task(TaskConfig::new("upload"), |_: ()| async {
            metadata::set(ProgressSnapshot::new(50.0, "halfway")).await;
            tokio::time::sleep(Duration::from_secs(300)).await;
            Ok(())
        });

        task.trigger((), TriggerOptions::default().with_tags(["doc-42"]))
            .await;
        tokio::task::yield_now().await;

        let (run_id, snapshot) = engine.progress().get_by_tag("doc-42").await.unwrap();
        assert_eq!(snapshot.progress, 50.0);
        assert_eq!(snapshot.text, "halfway");
        assert_eq!(
            engine.runs().get(&run_id).await.unwrap().status,
            RunStatus::Executing
        );
    }

    #[tokio::test]
    async fn test_awaited_run_tags_not_indexed_for_progress() {
        let engine = test_engine();
        let task = engine.task(TaskConfig::new("quiet"), |_: ()| async {
            metadata::set(ProgressSnapshot::new(10.0, "working")).await;
            Ok(())
        });

        task.trigger_and_wait((), TriggerOptions::default().with_tags(["doc-7"]))
            .await
            .unwrap();
        assert!(engine.progress().get_by_tag("doc-7").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_trigger_waits_before_executing() {
        let engine = test_engine();
        let task = engine.task(TaskConfig::new("later"), |_: ()| async { Ok(()) });

        let when = Utc::now() + chrono::Duration::seconds(30);
        let triggered = task
            .trigger((), TriggerOptions::default().with_delay_until(when))
            .await;

        tokio::task::yield_now().await;
        assert_eq!(
            engine.runs().get(&triggered.id).await.unwrap().status,
            RunStatus::Queued
        );

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(
            engine.runs().get(&triggered.id).await.unwrap().status,
            RunStatus::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_overwrites_earlier_cancel() {
        let engine = test_engine();
        let task = engine.task(TaskConfig::new("stubborn"), |_: ()| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        });

        let triggered = task.trigger((), TriggerOptions::default()).await;
        tokio::task::yield_now().await;

        engine.runs().cancel(&triggered.id).await;
        assert_eq!(
            engine.runs().get(&triggered.id).await.unwrap().status,
            RunStatus::Failed
        );

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(
            engine.runs().get(&triggered.id).await.unwrap().status,
            RunStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_run_bypasses_registration() {
        let engine = test_engine();
        let task = engine.task(TaskConfig::new("direct"), |n: i64| async move { Ok(n * 2) });

        assert_eq!(task.run(21).await.unwrap(), 42);
        assert!(engine.runs().list(&RunFilter::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_triggered_run_ids_are_unique() {
        let engine = test_engine();
        let task = engine.task(TaskConfig::new("noop"), |_: ()| async { Ok(()) });

        let first = task.trigger((), TriggerOptions::default()).await;
        let second = task.trigger((), TriggerOptions::default()).await;
        assert_ne!(first.id, second.id);
    }
}
