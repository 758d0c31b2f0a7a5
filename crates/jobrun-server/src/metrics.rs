//! Prometheus metrics collection and formatting.
//!
//! Renders engine state in the Prometheus text exposition format.

use std::fmt::Write;
use std::sync::Arc;

use jobrun_core::{RunFilter, RunStatus};

use crate::state::AppState;

/// Collect all metrics from the engine and format them as Prometheus text.
pub async fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    collect_run_metrics(state, &mut output).await;
    collect_progress_metrics(state, &mut output).await;

    output
}

/// Tracked run counts by status.
async fn collect_run_metrics(state: &Arc<AppState>, output: &mut String) {
    let runs = state.engine.runs().list(&RunFilter::default()).await;

    let mut queued = 0u64;
    let mut executing = 0u64;
    let mut completed = 0u64;
    let mut failed = 0u64;
    let mut crashed = 0u64;
    let mut canceled = 0u64;
    let mut system_failure = 0u64;

    for run in &runs {
        match run.status {
            RunStatus::Queued => queued += 1,
            RunStatus::Executing => executing += 1,
            RunStatus::Completed => completed += 1,
            RunStatus::Failed => failed += 1,
            RunStatus::Crashed => crashed += 1,
            RunStatus::Canceled => canceled += 1,
            RunStatus::SystemFailure => system_failure += 1,
        }
    }

    writeln!(
        output,
        "# HELP jobrun_runs_total Number of tracked runs by status"
    )
    .ok();
    writeln!(output, "# TYPE jobrun_runs_total gauge").ok();
    writeln!(output, "jobrun_runs_total{{status=\"queued\"}} {queued}").ok();
    writeln!(
        output,
        "jobrun_runs_total{{status=\"executing\"}} {executing}"
    )
    .ok();
    writeln!(
        output,
        "jobrun_runs_total{{status=\"completed\"}} {completed}"
    )
    .ok();
    writeln!(output, "jobrun_runs_total{{status=\"failed\"}} {failed}").ok();
    writeln!(output, "jobrun_runs_total{{status=\"crashed\"}} {crashed}").ok();
    writeln!(output, "jobrun_runs_total{{status=\"canceled\"}} {canceled}").ok();
    writeln!(
        output,
        "jobrun_runs_total{{status=\"system_failure\"}} {system_failure}"
    )
    .ok();
}

/// Progress store size.
async fn collect_progress_metrics(state: &Arc<AppState>, output: &mut String) {
    let snapshots = state.engine.progress().snapshot_count().await;

    writeln!(output).ok();
    writeln!(
        output,
        "# HELP jobrun_progress_snapshots Number of runs holding a progress snapshot"
    )
    .ok();
    writeln!(output, "# TYPE jobrun_progress_snapshots gauge").ok();
    writeln!(output, "jobrun_progress_snapshots {snapshots}").ok();
}
