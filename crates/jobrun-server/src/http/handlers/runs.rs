//! Run query and cancellation handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use jobrun_core::{RunFilter, RunId, RunStatus, TagMatch};

use crate::http::responses::{CancelResponse, ErrorResponse, RunListResponse};
use crate::state::AppState;

/// Query parameters for the run list endpoint.
#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub task_identifier: Option<String>,
    pub tag: Option<String>,
    /// Opt into fuzzy tag matching.
    #[serde(default)]
    pub fuzzy: bool,
    pub status: Option<RunStatus>,
    /// Relative window such as `30s`, `15m` or `2h`.
    pub period: Option<String>,
}

impl RunsQuery {
    fn into_filter(self) -> RunFilter {
        RunFilter {
            task_identifier: self.task_identifier.map(Into::into),
            tag: self.tag,
            tag_match: if self.fuzzy {
                TagMatch::Fuzzy
            } else {
                TagMatch::Exact
            },
            status: self.status,
            period: self.period,
        }
    }
}

/// List tracked runs matching the supplied filters.
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RunsQuery>,
) -> impl IntoResponse {
    let data = state.engine.runs().list(&query.into_filter()).await;
    Json(RunListResponse { data })
}

/// Request cancellation of a run.
pub async fn cancel_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let run_id = RunId::new(id);

    if state.engine.runs().cancel(&run_id).await {
        info!(run_id = %run_id, "Cancel requested over HTTP");
        Json(CancelResponse { canceled: true }).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Run not found: {run_id}"),
            }),
        )
            .into_response()
    }
}
