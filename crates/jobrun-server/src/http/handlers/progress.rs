//! Public progress polling handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::http::responses::{ErrorResponse, ProgressResponse};
use crate::state::AppState;

/// Query parameters for the progress endpoint.
#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    /// Tag to resolve to a run.
    pub tag: String,

    /// Opt into fuzzy tag resolution.
    #[serde(default)]
    pub fuzzy: bool,
}

/// Poll the latest progress snapshot for a tagged run.
///
/// Requires a bearer token whose read scope covers the queried tag.
/// Unverifiable and expired tokens are rejected before the store is
/// consulted.
pub async fn job_progress(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ProgressQuery>,
) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return error_response(StatusCode::UNAUTHORIZED, "Missing bearer token");
    };

    let Some(verified) = state.engine.auth().verify(token) else {
        debug!("Progress poll with unverifiable token");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid token");
    };

    if verified.expired {
        debug!("Progress poll with expired token");
        return error_response(StatusCode::UNAUTHORIZED, "Token expired");
    }

    if !verified.tags.iter().any(|t| t == &query.tag) {
        debug!(tag = %query.tag, "Progress poll outside token scope");
        return error_response(StatusCode::FORBIDDEN, "Tag not covered by token");
    }

    let lookup = if query.fuzzy {
        state.engine.progress().get_by_tag_fuzzy(&query.tag).await
    } else {
        state.engine.progress().get_by_tag(&query.tag).await
    };

    match lookup {
        Some((run_id, snapshot)) => Json(ProgressResponse {
            status: snapshot,
            job_id: run_id.into_inner(),
        })
        .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No progress for tag"),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
