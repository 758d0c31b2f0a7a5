//! HTTP response types.

use serde::Serialize;

use jobrun_core::{ProgressSnapshot, Run};

// ============================================================================
// Progress types
// ============================================================================

/// Response for a successful progress poll.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    /// Latest snapshot reported by the matched run.
    pub status: ProgressSnapshot,

    /// Id of the run the snapshot belongs to.
    #[serde(rename = "jobId")]
    pub job_id: String,
}

// ============================================================================
// Run types
// ============================================================================

/// Envelope for run list queries.
#[derive(Debug, Serialize)]
pub struct RunListResponse {
    pub data: Vec<Run>,
}

/// Response for a cancel request.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub canceled: bool,
}

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
