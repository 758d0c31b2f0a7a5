//! Task execution errors.

use thiserror::Error;

/// Error returned by a task body.
///
/// The engine treats every variant the same way: the attempt failed and
/// may be retried according to the task's retry policy.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task failed with a message.
    #[error("{0}")]
    Failed(String),

    /// Task failed with an underlying error.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Create a `Failed` error from a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wrap an arbitrary error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::Failed(message.to_owned())
    }
}
