//! Error types for the job scheduler.

use std::fmt;
use thiserror::Error;

/// Result type for scheduler operations.
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors that can occur in the job scheduler.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Invalid cron expression.
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    /// Job not found.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The scheduler was started twice.
    #[error("scheduler already running")]
    AlreadyRunning,
}

impl TaskError {
    /// Creates an invalid-cron error.
    pub fn invalid_cron(reason: impl Into<String>) -> Self {
        Self::InvalidCron(reason.into())
    }

    /// Creates a not-found error.
    pub fn not_found(id: impl fmt::Display) -> Self {
        Self::NotFound(id.to_string())
    }
}
