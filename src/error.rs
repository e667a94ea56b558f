use std::time::Duration;

use thiserror::Error;

use crate::execution::status::ExecutionState;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Submission error: {0}")]
    Submission(#[source] Box<QueryError>),

    #[error("Query execution {state}: {}", .reason.as_deref().unwrap_or("no reason reported"))]
    ExecutionFailed {
        state: ExecutionState,
        reason: Option<String>,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Invalid cache policy: {0}")]
    InvalidCachePolicy(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("Timed out after {0:?} waiting for a terminal state")]
    Timeout(Duration),

    #[error("Wait for terminal state aborted")]
    Aborted,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    /// True when the remote query itself ended unsuccessfully.
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, QueryError::ExecutionFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
