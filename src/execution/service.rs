//! Query Service Trait - contract for the remote query execution service
//!
//! Executors talk to the service only through this trait, so the HTTP
//! client can be swapped for an in-memory double in tests.

use crate::error::Result;
use crate::execution::request::QueryRequest;
use crate::execution::result::ResultSet;
use crate::execution::status::ExecutionStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque execution identifier handed out by the service on submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote query execution service
///
/// Every method is a single round trip. Implementations must not retry.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Begin executing `request`, returning its handle
    async fn start_execution(&self, request: &QueryRequest) -> Result<ExecutionHandle>;

    /// Current status of an execution
    async fn get_execution_status(&self, handle: &ExecutionHandle) -> Result<ExecutionStatus>;

    /// Full result set of a SUCCEEDED execution
    async fn get_results(&self, handle: &ExecutionHandle) -> Result<ResultSet>;
}
