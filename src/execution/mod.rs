//! Execution Module - query lifecycle against a remote query service
//!
//! - QueryService trait for the remote service
//! - AthenaClient, the HTTP implementation
//! - QueryExecutor, the submit/poll/fetch state machine

pub mod athena;
pub mod executor;
pub mod request;
pub mod result;
pub mod service;
pub mod status;

pub use athena::AthenaClient;
pub use executor::QueryExecutor;
pub use request::QueryRequest;
pub use result::{ColumnInfo, RawRow, ResultSet};
pub use service::{ExecutionHandle, QueryService};
pub use status::{ExecutionState, ExecutionStatus};
