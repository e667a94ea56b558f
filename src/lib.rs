//! Run SQL on a managed query service (Athena), wait for it to finish and
//! decode the result rows. Completed executions can be reused within a
//! time bucket through a shared [`ResultCache`].

pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod execution;

pub use cache::{CacheKey, CachePolicy, ResultCache};
pub use config::{AthenaConfig, AthenaOverrides, ExecutorOptions};
pub use decode::{decode_rows, ResultRow};
pub use error::{QueryError, Result};
pub use execution::{
    AthenaClient, ColumnInfo, ExecutionHandle, ExecutionState, ExecutionStatus, QueryExecutor,
    QueryRequest, QueryService, ResultSet,
};
