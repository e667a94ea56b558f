//! Query definition submitted to the service.

use serde::{Deserialize, Serialize};

/// Query text plus the context it runs in.
///
/// Built once and never mutated afterwards; the `with_*` setters consume
/// and return the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub catalog: Option<String>,
    pub database: Option<String>,
    /// Where the service writes result files (e.g. `s3://bucket/prefix/`)
    pub output_location: Option<String>,
    pub workgroup: Option<String>,
    /// Idempotency token forwarded to StartQueryExecution
    pub client_request_token: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            catalog: None,
            database: None,
            output_location: None,
            workgroup: None,
            client_request_token: None,
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_output_location(mut self, location: impl Into<String>) -> Self {
        self.output_location = Some(location.into());
        self
    }

    pub fn with_workgroup(mut self, workgroup: impl Into<String>) -> Self {
        self.workgroup = Some(workgroup.into());
        self
    }

    pub fn with_client_request_token(mut self, token: impl Into<String>) -> Self {
        self.client_request_token = Some(token.into());
        self
    }
}
