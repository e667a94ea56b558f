//! Athena HTTP client
//!
//! Speaks the Athena JSON 1.1 protocol: every operation is a POST to the
//! endpoint root with the operation named in `X-Amz-Target`.
//! Requests are not SigV4-signed; point the endpoint at a signing gateway
//! or an emulator and, if needed, pass a bearer token.

use crate::config::AthenaConfig;
use crate::error::{QueryError, Result};
use crate::execution::request::QueryRequest;
use crate::execution::result::{ColumnInfo, RawRow, ResultSet};
use crate::execution::service::{ExecutionHandle, QueryService};
use crate::execution::status::{ExecutionState, ExecutionStatus};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AmazonAthena";
/// Largest page GetQueryResults hands out
const MAX_RESULTS_PER_PAGE: u32 = 1000;

// Wire shapes. Only the fields this client reads are modelled.

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionInput<'a> {
    query_string: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_execution_context: Option<QueryExecutionContext<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_configuration: Option<ResultConfiguration<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    work_group: Option<&'a str>,
    client_request_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionContext<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResultConfiguration<'a> {
    output_location: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionOutput {
    query_execution_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionIdInput<'a> {
    query_execution_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionOutput {
    query_execution: QueryExecution,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecution {
    status: Option<QueryExecutionStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecutionStatus {
    state: Option<String>,
    state_change_reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsInput<'a> {
    query_execution_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsOutput {
    result_set: Option<AthenaResultSet>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AthenaResultSet {
    #[serde(default)]
    rows: Vec<AthenaRow>,
    result_set_metadata: Option<ResultSetMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AthenaRow {
    #[serde(default)]
    data: Vec<Datum>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Datum {
    var_char_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultSetMetadata {
    #[serde(default)]
    column_info: Vec<AthenaColumnInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AthenaColumnInfo {
    name: String,
    #[serde(rename = "Type")]
    column_type: String,
}

#[derive(Debug, Deserialize)]
struct AthenaErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "message", rename = "Message")]
    message: Option<String>,
}

impl From<QueryExecutionStatus> for ExecutionStatus {
    fn from(status: QueryExecutionStatus) -> Self {
        ExecutionStatus {
            state: ExecutionState::parse(status.state.as_deref().unwrap_or("")),
            reason: status.state_change_reason,
        }
    }
}

impl AthenaRow {
    fn into_raw(self) -> RawRow {
        self.data.into_iter().map(|d| d.var_char_value).collect()
    }
}

/// `__type` may carry a namespace prefix (`ns#Code`); keep the code only
fn parse_error_body(status: reqwest::StatusCode, body: &str) -> QueryError {
    match serde_json::from_str::<AthenaErrorBody>(body) {
        Ok(parsed) => QueryError::Service {
            code: parsed
                .error_type
                .map(|t| t.rsplit('#').next().unwrap_or_default().to_string())
                .unwrap_or_else(|| status.as_u16().to_string()),
            message: parsed.message.unwrap_or_else(|| body.to_string()),
        },
        Err(_) => QueryError::Service {
            code: status.as_u16().to_string(),
            message: body.to_string(),
        },
    }
}

/// Query service backed by the Athena HTTP API
pub struct AthenaClient {
    config: AthenaConfig,
    client: Client,
}

impl AthenaClient {
    pub fn new(config: AthenaConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            config: AthenaConfig {
                endpoint: config.endpoint.trim_end_matches('/').to_string(),
                ..config
            },
            client,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(AthenaConfig::from_env()?)
    }

    pub fn config(&self) -> &AthenaConfig {
        &self.config
    }

    async fn call<I, O>(&self, operation: &str, input: &I) -> Result<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let url = format!("{}/", self.config.endpoint);
        debug!("Calling {}.{}", TARGET_PREFIX, operation);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .body(serde_json::to_vec(input)?);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = parse_error_body(status, &body);
            warn!("{} failed with status {}: {}", operation, status, err);
            return Err(err);
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn start_input<'a>(&'a self, request: &'a QueryRequest) -> StartQueryExecutionInput<'a> {
        let context = if request.catalog.is_some() || request.database.is_some() {
            Some(QueryExecutionContext {
                catalog: request.catalog.as_deref(),
                database: request.database.as_deref(),
            })
        } else {
            None
        };
        let output_location = request
            .output_location
            .as_deref()
            .or(self.config.output_location.as_deref());

        StartQueryExecutionInput {
            query_string: &request.query,
            query_execution_context: context,
            result_configuration: output_location
                .map(|output_location| ResultConfiguration { output_location }),
            work_group: request
                .workgroup
                .as_deref()
                .or(self.config.workgroup.as_deref()),
            client_request_token: request
                .client_request_token
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }
}

#[async_trait]
impl QueryService for AthenaClient {
    async fn start_execution(&self, request: &QueryRequest) -> Result<ExecutionHandle> {
        let input = self.start_input(request);
        let output: StartQueryExecutionOutput = self.call("StartQueryExecution", &input).await?;
        Ok(ExecutionHandle::new(output.query_execution_id))
    }

    async fn get_execution_status(&self, handle: &ExecutionHandle) -> Result<ExecutionStatus> {
        let input = QueryExecutionIdInput {
            query_execution_id: handle.as_str(),
        };
        let output: GetQueryExecutionOutput = self.call("GetQueryExecution", &input).await?;
        let status = output.query_execution.status.ok_or_else(|| QueryError::Service {
            code: "MissingStatus".to_string(),
            message: format!("no status reported for execution {}", handle),
        })?;
        Ok(status.into())
    }

    /// Follows `NextToken` until the last page; only the first page
    /// carries the header row.
    async fn get_results(&self, handle: &ExecutionHandle) -> Result<ResultSet> {
        let mut rows = Vec::new();
        let mut columns = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let input = GetQueryResultsInput {
                query_execution_id: handle.as_str(),
                next_token: next_token.as_deref(),
                max_results: MAX_RESULTS_PER_PAGE,
            };
            let page: GetQueryResultsOutput = self.call("GetQueryResults", &input).await?;

            if let Some(result_set) = page.result_set {
                if columns.is_empty() {
                    if let Some(metadata) = result_set.result_set_metadata {
                        columns = metadata
                            .column_info
                            .into_iter()
                            .map(|c| ColumnInfo {
                                name: c.name,
                                column_type: c.column_type,
                            })
                            .collect();
                    }
                }
                rows.extend(result_set.rows.into_iter().map(AthenaRow::into_raw));
            }

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(ResultSet::new(rows).with_columns(columns))
    }
}
