//! AthenaClient against a minimal HTTP stub built on tokio sockets.

use athena_runner::{
    AthenaClient, AthenaConfig, ExecutorOptions, QueryError, QueryExecutor, QueryRequest,
    QueryService,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
struct Recorded {
    target: String,
    authorization: Option<String>,
    body: Value,
}

type Handler = dyn Fn(&str, &Value) -> (u16, Value) + Send + Sync;

struct Stub {
    endpoint: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Stub {
    async fn start(handler: Arc<Handler>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        tokio::spawn(async move {
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let handler = handler.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    handle_connection(socket, handler, log).await;
                });
            }
        });

        Self { endpoint, requests }
    }

    fn targets(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.target.clone())
            .collect()
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    handler: Arc<Handler>,
    log: Arc<Mutex<Vec<Recorded>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let header = |name: &str| {
        head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    };
    let content_length: usize = header("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let target = header("x-amz-target").unwrap_or_default();
    let authorization = header("authorization");

    while buf.len() < header_end + content_length {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
    }
    let body: Value =
        serde_json::from_slice(&buf[header_end..header_end + content_length]).unwrap_or(Value::Null);

    let operation = target.rsplit('.').next().unwrap_or_default().to_string();
    let (code, response) = handler(&operation, &body);
    log.lock().unwrap().push(Recorded {
        target: operation,
        authorization,
        body,
    });

    let payload = response.to_string();
    let reply = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/x-amz-json-1.1\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        code,
        payload.len(),
        payload
    );
    let _ = socket.write_all(reply.as_bytes()).await;
    let _ = socket.shutdown().await;
}

fn client_for(stub: &Stub) -> Arc<dyn QueryService> {
    let mut config = AthenaConfig::for_region("us-east-1");
    config.endpoint = stub.endpoint.clone();
    config.auth_token = Some("secret-token".to_string());
    config.request_timeout = Duration::from_secs(5);
    Arc::new(AthenaClient::new(config).unwrap())
}

fn datum(value: Option<&str>) -> Value {
    match value {
        Some(v) => json!({ "VarCharValue": v }),
        None => json!({}),
    }
}

#[tokio::test]
async fn test_full_run_follows_status_and_pages() {
    let polls = Arc::new(AtomicUsize::new(0));
    let poll_counter = polls.clone();
    let handler: Arc<Handler> = Arc::new(move |operation: &str, body: &Value| -> (u16, Value) {
        match operation {
            "StartQueryExecution" => (200, json!({ "QueryExecutionId": "q-123" })),
            "GetQueryExecution" => {
                let state = if poll_counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    "RUNNING"
                } else {
                    "SUCCEEDED"
                };
                (
                    200,
                    json!({ "QueryExecution": {
                        "QueryExecutionId": body["QueryExecutionId"],
                        "Status": { "State": state }
                    }}),
                )
            }
            "GetQueryResults" if body.get("NextToken").is_none() => (
                200,
                json!({
                    "ResultSet": {
                        "Rows": [
                            { "Data": [datum(Some("name")), datum(Some("total"))] },
                            { "Data": [datum(Some("north")), datum(Some("10"))] }
                        ],
                        "ResultSetMetadata": { "ColumnInfo": [
                            { "Name": "name", "Type": "varchar" },
                            { "Name": "total", "Type": "bigint" }
                        ]}
                    },
                    "NextToken": "page-2"
                }),
            ),
            "GetQueryResults" => (
                200,
                json!({ "ResultSet": { "Rows": [
                    { "Data": [datum(Some("south")), datum(None)] }
                ]}}),
            ),
            _ => (400, json!({ "__type": "UnknownOperationException" })),
        }
    });
    let stub = Stub::start(handler).await;

    let request = QueryRequest::new("SELECT name, total FROM sales")
        .with_database("analytics")
        .with_output_location("s3://results/");
    let mut exec = QueryExecutor::new(client_for(&stub), request)
        .with_options(ExecutorOptions::default().with_poll_interval(Duration::from_millis(5)));

    let rows = exec.run_and_get_results().await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name"), Some("north"));
    assert_eq!(rows[0].get("total"), Some("10"));
    assert_eq!(rows[1].get("name"), Some("south"));
    assert_eq!(rows[1].get("total"), Some(""));
    assert_eq!(
        stub.targets(),
        vec![
            "StartQueryExecution",
            "GetQueryExecution",
            "GetQueryExecution",
            "GetQueryResults",
            "GetQueryResults"
        ]
    );

    assert_eq!(polls.load(Ordering::SeqCst), 2);

    let requests = stub.requests.lock().unwrap().clone();
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer secret-token"));
    assert_eq!(requests[0].body["QueryExecutionContext"]["Database"], "analytics");
    assert_eq!(requests[0].body["ResultConfiguration"]["OutputLocation"], "s3://results/");
    assert_eq!(requests[1].body["QueryExecutionId"], "q-123");
    assert_eq!(requests[4].body["NextToken"], "page-2");
}

#[tokio::test]
async fn test_rejected_submission_surfaces_service_error() {
    let handler: Arc<Handler> = Arc::new(|_: &str, _: &Value| -> (u16, Value) {
        (
            400,
            json!({ "__type": "InvalidRequestException", "Message": "line 1:1: mismatched input" }),
        )
    });
    let stub = Stub::start(handler).await;
    let mut exec = QueryExecutor::new(client_for(&stub), QueryRequest::new("SELEC 1"));

    let err = exec.run_and_get_results().await.unwrap_err();

    match err {
        QueryError::Submission(inner) => match *inner {
            QueryError::Service { code, message } => {
                assert_eq!(code, "InvalidRequestException");
                assert_eq!(message, "line 1:1: mismatched input");
            }
            other => panic!("unexpected inner error: {:?}", other),
        },
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(stub.targets(), vec!["StartQueryExecution"]);
}

#[tokio::test]
async fn test_failed_state_reason_reaches_caller() {
    let handler: Arc<Handler> = Arc::new(|operation: &str, _: &Value| -> (u16, Value) {
        match operation {
            "StartQueryExecution" => (200, json!({ "QueryExecutionId": "q-9" })),
            "GetQueryExecution" => (
                200,
                json!({ "QueryExecution": { "Status": {
                    "State": "FAILED",
                    "StateChangeReason": "TABLE_NOT_FOUND: line 1:15"
                }}}),
            ),
            _ => (500, json!({ "Message": "should not be called" })),
        }
    });
    let stub = Stub::start(handler).await;
    let mut exec = QueryExecutor::new(client_for(&stub), QueryRequest::new("SELECT * FROM nope"))
        .with_options(ExecutorOptions::default().with_poll_interval(Duration::from_millis(5)));

    let err = exec.run_and_get_results().await.unwrap_err();

    assert!(err.to_string().contains("TABLE_NOT_FOUND"));
    assert!(!stub.targets().iter().any(|t| t == "GetQueryResults"));
}
