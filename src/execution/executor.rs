//! Query Executor - lifecycle of one query run
//!
//! submit → poll until terminal → fetch results. An executor built with a
//! cache policy whose key is already cached is "resumed": it binds the
//! cached handle and never submits.

use crate::cache::{CacheKey, CachePolicy, ResultCache};
use crate::config::ExecutorOptions;
use crate::decode::{decode_rows, ResultRow};
use crate::error::{QueryError, Result};
use crate::execution::request::QueryRequest;
use crate::execution::result::ResultSet;
use crate::execution::service::{ExecutionHandle, QueryService};
use crate::execution::status::{ExecutionState, ExecutionStatus};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives a single query through the service.
///
/// Lifecycle methods take `&mut self`; run concurrent queries on separate
/// executors.
pub struct QueryExecutor {
    service: Arc<dyn QueryService>,
    request: QueryRequest,
    options: ExecutorOptions,
    cache: Option<(Arc<ResultCache>, CacheKey)>,
    handle: Option<ExecutionHandle>,
    status: Option<ExecutionStatus>,
    resumed: bool,
}

impl QueryExecutor {
    pub fn new(service: Arc<dyn QueryService>, request: QueryRequest) -> Self {
        Self {
            service,
            request,
            options: ExecutorOptions::default(),
            cache: None,
            handle: None,
            status: None,
            resumed: false,
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a cache under `policy`, keyed by the current time bucket
    pub fn with_cache(self, cache: Arc<ResultCache>, policy: &CachePolicy) -> Self {
        self.with_cache_at(cache, policy, Utc::now())
    }

    /// Attach a cache, keyed by the bucket `at` falls into.
    ///
    /// A hit binds the cached handle and marks the executor resumed.
    pub fn with_cache_at(
        mut self,
        cache: Arc<ResultCache>,
        policy: &CachePolicy,
        at: DateTime<Utc>,
    ) -> Self {
        let key = policy.cache_key_at(at);
        if self.handle.is_none() {
            if let Some(handle) = cache.get(&key) {
                info!("Cache hit for '{}' ({}), reusing execution {}", policy.key(), key, handle);
                self.handle = Some(handle);
                self.resumed = true;
            } else {
                debug!("Cache miss for '{}' ({})", policy.key(), key);
            }
        }
        self.cache = Some((cache, key));
        self
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    pub fn handle(&self) -> Option<&ExecutionHandle> {
        self.handle.as_ref()
    }

    pub fn status(&self) -> Option<&ExecutionStatus> {
        self.status.as_ref()
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn cache_key(&self) -> Option<&CacheKey> {
        self.cache.as_ref().map(|(_, key)| key)
    }

    /// Start the query, unless a handle is already bound.
    ///
    /// A resumed executor is marked SUCCEEDED without a service call.
    pub async fn submit(&mut self) -> Result<&ExecutionHandle> {
        info!("query : {}", self.request.query);

        if self.resumed {
            if self.status.is_none() {
                self.status = Some(ExecutionStatus::new(ExecutionState::Succeeded));
            }
        } else if self.handle.is_none() {
            let handle = self
                .service
                .start_execution(&self.request)
                .await
                .map_err(|e| QueryError::Submission(Box::new(e)))?;
            info!("Query submitted: {}", handle);
            self.handle = Some(handle);
            self.status = Some(ExecutionStatus::new(ExecutionState::Running));
        }

        self.bound_handle()
    }

    /// Refresh the status from the service once
    pub async fn poll_once(&mut self) -> Result<&ExecutionStatus> {
        let handle = self.bound_handle()?.clone();
        let status = self.service.get_execution_status(&handle).await?;
        debug!("Execution {} is {}", handle, status.state);
        Ok(self.status.insert(status))
    }

    /// Poll until the execution reaches a terminal state.
    ///
    /// Returns the terminal status, which may be FAILED or CANCELLED; the
    /// fetch methods turn those into errors.
    pub async fn await_terminal(&mut self) -> Result<&ExecutionStatus> {
        self.await_terminal_or_cancel(std::future::pending::<()>()).await
    }

    /// Like [`await_terminal`](Self::await_terminal), but gives up with
    /// [`QueryError::Aborted`] as soon as `cancel` completes.
    pub async fn await_terminal_or_cancel<F>(&mut self, cancel: F) -> Result<&ExecutionStatus>
    where
        F: Future<Output = ()>,
    {
        let timeout = self.options.timeout;
        let started = Instant::now();
        tokio::pin!(cancel);

        let outcome = match timeout {
            Some(limit) => {
                tokio::select! {
                    res = tokio::time::timeout(limit, self.poll_until_terminal()) => {
                        res.unwrap_or(Err(QueryError::Timeout(limit)))
                    }
                    _ = &mut cancel => Err(QueryError::Aborted),
                }
            }
            None => {
                tokio::select! {
                    res = self.poll_until_terminal() => res,
                    _ = &mut cancel => Err(QueryError::Aborted),
                }
            }
        };

        match outcome {
            Ok(()) => {
                let status = self.current_status()?;
                info!(
                    "Execution finished as {} after {}ms",
                    status.state,
                    started.elapsed().as_millis()
                );
                Ok(status)
            }
            Err(e) => {
                warn!("Stopped waiting for execution: {}", e);
                Err(e)
            }
        }
    }

    async fn poll_until_terminal(&mut self) -> Result<()> {
        if self.status.as_ref().is_some_and(ExecutionStatus::is_terminal) {
            return Ok(());
        }
        loop {
            if self.poll_once().await?.is_terminal() {
                return Ok(());
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Fetch and decode the results of a SUCCEEDED execution
    pub async fn fetch_results(&mut self) -> Result<Vec<ResultRow>> {
        let raw = self.raw_results().await?;
        decode_rows(&raw)
    }

    /// Fetch the undecoded results, column metadata included
    pub async fn raw_results(&mut self) -> Result<ResultSet> {
        self.ensure_succeeded()?;
        let handle = self.bound_handle()?.clone();

        if !self.resumed {
            if let Some((cache, key)) = &self.cache {
                cache.put(*key, handle.clone());
            }
        }

        let results = self.service.get_results(&handle).await?;
        info!("Fetched {} rows for execution {}", results.data_row_count(), handle);
        Ok(results)
    }

    /// submit → await_terminal → fetch_results
    pub async fn run_and_get_results(&mut self) -> Result<Vec<ResultRow>> {
        self.submit().await?;
        self.await_terminal().await?;
        self.fetch_results().await
    }

    fn bound_handle(&self) -> Result<&ExecutionHandle> {
        self.handle.as_ref().ok_or_else(|| {
            QueryError::Precondition("no execution handle bound; call submit first".to_string())
        })
    }

    fn current_status(&self) -> Result<&ExecutionStatus> {
        self.status
            .as_ref()
            .ok_or_else(|| QueryError::Precondition("execution status not known yet".to_string()))
    }

    fn ensure_succeeded(&self) -> Result<()> {
        let status = self.current_status()?;
        match &status.state {
            ExecutionState::Succeeded => Ok(()),
            ExecutionState::Queued | ExecutionState::Running => Err(QueryError::Precondition(
                format!("execution is still {}; wait for a terminal state first", status.state),
            )),
            state => Err(QueryError::ExecutionFailed {
                state: state.clone(),
                reason: status.reason.clone(),
            }),
        }
    }
}
