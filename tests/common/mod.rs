#![allow(dead_code)]

use async_trait::async_trait;
use athena_runner::{
    ExecutionHandle, ExecutionState, ExecutionStatus, QueryError, QueryRequest, QueryService,
    ResultSet,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory query service that replays a scripted sequence of states.
///
/// Each status poll pops the next state; the last one repeats forever.
pub struct ScriptedService {
    states: Mutex<VecDeque<ExecutionStatus>>,
    results: ResultSet,
    fail_submit: bool,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub results_calls: AtomicUsize,
}

impl ScriptedService {
    pub fn new(states: Vec<ExecutionStatus>, results: ResultSet) -> Self {
        Self {
            states: Mutex::new(states.into()),
            results,
            fail_submit: false,
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            results_calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding(results: ResultSet) -> Self {
        Self::new(
            vec![
                status(ExecutionState::Queued),
                status(ExecutionState::Running),
                status(ExecutionState::Succeeded),
            ],
            results,
        )
    }

    pub fn failing_submit() -> Self {
        Self {
            fail_submit: true,
            ..Self::new(vec![status(ExecutionState::Succeeded)], ResultSet::default())
        }
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.results_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryService for ScriptedService {
    async fn start_execution(&self, request: &QueryRequest) -> athena_runner::Result<ExecutionHandle> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit {
            return Err(QueryError::Service {
                code: "InvalidRequestException".to_string(),
                message: format!("cannot run '{}'", request.query),
            });
        }
        Ok(ExecutionHandle::new(format!("exec-{}", n + 1)))
    }

    async fn get_execution_status(&self, _handle: &ExecutionHandle) -> athena_runner::Result<ExecutionStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut states = self.states.lock().unwrap();
        let next = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().cloned()
        };
        Ok(next.unwrap_or_else(|| status(ExecutionState::Running)))
    }

    async fn get_results(&self, _handle: &ExecutionHandle) -> athena_runner::Result<ResultSet> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.clone())
    }
}

pub fn status(state: ExecutionState) -> ExecutionStatus {
    ExecutionStatus::new(state)
}

pub fn sample_results() -> ResultSet {
    ResultSet::from_strings(vec![vec!["a", "b"], vec!["1", "2"], vec!["3", ""]])
}
