//! Mock query runners for testing.
//!
//! Provides in-memory implementations of `QueryRunner` so statement
//! building and batch policy can be tested without a server.

use super::{ExecutionResult, QueryRunner, Record, Value};
use crate::error::{Result, RunnerError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A mock runner that replays scripted results and records every statement
/// it receives.
#[derive(Default)]
pub struct MockRunner {
    responses: Mutex<VecDeque<Result<ExecutionResult>>>,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
    close_count: AtomicUsize,
}

impl MockRunner {
    /// Creates a mock runner with no scripted responses; every query
    /// succeeds with an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful result for the next unscripted query.
    pub fn push_result(&self, result: ExecutionResult) {
        self.responses.lock().unwrap().push_back(Ok(result));
    }

    /// Queues a single-row result with the given JSON object.
    pub fn push_row(&self, row: serde_json::Value) {
        let record: Record = serde_json::from_value(row).expect("row must be a JSON object");
        self.push_result(ExecutionResult::from_rows(vec![record], 0, vec![]));
    }

    /// Queues a failure for the next query.
    pub fn push_error(&self, error: RunnerError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Returns the statements executed so far, in order.
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed.lock().unwrap().clone()
    }

    /// Number of times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryRunner for MockRunner {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<ExecutionResult> {
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));

        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(ExecutionResult::default()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A runner whose every query fails with a driver-style error.
pub struct FailingRunner {
    message: String,
    close_count: AtomicUsize,
}

impl FailingRunner {
    /// Creates a failing runner with the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            close_count: AtomicUsize::new(0),
        }
    }

    /// Number of times `close` has been called.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryRunner for FailingRunner {
    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<ExecutionResult> {
        Err(RunnerError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
