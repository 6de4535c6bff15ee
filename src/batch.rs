//! Batch processing with per-item failure isolation.
//!
//! Drives a sequence of work items through statement building and
//! execution. One boolean policy governs all error behavior: with
//! continue-on-fail, a failed item becomes a failure outcome and the run
//! keeps going; without it, the first failure aborts the whole run.

use crate::config::EffectiveConfig;
use crate::db::{self, QueryRunner};
use crate::engine;
use crate::error::{Result, RunnerError};
use crate::statement::OperationDescriptor;
use tracing::{debug, warn};

/// One unit of work: the per-item input the descriptor resolver consumes.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Per-item parameter payload, already resolved to plain JSON.
    pub payload: serde_json::Value,
}

impl WorkItem {
    /// Creates a work item from a payload.
    pub fn new(payload: serde_json::Value) -> Self {
        Self { payload }
    }

    /// The synthesized item used when the input sequence is empty, so
    /// statement-less operations still run once.
    pub fn empty() -> Self {
        Self {
            payload: serde_json::Value::Null,
        }
    }
}

/// Outcome of one batch item, in input order.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchItemOutcome {
    /// The item's normalized operation output.
    Success { data: serde_json::Value },
    /// The item's caught failure (continue-on-fail only).
    Failure { message: String, details: String },
}

impl BatchItemOutcome {
    fn from_error(error: &RunnerError) -> Self {
        Self::Failure {
            message: error.to_string(),
            details: error.category().to_string(),
        }
    }

    /// Returns true for successful outcomes.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Renders the outcome in the caller-facing JSON shape.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Success { data } => data.clone(),
            Self::Failure { message, details } => serde_json::json!({
                "error": true,
                "errorMessage": message,
                "errorDetails": details,
            }),
        }
    }
}

/// Batch run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

/// Processes one batch of work items sequentially.
///
/// Items are never executed in parallel: ordered outcomes and the small
/// shared pool assume sequential per-item execution, and it keeps error
/// attribution per item unambiguous.
#[derive(Debug)]
pub struct BatchProcessor {
    continue_on_fail: bool,
    state: BatchState,
}

impl BatchProcessor {
    /// Creates a processor with the given failure policy.
    pub fn new(continue_on_fail: bool) -> Self {
        Self {
            continue_on_fail,
            state: BatchState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Runs every item through the resolver, builder, and runner.
    ///
    /// Credential and configuration errors abort regardless of policy;
    /// validation and query errors obey the continue-on-fail switch. On
    /// abort, outcomes accumulated so far are dropped from the success
    /// return path (they remain visible in logs only).
    pub async fn run<F>(
        &mut self,
        runner: &dyn QueryRunner,
        mut items: Vec<WorkItem>,
        resolve: F,
    ) -> Result<Vec<BatchItemOutcome>>
    where
        F: Fn(&WorkItem) -> Result<OperationDescriptor>,
    {
        self.state = BatchState::Running;

        if items.is_empty() {
            items.push(WorkItem::empty());
        }

        let mut outcomes = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let result = match resolve(item) {
                Ok(descriptor) => engine::run_operation(runner, &descriptor).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(data) => {
                    debug!("Item {index} succeeded");
                    outcomes.push(BatchItemOutcome::Success { data });
                }
                Err(e) if e.is_per_item() && self.continue_on_fail => {
                    warn!("Item {index} failed, continuing: {e}");
                    outcomes.push(BatchItemOutcome::from_error(&e));
                }
                Err(e) => {
                    warn!("Item {index} failed, aborting batch: {e}");
                    self.state = BatchState::Aborted;
                    return Err(e);
                }
            }
        }

        self.state = BatchState::Completed;
        Ok(outcomes)
    }
}

/// Runs a batch over an already-acquired runner and releases it exactly
/// once, on every exit path.
pub async fn run_and_release<F>(
    runner: &dyn QueryRunner,
    continue_on_fail: bool,
    items: Vec<WorkItem>,
    resolve: F,
) -> Result<Vec<BatchItemOutcome>>
where
    F: Fn(&WorkItem) -> Result<OperationDescriptor>,
{
    let mut processor = BatchProcessor::new(continue_on_fail);
    let result = processor.run(runner, items, resolve).await;
    let close_result = runner.close().await;

    let outcomes = result?;
    close_result?;
    Ok(outcomes)
}

/// Connects for one batch run, processes the items, and releases the pool.
///
/// The pool is acquired once per run and never held across runs.
pub async fn run_batch<F>(
    config: &EffectiveConfig,
    items: Vec<WorkItem>,
    resolve: F,
) -> Result<Vec<BatchItemOutcome>>
where
    F: Fn(&WorkItem) -> Result<OperationDescriptor>,
{
    let runner = db::connect(config).await?;
    run_and_release(runner.as_ref(), config.continue_on_fail, items, resolve).await
}
