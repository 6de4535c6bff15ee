//! Batch-processing integration tests against the mock runner.

use pg_runner::batch::{run_and_release, BatchProcessor, BatchState, WorkItem};
use pg_runner::db::MockRunner;
use pg_runner::error::{Result, RunnerError};
use pg_runner::statement::OperationDescriptor;
use serde_json::json;

/// Resolves each work item's payload as an operation descriptor, the way
/// the items-file path does.
fn resolve(item: &WorkItem) -> Result<OperationDescriptor> {
    OperationDescriptor::from_json(item.payload.clone())
}

fn insert_item(name: &str) -> WorkItem {
    WorkItem::new(json!({
        "operation": "insert",
        "table": "users",
        "values": {"name": name},
    }))
}

#[tokio::test]
async fn batch_of_three_with_invalid_middle_item_continues() {
    let runner = MockRunner::new();
    runner.push_row(json!({"id": 1, "name": "Ada"}));
    // Item 2 fails validation before reaching the runner, so only two
    // statements execute.
    runner.push_row(json!({"id": 3, "name": "Grace"}));

    let items = vec![
        insert_item("Ada"),
        WorkItem::new(json!({
            "operation": "insert",
            "table": "users",
            "values": {},
        })),
        insert_item("Grace"),
    ];

    let mut processor = BatchProcessor::new(true);
    let outcomes = processor.run(&runner, items, resolve).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_success());
    assert!(!outcomes[1].is_success());
    assert!(outcomes[2].is_success());

    assert_eq!(outcomes[0].to_json()["inserted"]["name"], "Ada");
    assert_eq!(outcomes[2].to_json()["inserted"]["name"], "Grace");
    assert_eq!(runner.executed().len(), 2);
}

#[tokio::test]
async fn batch_of_three_fail_fast_aborts_and_releases_once() {
    let runner = MockRunner::new();
    runner.push_row(json!({"id": 1}));
    runner.push_error(RunnerError::query("duplicate key value"));
    runner.push_row(json!({"id": 3}));

    let items = vec![insert_item("a"), insert_item("b"), insert_item("c")];
    let err = run_and_release(&runner, false, items, resolve)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Query { .. }));
    assert_eq!(runner.close_count(), 1);
    // The third item never executed
    assert_eq!(runner.executed().len(), 2);
}

#[tokio::test]
async fn empty_input_synthesizes_one_item_for_fixed_query() {
    let runner = MockRunner::new();
    runner.push_row(json!({"version": "PostgreSQL 16"}));

    let fixed = OperationDescriptor::ExecuteQuery {
        query: "SELECT version()".to_string(),
        params: String::new(),
    };

    let outcomes = run_and_release(&runner, false, Vec::new(), move |_| Ok(fixed.clone()))
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(runner.executed().len(), 1);
    assert_eq!(runner.executed()[0].0, "SELECT version()");
    assert_eq!(runner.close_count(), 1);
}

#[tokio::test]
async fn unknown_operation_aborts_even_with_continue_on_fail() {
    let runner = MockRunner::new();
    let items = vec![WorkItem::new(json!({
        "operation": "vacuum",
        "table": "t",
    }))];

    let mut processor = BatchProcessor::new(true);
    let err = processor.run(&runner, items, resolve).await.unwrap_err();

    assert!(matches!(err, RunnerError::Config(_)));
    assert_eq!(processor.state(), BatchState::Aborted);
    assert!(runner.executed().is_empty());
}

#[tokio::test]
async fn mixed_operations_keep_outcome_shapes() {
    let runner = MockRunner::new();
    runner.push_row(json!({"id": 1}));
    runner.push_result(pg_runner::db::ExecutionResult::from_rows(vec![], 2, vec![]));

    let items = vec![
        insert_item("Ada"),
        WorkItem::new(json!({
            "operation": "delete",
            "table": "users",
            "where": "active = false",
        })),
    ];

    let mut processor = BatchProcessor::new(false);
    let outcomes = processor.run(&runner, items, resolve).await.unwrap();

    assert_eq!(outcomes[0].to_json()["inserted"]["id"], 1);
    assert_eq!(outcomes[1].to_json(), json!({"deleted": true, "rowCount": 2}));
}
