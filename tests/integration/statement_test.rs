//! Statement-building integration tests.
//!
//! Exercises the descriptor-JSON-to-SQL path end to end, the way a caller
//! feeding an items file would hit it.

use pg_runner::db::Value;
use pg_runner::error::RunnerError;
use pg_runner::statement::OperationDescriptor;
use pretty_assertions::assert_eq;
use serde_json::json;

fn build(descriptor: serde_json::Value) -> (String, Vec<Value>) {
    let statement = OperationDescriptor::from_json(descriptor)
        .unwrap()
        .build()
        .unwrap();
    (statement.sql, statement.params)
}

#[test]
fn select_with_where_and_limit() {
    let (sql, params) = build(json!({
        "operation": "select",
        "table": "t",
        "columns": "*",
        "where": "id = $1",
        "whereParams": "5",
        "orderBy": "",
        "returnAll": false,
        "limit": 10,
    }));

    assert_eq!(sql, "SELECT * FROM t WHERE id = $1 LIMIT 10");
    assert_eq!(params, vec![Value::from("5")]);
}

#[test]
fn insert_from_column_map() {
    let (sql, params) = build(json!({
        "operation": "insert",
        "table": "users",
        "values": {"name": "Jane", "email": "jane@x.com"},
        "returnFields": "*",
    }));

    assert_eq!(
        sql,
        "INSERT INTO users (\"name\", \"email\") VALUES ($1, $2) RETURNING *"
    );
    assert_eq!(params, vec![Value::from("Jane"), Value::from("jane@x.com")]);
}

#[test]
fn update_numbers_where_params_after_set() {
    let (sql, params) = build(json!({
        "operation": "update",
        "table": "users",
        "values": {"status": "inactive"},
        "where": "id = $2",
        "whereParams": "123",
        "returnFields": "*",
    }));

    assert_eq!(
        sql,
        "UPDATE users SET \"status\" = $1 WHERE id = $2 RETURNING *"
    );
    assert_eq!(params, vec![Value::from("inactive"), Value::from("123")]);
}

#[test]
fn delete_requires_where() {
    let err = OperationDescriptor::from_json(json!({
        "operation": "delete",
        "table": "users",
        "where": "",
    }))
    .unwrap()
    .build()
    .unwrap_err();

    assert!(matches!(err, RunnerError::Validation(_)));
}

#[test]
fn update_with_fully_filtered_map_fails_before_io() {
    let err = OperationDescriptor::from_json(json!({
        "operation": "update",
        "table": "users",
        "values": {"a": null, "b": ""},
        "where": "id = $1",
        "whereParams": "1",
    }))
    .unwrap()
    .build()
    .unwrap_err();

    assert!(matches!(err, RunnerError::Validation(_)));
    assert!(err.to_string().contains("No data provided"));
}

#[test]
fn raw_query_passes_through_with_csv_params() {
    let (sql, params) = build(json!({
        "operation": "executeQuery",
        "query": "SELECT * FROM logs WHERE level = $1 AND source = $2",
        "params": "error, api",
    }));

    assert_eq!(sql, "SELECT * FROM logs WHERE level = $1 AND source = $2");
    assert_eq!(params, vec![Value::from("error"), Value::from("api")]);
}

#[test]
fn unknown_operation_tag_is_a_config_error() {
    let err = OperationDescriptor::from_json(json!({
        "operation": "merge",
        "table": "t",
    }))
    .unwrap_err();

    assert!(matches!(err, RunnerError::Config(_)));
}
