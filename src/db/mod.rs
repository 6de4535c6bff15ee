//! Database access layer for pg-runner.
//!
//! Provides the single I/O boundary as a trait, allowing the real sqlx
//! runner and the test mocks to be used interchangeably.

mod mock;
mod postgres;
pub mod schema;
mod types;

pub use mock::{FailingRunner, MockRunner};
pub use postgres::{test_connection, ConnectionTestReport, PostgresRunner};
pub use schema::{ColumnMeta, Discovery, TableRef};
pub use types::{ExecutionResult, FieldInfo, Record, Value};

use crate::config::EffectiveConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the driver query interface.
///
/// This is the only place pg-runner performs I/O; everything above it deals
/// in built statements and normalized results.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Executes a parameterized statement and normalizes the driver result.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<ExecutionResult>;

    /// Closes the underlying connection pool.
    async fn close(&self) -> Result<()>;
}

/// Connects a runner for the given effective configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &EffectiveConfig) -> Result<Box<dyn QueryRunner>> {
    let runner = PostgresRunner::connect(config).await?;
    Ok(Box::new(runner))
}
