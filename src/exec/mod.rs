//! Query execution against the analytics database.
//!
//! The [`QueryExecutor`] trait abstracts the database so the pipeline can run
//! against PostgreSQL in production and against in-memory mocks in tests.

mod mock;
mod postgres;

pub use mock::{FailingExecutor, MockExecutor};
pub use postgres::PostgresExecutor;

use async_trait::async_trait;

use crate::error::Result;
use crate::table::{ResultTable, Value};

/// Executes validated SQL and returns tabular results.
///
/// `params` bind to `$1..$n` placeholders in the statement; generated SQL
/// carries its values inline and passes an empty slice.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs a query and collects the full result set into a [`ResultTable`].
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ResultTable>;

    /// Runs a query expected to produce a single value (first column of the
    /// first row). Returns `Value::Null` when the result set is empty.
    async fn execute_scalar(&self, sql: &str, params: &[Value]) -> Result<Value>;
}
