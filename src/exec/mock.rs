//! Mock executors for testing the pipeline without a database.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ChartqlError, Result};
use crate::exec::QueryExecutor;
use crate::table::{ResultTable, Value};

/// Executor that returns canned tables in order and records the SQL it saw.
pub struct MockExecutor {
    responses: Mutex<Vec<ResultTable>>,
    executed: Mutex<Vec<String>>,
}

impl MockExecutor {
    /// Creates a mock that returns the given tables, one per `execute` call.
    /// Once exhausted it keeps returning an empty table.
    pub fn new(responses: Vec<ResultTable>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Creates a mock that always returns the same table.
    pub fn returning(table: ResultTable) -> Self {
        Self::new(vec![table])
    }

    /// The SQL statements executed so far, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn next_response(&self) -> ResultTable {
        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => ResultTable::empty(),
            1 => responses[0].clone(),
            _ => responses.pop().unwrap(),
        }
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<ResultTable> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(self.next_response())
    }

    async fn execute_scalar(&self, sql: &str, _params: &[Value]) -> Result<Value> {
        self.executed.lock().unwrap().push(sql.to_string());
        let table = self.next_response();
        Ok(table
            .rows()
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// Executor whose first `fail_count` calls fail with the given message.
pub struct FailingExecutor {
    message: String,
    fail_count: Mutex<usize>,
    fallback: Option<ResultTable>,
    executed: Mutex<Vec<String>>,
}

impl FailingExecutor {
    /// Fails every call with the given message.
    pub fn always(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fail_count: Mutex::new(usize::MAX),
            fallback: None,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Fails the first call, then returns the given table.
    pub fn once_then(message: impl Into<String>, table: ResultTable) -> Self {
        Self {
            message: message.into(),
            fail_count: Mutex::new(1),
            fallback: Some(table),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// The SQL statements attempted so far, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn try_next(&self) -> Result<ResultTable> {
        let mut remaining = self.fail_count.lock().unwrap();
        if *remaining > 0 {
            *remaining = remaining.saturating_sub(1);
            return Err(ChartqlError::execution(self.message.clone()));
        }
        Ok(self.fallback.clone().unwrap_or_else(ResultTable::empty))
    }
}

#[async_trait]
impl QueryExecutor for FailingExecutor {
    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<ResultTable> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.try_next()
    }

    async fn execute_scalar(&self, sql: &str, _params: &[Value]) -> Result<Value> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.try_next().map(|table| {
            table
                .rows()
                .first()
                .and_then(|row| row.first())
                .cloned()
                .unwrap_or(Value::Null)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ResultTable {
        ResultTable::new(
            vec!["n".to_string()],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        )
    }

    #[tokio::test]
    async fn test_mock_returns_last_response_when_exhausted() {
        let mock = MockExecutor::returning(sample_table());
        assert_eq!(mock.execute("SELECT 1;", &[]).await.unwrap().row_count(), 2);
        assert_eq!(mock.execute("SELECT 2;", &[]).await.unwrap().row_count(), 2);
        assert_eq!(mock.executed_sql(), vec!["SELECT 1;", "SELECT 2;"]);
    }

    #[tokio::test]
    async fn test_mock_scalar_takes_first_cell() {
        let mock = MockExecutor::returning(sample_table());
        assert_eq!(mock.execute_scalar("SELECT n;", &[]).await.unwrap(), Value::Int(1));
    }

    #[tokio::test]
    async fn test_failing_once_then_recovers() {
        let exec = FailingExecutor::once_then("relation missing", sample_table());
        assert!(exec.execute("SELECT bad;", &[]).await.is_err());
        assert_eq!(exec.execute("SELECT ok;", &[]).await.unwrap().row_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_always_fails() {
        let exec = FailingExecutor::always("down");
        assert!(exec.execute("SELECT 1;", &[]).await.is_err());
        assert!(exec.execute("SELECT 1;", &[]).await.is_err());
    }
}
