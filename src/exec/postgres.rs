//! PostgreSQL executor backed by sqlx.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo};
use tracing::{debug, warn};

use crate::error::{ChartqlError, Result};
use crate::exec::QueryExecutor;
use crate::table::{ResultTable, Value};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum rows to return from a query.
const MAX_ROWS: usize = 10_000;

/// Maximum number of pooled connections.
const MAX_CONNECTIONS: u32 = 5;

/// PostgreSQL query executor.
#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    /// Connects to the database and verifies the connection with a trivial
    /// round trip before handing the executor out.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|e| map_connection_error(&e))?;

        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| map_connection_error(&e))?;

        debug!("Connected to analytics database");
        Ok(Self { pool })
    }

    /// Wraps an existing pool. Primarily useful for testing.
    #[allow(dead_code)]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Closes the underlying connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<PgRow>> {
        tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            bind_params(sql, params).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            ChartqlError::execution(format!("Query timed out after {QUERY_TIMEOUT_SECS} seconds"))
        })?
        .map_err(|e| ChartqlError::execution(format_query_error(e)))
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// Binds pipeline values to `$n` placeholders in order.
fn bind_params<'q>(sql: &'q str, params: &'q [Value]) -> PgQuery<'q> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            Value::Text(s) => query.bind(s.as_str()),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Bool(b) => query.bind(*b),
            Value::Null => query.bind(Option::<String>::None),
        };
    }
    query
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ResultTable> {
        let start = Instant::now();
        let pg_rows = self.fetch_rows(sql, params).await?;

        // Column names come from the first row; an empty result set carries
        // no decodable metadata here, and the chart layer treats a
        // zero-column table as empty anyway.
        let column_names: Vec<String> = pg_rows
            .first()
            .map(|first| {
                first
                    .columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let total_rows = pg_rows.len();
        if total_rows > MAX_ROWS {
            warn!(
                "Query returned {} rows, truncating to {}",
                total_rows, MAX_ROWS
            );
        }

        let rows: Vec<Vec<Value>> = pg_rows.iter().take(MAX_ROWS).map(convert_row).collect();

        debug!(
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );

        Ok(ResultTable::new(column_names, rows))
    }

    async fn execute_scalar(&self, sql: &str, params: &[Value]) -> Result<Value> {
        let pg_rows = self.fetch_rows(sql, params).await?;
        match pg_rows.first() {
            Some(row) => {
                let type_name = row
                    .columns()
                    .first()
                    .map(|col| col.type_info().name().to_string())
                    .unwrap_or_default();
                Ok(convert_value(row, 0, &type_name))
            }
            None => Ok(Value::Null),
        }
    }
}

/// Converts a sqlx row into pipeline values.
fn convert_row(row: &PgRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes a single column by Postgres type name, falling back to text.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        // NUMERIC has no lossless native mapping; go through text so the
        // column-level coercion in ResultTable can decide.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}

/// Maps sqlx connection errors to user-facing messages.
fn map_connection_error(error: &sqlx::Error) -> ChartqlError {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        ChartqlError::execution("Cannot connect to database. Check that the server is running.")
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        ChartqlError::execution("Database authentication failed. Check your credentials.")
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        ChartqlError::execution("Database does not exist.")
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        ChartqlError::execution("Database connection timed out.")
    } else {
        ChartqlError::execution(error.to_string())
    }
}

/// Formats a query error, surfacing Postgres DETAIL and HINT when present.
fn format_query_error(error: sqlx::Error) -> String {
    if let Some(db_error) = error.as_database_error() {
        let mut result = String::from("ERROR: ");
        result.push_str(db_error.message());

        if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
            if let Some(detail) = pg_error.detail() {
                result.push_str("\n  DETAIL: ");
                result.push_str(detail);
            }
            if let Some(hint) = pg_error.hint() {
                result.push_str("\n  HINT: ");
                result.push_str(hint);
            }
        }

        result
    } else {
        error.to_string()
    }
}
