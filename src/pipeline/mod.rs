//! The query orchestration pipeline.
//!
//! Ties the stages together: prompt construction, SQL generation, validation,
//! sanitization, execution with one fallback retry, and chart selection. The
//! orchestrator never returns an error to its caller; every outcome, including
//! failures, is encoded in the [`PipelineResult`] it produces.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chart::{infer_chart, ChartBackend, ChartPayload, ChartSpec};
use crate::error::ChartqlError;
use crate::exec::QueryExecutor;
use crate::llm::{build_sql_prompt, GeneratorService};
use crate::schema::SchemaContext;
use crate::sql::{contains_statement_separator, sanitize, SqlValidator};
use crate::table::ResultTable;

/// Preview marker for zero-row results.
const EMPTY_PREVIEW: &str = "Empty DataFrame";

/// The unit returned to callers for every question, success or failure.
/// Failure is communicated through the preview and payload message fields,
/// never as a structural difference.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub question: String,
    pub sql_raw: String,
    pub sql_clean: String,
    pub df_preview: String,
    pub chart_spec: Option<ChartSpec>,
    pub chart_payload: ChartPayload,
}

/// Shared, stateless pipeline front end. One instance serves all concurrent
/// invocations; construction is the expensive part (schema load, generator
/// setup), each call only touches locals.
pub struct QueryOrchestrator {
    schema: SchemaContext,
    generator: GeneratorService,
    validator: SqlValidator,
    executor: Arc<dyn QueryExecutor>,
    backend: Box<dyn ChartBackend>,
}

impl QueryOrchestrator {
    pub fn new(
        schema: SchemaContext,
        generator: GeneratorService,
        executor: Arc<dyn QueryExecutor>,
        backend: Box<dyn ChartBackend>,
    ) -> Self {
        Self {
            schema,
            generator,
            validator: SqlValidator::new(),
            executor,
            backend,
        }
    }

    /// Runs the full pipeline for one question.
    pub async fn run_query(&self, question: &str) -> PipelineResult {
        info!(question, "Running query pipeline");

        let prompt = build_sql_prompt(question, &self.schema.schema_text());

        let sql_raw = match self.generator.generate(&prompt).await {
            Ok(sql) => sql,
            Err(e) => {
                // Fatal generation error. Transient ones were already routed
                // to the fallback generator inside the service.
                warn!(error = %e, "SQL generation failed");
                let message = format!("SQL generation failed: {e}");
                return self.message_result(question, String::new(), String::new(), message);
            }
        };
        debug!(sql_raw, "Generated SQL");

        // Validation runs on the raw generated text so destructive intent is
        // caught before any cosmetic cleanup.
        if let Err(e) = self.validator.validate(&sql_raw) {
            warn!(error = %e, "Generated SQL rejected");
            return self.message_result(question, sql_raw, String::new(), e.to_string());
        }

        let sql_clean = sanitize(&sql_raw);
        if contains_statement_separator(&sql_clean) {
            let message = "Rejected SQL: multiple statements are not allowed.".to_string();
            return self.message_result(question, sql_raw, String::new(), message);
        }

        let df = match self.executor.execute(&sql_clean, &[]).await {
            Ok(df) => df,
            Err(primary) => match self.retry_with_fallback(&prompt).await {
                Ok(df) => df,
                Err(retry) => {
                    warn!(error = %retry, "Fallback retry failed");
                    let message =
                        format!("Query execution failed: {primary}; fallback also failed: {retry}");
                    return self.message_result(question, sql_raw, sql_clean, message);
                }
            },
        };

        self.finish(question, sql_raw, sql_clean, df)
    }

    /// One retry after an execution failure, using a freshly generated
    /// fallback statement pushed through the same sanitize/validate gates.
    async fn retry_with_fallback(&self, prompt: &str) -> crate::error::Result<ResultTable> {
        let fallback_raw = self.generator.fallback_sql(prompt);
        self.validator.validate(&fallback_raw)?;
        let fallback_clean = sanitize(&fallback_raw);
        if contains_statement_separator(&fallback_clean) {
            return Err(ChartqlError::validation(
                "fallback statement contains a separator",
            ));
        }
        warn!("Execution failed, retrying with fallback statement");
        self.executor.execute(&fallback_clean, &[]).await
    }

    fn finish(
        &self,
        question: &str,
        sql_raw: String,
        sql_clean: String,
        df: ResultTable,
    ) -> PipelineResult {
        // A 1x1 "message" table is the degraded-service channel: surface the
        // text as a notice, not as data to chart.
        if let Some(message) = df.message() {
            debug!(message, "Result is a notice");
            return self.message_result(question, sql_raw, sql_clean, message);
        }

        if df.is_empty() {
            debug!("Query returned no rows");
            return PipelineResult {
                question: question.to_string(),
                sql_raw,
                sql_clean,
                df_preview: EMPTY_PREVIEW.to_string(),
                chart_spec: None,
                chart_payload: self.backend.empty_payload("No data to display"),
            };
        }

        let spec = infer_chart(&df, question, &sql_clean);
        let payload = self.backend.render(&df, &spec);
        info!(kind = %spec.kind, rows = df.row_count(), "Pipeline finished");

        PipelineResult {
            question: question.to_string(),
            sql_raw,
            sql_clean,
            df_preview: df.preview(),
            chart_spec: Some(spec),
            chart_payload: payload,
        }
    }

    fn message_result(
        &self,
        question: &str,
        sql_raw: String,
        sql_clean: String,
        message: String,
    ) -> PipelineResult {
        PipelineResult {
            question: question.to_string(),
            sql_raw,
            sql_clean,
            df_preview: message.clone(),
            chart_spec: None,
            chart_payload: self.backend.message_payload(&message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartKind, QuickChartBackend};
    use crate::exec::{FailingExecutor, MockExecutor};
    use crate::llm::MockGenerator;
    use crate::schema::SchemaDocument;
    use crate::table::Value;

    fn test_schema() -> SchemaContext {
        let doc: SchemaDocument = serde_json::from_value(serde_json::json!({
            "tables": [{
                "table_name": "dim_subscriber",
                "primary_key": "subscriber_id",
                "columns": [
                    {"name": "subscriber_id", "data_type": "bigint", "nullable": false},
                    {"name": "year", "data_type": "int", "nullable": true}
                ],
                "foreign_keys": []
            }]
        }))
        .unwrap();
        SchemaContext::new(doc).unwrap()
    }

    fn orchestrator(
        generator: GeneratorService,
        executor: Arc<dyn QueryExecutor>,
    ) -> QueryOrchestrator {
        QueryOrchestrator::new(
            test_schema(),
            generator,
            executor,
            Box::new(QuickChartBackend),
        )
    }

    fn count_table(n: i64) -> ResultTable {
        ResultTable::new(
            vec!["num_subscribers".to_string()],
            vec![vec![Value::Int(n)]],
        )
    }

    #[tokio::test]
    async fn test_single_count_becomes_histogram() {
        let generator = GeneratorService::new(Box::new(MockGenerator::returning(
            "SELECT COUNT(*) AS num_subscribers FROM dim_subscriber WHERE year = 2024;",
        )));
        let executor = Arc::new(MockExecutor::returning(count_table(42)));
        let orch = orchestrator(generator, executor);

        let result = orch
            .run_query("How many subscribers signed up in 2024?")
            .await;

        let spec = result.chart_spec.expect("chart spec");
        assert_eq!(spec.kind, ChartKind::Histogram);
        assert_eq!(spec.x.as_deref(), Some("num_subscribers"));
        assert!(result.df_preview.contains("42"));
        assert!(!result.chart_payload.url.is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_never_executes() {
        let generator = GeneratorService::new(Box::new(MockGenerator::returning(
            "DROP TABLE dim_subscriber;",
        )));
        let executor = Arc::new(MockExecutor::returning(count_table(1)));
        let orch = orchestrator(generator, Arc::clone(&executor) as Arc<dyn QueryExecutor>);

        let result = orch.run_query("drop everything").await;

        assert!(result.df_preview.contains("DROP"));
        assert!(result.sql_clean.is_empty());
        assert!(result.chart_spec.is_none());
        assert!(executor.executed_sql().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_generation_error_short_circuits() {
        let generator = GeneratorService::new(Box::new(MockGenerator::failing_with(
            ChartqlError::generation("invalid API key"),
        )));
        let executor = Arc::new(MockExecutor::returning(count_table(1)));
        let orch = orchestrator(generator, executor);

        let result = orch.run_query("anything").await;

        assert!(result.sql_raw.is_empty());
        assert!(result.df_preview.contains("invalid API key"));
        assert!(result.chart_spec.is_none());
        assert!(result.chart_payload.is_empty());
    }

    #[tokio::test]
    async fn test_execution_failure_retries_once_with_fallback() {
        let generator = GeneratorService::new(Box::new(MockGenerator::returning(
            "SELECT missing_column FROM dim_subscriber;",
        )));
        let message_table = ResultTable::new(
            vec!["message".to_string()],
            vec![vec![Value::Text("LLM offline".to_string())]],
        );
        let executor = Arc::new(FailingExecutor::once_then(
            "column missing_column does not exist",
            message_table,
        ));
        let orch = orchestrator(generator, Arc::clone(&executor) as Arc<dyn QueryExecutor>);

        let result = orch.run_query("broken question").await;

        // First attempt plus one fallback attempt, nothing more.
        assert_eq!(executor.executed_sql().len(), 2);
        // Fallback produced a message table, so the notice short-circuit ran.
        assert_eq!(result.df_preview, "LLM offline");
        assert!(result.chart_spec.is_none());
    }

    #[tokio::test]
    async fn test_double_execution_failure_reports_both_messages() {
        let generator =
            GeneratorService::new(Box::new(MockGenerator::returning("SELECT 1;")));
        let executor = Arc::new(FailingExecutor::always("database on fire"));
        let orch = orchestrator(generator, Arc::clone(&executor) as Arc<dyn QueryExecutor>);

        let result = orch.run_query("q").await;

        assert_eq!(executor.executed_sql().len(), 2);
        assert!(result.df_preview.contains("Query execution failed"));
        assert!(result.df_preview.contains("fallback also failed"));
        assert!(result.chart_spec.is_none());
    }

    #[tokio::test]
    async fn test_empty_result_path() {
        let generator =
            GeneratorService::new(Box::new(MockGenerator::returning("SELECT 1;")));
        let executor = Arc::new(MockExecutor::returning(ResultTable::empty()));
        let orch = orchestrator(generator, executor);

        let result = orch.run_query("q").await;

        assert_eq!(result.df_preview, "Empty DataFrame");
        assert!(result.chart_spec.is_none());
        assert!(result.chart_payload.is_empty());
        // Zero rows gets the empty-table config, not a one-row notice table.
        assert_eq!(
            result.chart_payload.config,
            serde_json::json!({"type": "table", "data": {}})
        );
        assert_eq!(
            result.chart_payload.message.as_deref(),
            Some("No data to display")
        );
    }

    #[tokio::test]
    async fn test_degraded_service_surfaces_notice() {
        let generator = GeneratorService::degraded();
        let message_table = ResultTable::new(
            vec!["message".to_string()],
            vec![vec![Value::Text("offline notice".to_string())]],
        );
        let executor = Arc::new(MockExecutor::returning(message_table));
        let orch = orchestrator(generator, executor);

        let result = orch.run_query("q").await;

        assert_eq!(result.df_preview, "offline notice");
        assert!(result.chart_spec.is_none());
        assert_eq!(
            result.chart_payload.message.as_deref(),
            Some("offline notice")
        );
    }
}
