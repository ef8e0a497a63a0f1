//! End-to-end pipeline tests.
//!
//! These run entirely against mock generators and executors; no database or
//! API key is required.

use std::io::Write;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use chartql::chart::{ChartKind, QuickChartBackend};
use chartql::exec::{FailingExecutor, MockExecutor, QueryExecutor};
use chartql::llm::{GeneratorService, MockGenerator, FALLBACK_SQL};
use chartql::pipeline::QueryOrchestrator;
use chartql::schema::SchemaContext;
use chartql::table::{ResultTable, Value};

const SCHEMA_JSON: &str = r#"{
  "tables": [
    {
      "table_name": "dim_subscriber",
      "primary_key": "subscriber_id",
      "columns": [
        {"name": "subscriber_id", "data_type": "bigint", "nullable": false},
        {"name": "plan_type", "data_type": "text", "nullable": true},
        {"name": "year", "data_type": "int", "nullable": true}
      ],
      "foreign_keys": []
    },
    {
      "table_name": "fact_usage",
      "primary_key": "usage_id",
      "columns": [
        {"name": "usage_id", "data_type": "bigint", "nullable": false},
        {"name": "subscriber_id", "data_type": "bigint", "nullable": false},
        {"name": "month", "data_type": "text", "nullable": true},
        {"name": "data_gb", "data_type": "numeric", "nullable": true}
      ],
      "foreign_keys": [
        {"column": "subscriber_id", "ref_table": "dim_subscriber", "ref_column": "subscriber_id"}
      ]
    }
  ]
}"#;

fn load_schema() -> SchemaContext {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SCHEMA_JSON.as_bytes()).unwrap();
    SchemaContext::load_from_file(file.path()).unwrap()
}

fn orchestrator(generator: GeneratorService, executor: Arc<dyn QueryExecutor>) -> QueryOrchestrator {
    QueryOrchestrator::new(load_schema(), generator, executor, Box::new(QuickChartBackend))
}

fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> ResultTable {
    ResultTable::new(columns.iter().map(|c| c.to_string()).collect(), rows)
}

fn generator_returning(sql: &str) -> GeneratorService {
    GeneratorService::new(Box::new(MockGenerator::returning(sql)))
}

#[tokio::test]
async fn test_count_question_yields_histogram() {
    let sql = "SELECT COUNT(*) AS num_subscribers FROM dim_subscriber WHERE year = 2024;";
    let executor = Arc::new(MockExecutor::returning(table(
        &["num_subscribers"],
        vec![vec![Value::Int(42)]],
    )));
    let orch = orchestrator(generator_returning(sql), executor);

    let result = orch
        .run_query("How many subscribers signed up in 2024?")
        .await;

    assert_eq!(result.sql_raw, sql);
    assert_eq!(result.sql_clean, "SELECT COUNT(*) AS num_subscribers FROM dim_subscriber WHERE year = 2024");
    let spec = result.chart_spec.expect("chart spec");
    assert_eq!(spec.kind, ChartKind::Histogram);
    assert_eq!(spec.x.as_deref(), Some("num_subscribers"));
    assert!(result.df_preview.contains("num_subscribers"));
    assert!(result.df_preview.contains("42"));
    assert!(result
        .chart_payload
        .url
        .starts_with("https://quickchart.io/chart?c="));
}

#[tokio::test]
async fn test_monthly_usage_yields_line_chart() {
    let sql = "SELECT month, SUM(data_gb) AS total_gb FROM fact_usage GROUP BY month;";
    let executor = Arc::new(MockExecutor::returning(table(
        &["month", "total_gb"],
        vec![
            vec![Value::Text("2024-01".into()), Value::Float(120.5)],
            vec![Value::Text("2024-02".into()), Value::Float(98.2)],
        ],
    )));
    let orch = orchestrator(generator_returning(sql), executor);

    let result = orch.run_query("total data usage per month").await;

    let spec = result.chart_spec.expect("chart spec");
    assert_eq!(spec.kind, ChartKind::Line);
    assert_eq!(spec.x.as_deref(), Some("month"));
    assert_eq!(spec.y, vec!["total_gb".to_string()]);
    assert!(spec.is_time_series);
    assert_eq!(result.chart_payload.config["type"], "line");
}

#[tokio::test]
async fn test_plan_split_yields_pie_for_few_categories() {
    let sql = "SELECT plan_type, COUNT(*) AS subscribers FROM dim_subscriber GROUP BY plan_type;";
    let executor = Arc::new(MockExecutor::returning(table(
        &["plan_type", "subscribers"],
        vec![
            vec![Value::Text("prepaid".into()), Value::Int(120)],
            vec![Value::Text("postpaid".into()), Value::Int(80)],
        ],
    )));
    let orch = orchestrator(generator_returning(sql), executor);

    let result = orch.run_query("subscribers by plan type").await;

    assert_eq!(result.chart_spec.unwrap().kind, ChartKind::Pie);
}

#[tokio::test]
async fn test_fenced_output_is_rejected_before_execution() {
    // A fenced block is not parseable SQL and does not start with SELECT or
    // WITH, so validation rejects it before the sanitizer ever runs.
    let executor = Arc::new(MockExecutor::returning(table(
        &["n"],
        vec![vec![Value::Int(1)]],
    )));
    let orch = orchestrator(
        generator_returning("```sql\nSELECT 1;\n```"),
        Arc::clone(&executor) as Arc<dyn QueryExecutor>,
    );

    let result = orch.run_query("q").await;

    assert!(result.chart_spec.is_none());
    assert!(result.sql_clean.is_empty());
    assert!(executor.executed_sql().is_empty());
}

#[tokio::test]
async fn test_mutation_is_rejected_naming_the_keyword() {
    let executor = Arc::new(MockExecutor::returning(table(
        &["n"],
        vec![vec![Value::Int(1)]],
    )));
    let orch = orchestrator(
        generator_returning("DELETE FROM dim_subscriber;"),
        Arc::clone(&executor) as Arc<dyn QueryExecutor>,
    );

    let result = orch.run_query("remove everyone").await;

    assert!(result.df_preview.contains("DELETE"));
    assert!(result.chart_spec.is_none());
    assert!(result.chart_payload.is_empty());
    assert!(executor.executed_sql().is_empty());
}

#[tokio::test]
async fn test_offline_mode_surfaces_notice() {
    // Degraded service generates the canned fallback statement; executing it
    // produces a single-cell message table which short-circuits to a notice.
    let notice = "LLM offline - cannot generate SQL for this question right now. \
                  Please try again later or contact the admin.";
    let executor = Arc::new(MockExecutor::returning(table(
        &["message"],
        vec![vec![Value::Text(notice.to_string())]],
    )));
    let orch = orchestrator(
        GeneratorService::degraded(),
        Arc::clone(&executor) as Arc<dyn QueryExecutor>,
    );

    let result = orch.run_query("anything at all").await;

    assert_eq!(result.sql_raw, FALLBACK_SQL);
    assert_eq!(result.df_preview, notice);
    assert!(result.chart_spec.is_none());
    assert_eq!(result.chart_payload.message.as_deref(), Some(notice));
    assert_eq!(result.chart_payload.url, "");
}

#[tokio::test]
async fn test_empty_result_yields_empty_dataframe_marker() {
    let executor = Arc::new(MockExecutor::returning(ResultTable::empty()));
    let orch = orchestrator(generator_returning("SELECT 1;"), executor);

    let result = orch.run_query("q").await;

    assert_eq!(result.df_preview, "Empty DataFrame");
    assert!(result.chart_spec.is_none());
    assert_eq!(result.chart_payload.url, "");
}

#[tokio::test]
async fn test_execution_failure_retries_with_fallback_statement() {
    let notice_table = table(&["message"], vec![vec![Value::Text("notice".into())]]);
    let executor = Arc::new(FailingExecutor::once_then(
        "relation \"typo_table\" does not exist",
        notice_table,
    ));
    let orch = orchestrator(
        generator_returning("SELECT * FROM typo_table;"),
        Arc::clone(&executor) as Arc<dyn QueryExecutor>,
    );

    let result = orch.run_query("q").await;

    let attempts = executor.executed_sql();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[0].contains("typo_table"));
    assert!(attempts[1].contains("LLM offline"));
    assert_eq!(result.df_preview, "notice");
}

#[tokio::test]
async fn test_double_failure_concatenates_messages() {
    let executor = Arc::new(FailingExecutor::always("connection lost"));
    let orch = orchestrator(
        generator_returning("SELECT 1;"),
        Arc::clone(&executor) as Arc<dyn QueryExecutor>,
    );

    let result = orch.run_query("q").await;

    assert_eq!(executor.executed_sql().len(), 2);
    assert!(result.df_preview.contains("Query execution failed"));
    assert!(result.df_preview.contains("fallback also failed"));
    assert!(result.df_preview.contains("connection lost"));
    assert!(result.chart_spec.is_none());
}

#[tokio::test]
async fn test_result_serializes_to_json() {
    let executor = Arc::new(MockExecutor::returning(table(
        &["num"],
        vec![vec![Value::Int(7)]],
    )));
    let orch = orchestrator(generator_returning("SELECT 7 AS num;"), executor);

    let result = orch.run_query("seven").await;
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["question"], "seven");
    assert_eq!(json["chart_spec"]["kind"], "histogram");
    assert!(json["chart_payload"]["url"].as_str().unwrap().len() > 0);
}
