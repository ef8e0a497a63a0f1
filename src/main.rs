//! ChartQL command-line entry point.

use std::sync::Arc;

use tracing::{error, info, warn};

use chartql::chart::QuickChartBackend;
use chartql::cli::Cli;
use chartql::config::Settings;
use chartql::error::Result;
use chartql::exec::PostgresExecutor;
use chartql::llm::{GeneratorService, GroqClient, GroqConfig};
use chartql::pipeline::QueryOrchestrator;
use chartql::schema::SchemaContext;
use chartql::{logging, PipelineResult};

#[tokio::main]
async fn main() {
    // A .env file is a convenience for local development; absence is fine.
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut settings = Settings::load_from_file(&config_path)?;
    settings.apply_env_overrides();

    if let Some(schema) = &cli.schema {
        settings.schema.path = schema.clone();
    }
    if let Some(url) = &cli.database_url {
        settings.database.url = Some(url.clone());
    }

    let schema = SchemaContext::load_from_file(&settings.schema.path)?;

    let generator = build_generator(&cli, &settings)?;
    let executor = PostgresExecutor::connect(settings.database_url()?).await?;
    let orchestrator = QueryOrchestrator::new(
        schema,
        generator,
        Arc::new(executor),
        Box::new(QuickChartBackend),
    );

    let result = orchestrator.run_query(&cli.question).await;
    print_result(&result, cli.json)?;

    Ok(())
}

/// Builds the generator service. Missing credentials degrade to the offline
/// fallback rather than failing startup.
fn build_generator(cli: &Cli, settings: &Settings) -> Result<GeneratorService> {
    if cli.offline {
        info!("Offline mode requested, using fallback generator");
        return Ok(GeneratorService::degraded());
    }

    match &settings.llm.api_key {
        Some(api_key) => {
            let config = GroqConfig::new(api_key, &settings.llm.model);
            let client = GroqClient::new(config)?;
            Ok(GeneratorService::new(Box::new(client)))
        }
        None => {
            warn!("GROQ_API_KEY not set, running with fallback generator only");
            Ok(GeneratorService::degraded())
        }
    }
}

fn print_result(result: &PipelineResult, as_json: bool) -> Result<()> {
    if as_json {
        let json = serde_json::to_string_pretty(result).map_err(|e| {
            chartql::ChartqlError::config(format!("Failed to serialize result: {e}"))
        })?;
        println!("{json}");
        return Ok(());
    }

    println!("===== SQL =====");
    println!("{}", result.sql_clean);
    println!("\n===== Preview =====");
    println!("{}", result.df_preview);
    println!("\n===== Chart =====");
    match &result.chart_spec {
        Some(spec) => {
            println!("{} {}", spec.kind, spec.title.as_deref().unwrap_or_default());
            println!("{}", result.chart_payload.url);
        }
        None => println!("(no chart)"),
    }

    Ok(())
}
