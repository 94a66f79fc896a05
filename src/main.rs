use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use asr_got_pipeline::{
    config::{Config, LogFormat},
    model::HttpModelClient,
    stages::StageEngine,
    TaskScheduler,
};

/// Run the nine-stage Graph-of-Thoughts reasoning pipeline over a
/// research query.
#[derive(Debug, Parser)]
#[command(name = "asr-got-pipeline", version, about)]
struct Cli {
    /// The research query to analyze.
    query: String,

    /// Last stage to execute (1-9).
    #[arg(long, default_value_t = 9)]
    through_stage: i64,

    /// Print the full graph document as JSON instead of the report.
    #[arg(long)]
    graph_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "ASR-GoT pipeline starting..."
    );

    // Initialize the model client
    let client = match HttpModelClient::new(
        &config.endpoints,
        &config.credentials,
        config.request.clone(),
    ) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to initialize model client");
            return Err(e.into());
        }
    };

    let scheduler = Arc::new(TaskScheduler::new(
        Arc::new(client),
        config.scheduler.clone(),
    ));
    let mut engine = StageEngine::new(scheduler, config.credentials.clone(), config.pipeline);

    for stage in 1..=cli.through_stage.clamp(1, 9) {
        let query = (stage == 1).then_some(cli.query.as_str());
        match engine.execute_stage(stage, query).await {
            Ok(result) => {
                info!(stage, summary = %result.summary, "Stage finished");
            }
            Err(e) => {
                error!(stage, error = %e, "Pipeline stopped");
                return Err(e.into());
            }
        }
    }

    if cli.graph_json {
        println!("{}", serde_json::to_string_pretty(engine.graph())?);
    } else if let Some(report) = engine.report() {
        println!("{}", report);
    } else {
        println!("{}", serde_json::to_string_pretty(&engine.stage_results())?);
    }

    info!("Pipeline complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
