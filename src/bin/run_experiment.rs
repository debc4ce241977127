use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use weatherbench::config::Config;
use weatherbench::context::RunContext;
use weatherbench::experiment::dataset::{sample_dataset, WEATHER_DATASET_NAME};
use weatherbench::experiment::store::{DatasetStore, HttpStore, MemoryStore};
use weatherbench::experiment::{default_item_evaluators, default_run_evaluators, ExperimentRunner};
use weatherbench::weather::{self, OpenMeteoClient, WeatherTask};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("weatherbench=info".parse().unwrap()),
        )
        .init();

    let config = Config::from_env();
    config.print_banner();

    let ctx = Arc::new(
        RunContext::builder()
            .with_agent(Arc::new(weather::agents::city_translator(&config)?))
            .with_agent(Arc::new(weather::agents::weather_assistant(&config)?))
            .build(),
    );

    let provider = Arc::new(OpenMeteoClient::new()?);
    let workflow = Arc::new(weather::build_workflow(provider)?);
    let task = Arc::new(WeatherTask::new(workflow, ctx.clone()));

    let dataset = match config.dataset_api_url {
        Some(ref url) => {
            let mut store = HttpStore::new(url.clone())?;
            if let Some(ref token) = config.dataset_api_token {
                store = store.with_token(token.clone());
            }
            store
                .get(WEATHER_DATASET_NAME)
                .await
                .context("Failed to fetch dataset from store")?
        }
        None => {
            info!("No dataset store configured, using built-in sample dataset");
            MemoryStore::seeded(sample_dataset())
                .get(WEATHER_DATASET_NAME)
                .await?
        }
    };
    info!(dataset = %dataset.name, items = %dataset.items.len(), "Dataset loaded");

    let item_evaluators = default_item_evaluators();
    let run_evaluators = default_run_evaluators();

    let name = config
        .experiment_name
        .clone()
        .unwrap_or_else(|| format!("Weather Workflow Experiment - {}", chrono::Utc::now().date_naive()));
    let description = config
        .experiment_description
        .clone()
        .unwrap_or_else(|| "Evaluating weather workflow performance on diverse city names".into());

    let runner = ExperimentRunner::new(name)
        .with_description(description)
        .with_model(config.agent_model.clone())
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_max_concurrency(config.max_concurrency);

    let report = runner
        .run(&dataset, task, &item_evaluators, &run_evaluators)
        .await
        .context("Experiment failed")?;

    println!("{}", report.format());

    let flushed = ctx.trace().flush();
    info!(events = %flushed, "Trace buffer flushed");

    Ok(())
}
