use anyhow::{Context, Result};
use tracing::info;

use weatherbench::config::Config;
use weatherbench::experiment::dataset::{
    sample_items, WEATHER_DATASET_DESCRIPTION, WEATHER_DATASET_NAME,
};
use weatherbench::experiment::store::{DatasetStore, HttpStore, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("weatherbench=info".parse().unwrap()),
        )
        .init();

    let config = Config::from_env();

    let store: Box<dyn DatasetStore> = match config.dataset_api_url {
        Some(ref url) => {
            let mut store = HttpStore::new(url.clone())?;
            if let Some(ref token) = config.dataset_api_token {
                store = store.with_token(token.clone());
            }
            Box::new(store)
        }
        None => {
            info!("No dataset store configured, populating an in-memory store");
            Box::new(MemoryStore::new())
        }
    };

    info!(dataset = %WEATHER_DATASET_NAME, "Creating dataset");
    store
        .create_dataset(WEATHER_DATASET_NAME, WEATHER_DATASET_DESCRIPTION)
        .await
        .context("Failed to create dataset")?;

    let items = sample_items();
    let total = items.len();
    for (index, item) in items.into_iter().enumerate() {
        info!(
            item = index + 1,
            total = total,
            city = %item.input["city"],
            "Adding dataset item"
        );
        store
            .add_item(WEATHER_DATASET_NAME, item)
            .await
            .context("Failed to add dataset item")?;
    }

    info!(dataset = %WEATHER_DATASET_NAME, items = %total, "Dataset populated");
    Ok(())
}
