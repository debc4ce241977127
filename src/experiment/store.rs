use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::StoreError;

use super::dataset::{Dataset, DatasetItem};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Narrow dataset persistence boundary: fetch a named dataset, create one,
// append items. Everything else about storage is the collaborator's business.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Dataset, StoreError>;

    async fn create_dataset(&self, name: &str, description: &str) -> Result<(), StoreError>;

    async fn add_item(&self, dataset: &str, item: DatasetItem) -> Result<(), StoreError>;
}

pub struct MemoryStore {
    datasets: DashMap<String, Dataset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            datasets: DashMap::new(),
        }
    }

    pub fn seeded(dataset: Dataset) -> Self {
        let store = Self::new();
        store.datasets.insert(dataset.name.clone(), dataset);
        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatasetStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<Dataset, StoreError> {
        self.datasets
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn create_dataset(&self, name: &str, description: &str) -> Result<(), StoreError> {
        if self.datasets.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        self.datasets.insert(
            name.to_string(),
            Dataset {
                name: name.to_string(),
                description: description.to_string(),
                items: Vec::new(),
            },
        );
        info!(dataset = %name, "Dataset created");
        Ok(())
    }

    async fn add_item(&self, dataset: &str, item: DatasetItem) -> Result<(), StoreError> {
        let mut entry = self
            .datasets
            .get_mut(dataset)
            .ok_or_else(|| StoreError::NotFound(dataset.to_string()))?;
        entry.items.push(item);
        Ok(())
    }
}

pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        })
    }
}

#[async_trait]
impl DatasetStore for HttpStore {
    async fn get(&self, name: &str) -> Result<Dataset, StoreError> {
        let url = format!("{}/datasets/{}", self.base_url.trim_end_matches('/'), name);
        debug!(dataset = %name, "Fetching dataset");

        let resp = self.request(self.client.get(&url)).send().await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json().await?)
    }

    async fn create_dataset(&self, name: &str, description: &str) -> Result<(), StoreError> {
        let url = format!("{}/datasets", self.base_url.trim_end_matches('/'));

        let resp = self
            .request(self.client.post(&url))
            .json(&serde_json::json!({ "name": name, "description": description }))
            .send()
            .await?;
        Self::check(resp).await?;
        info!(dataset = %name, "Dataset created");
        Ok(())
    }

    async fn add_item(&self, dataset: &str, item: DatasetItem) -> Result<(), StoreError> {
        let url = format!(
            "{}/datasets/{}/items",
            self.base_url.trim_end_matches('/'),
            dataset
        );

        let resp = self.request(self.client.post(&url)).json(&item).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}
