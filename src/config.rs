const DEFAULT_AGENT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_AGENT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_CONCURRENCY: usize = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub agent_base_url: String,
    pub agent_api_key: Option<String>,
    pub agent_model: String,
    pub dataset_api_url: Option<String>,
    pub dataset_api_token: Option<String>,
    pub max_concurrency: usize,
    pub request_timeout_secs: u64,
    pub experiment_name: Option<String>,
    pub experiment_description: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            agent_base_url: std::env::var("AGENT_API_URL")
                .unwrap_or_else(|_| DEFAULT_AGENT_BASE_URL.into()),
            agent_api_key: std::env::var("AGENT_API_KEY").ok(),
            agent_model: std::env::var("AGENT_MODEL")
                .unwrap_or_else(|_| DEFAULT_AGENT_MODEL.into()),
            dataset_api_url: std::env::var("DATASET_API_URL").ok(),
            dataset_api_token: std::env::var("DATASET_API_TOKEN").ok(),
            max_concurrency: env_parse("MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            experiment_name: std::env::var("EXPERIMENT_NAME").ok(),
            experiment_description: std::env::var("EXPERIMENT_DESCRIPTION").ok(),
        }
    }

    pub fn print_banner(&self) {
        tracing::info!("weatherbench v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("  agent api:       {}", self.agent_base_url);
        tracing::info!(
            "  agent auth:      {}",
            if self.agent_api_key.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );
        tracing::info!("  agent model:     {}", self.agent_model);
        tracing::info!(
            "  dataset store:   {}",
            self.dataset_api_url.as_deref().unwrap_or("in-memory")
        );
        tracing::info!("  max concurrency: {}", self.max_concurrency);
        tracing::info!("  request timeout: {}s", self.request_timeout_secs);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent_base_url: DEFAULT_AGENT_BASE_URL.to_string(),
            agent_api_key: None,
            agent_model: DEFAULT_AGENT_MODEL.to_string(),
            dataset_api_url: None,
            dataset_api_token: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            experiment_name: None,
            experiment_description: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
