use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::StepError;

const DEFAULT_GEOCODING_BASE: &str = "https://geocoding-api.open-meteo.com/v1";
const DEFAULT_FORECAST_BASE: &str = "https://api.open-meteo.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Vec<GeoLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub weathercode: u16,
    #[serde(default)]
    pub precipitation: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HourlySeries {
    pub precipitation_probability: Vec<f64>,
    pub temperature_2m: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastData {
    pub current: CurrentWeather,
    pub hourly: HourlySeries,
}

// Geocoding + forecast collaborator behind a seam so tests can substitute a
// scripted provider.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn geocode(&self, city: &str) -> Result<Option<GeoLocation>, StepError>;

    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastData, StepError>;
}

pub struct OpenMeteoClient {
    client: reqwest::Client,
    geocoding_base: String,
    forecast_base: String,
}

impl OpenMeteoClient {
    pub fn new() -> Result<Self, StepError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            geocoding_base: DEFAULT_GEOCODING_BASE.to_string(),
            forecast_base: DEFAULT_FORECAST_BASE.to_string(),
        })
    }

    pub fn with_base_urls(
        mut self,
        geocoding_base: impl Into<String>,
        forecast_base: impl Into<String>,
    ) -> Self {
        self.geocoding_base = geocoding_base.into();
        self.forecast_base = forecast_base.into();
        self
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn geocode(&self, city: &str) -> Result<Option<GeoLocation>, StepError> {
        let url = format!("{}/search", self.geocoding_base);
        debug!(city = %city, "Geocoding city");

        let resp = self
            .client
            .get(&url)
            .query(&[("name", city), ("count", "1"), ("language", "en")])
            .send()
            .await?
            .error_for_status()?;

        let geo: GeoResponse = resp.json().await?;
        Ok(geo.results.into_iter().next())
    }

    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastData, StepError> {
        let url = format!("{}/forecast", self.forecast_base);
        debug!(latitude = %latitude, longitude = %longitude, "Fetching forecast");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", "precipitation,weathercode".to_string()),
                ("timezone", "auto".to_string()),
                (
                    "hourly",
                    "precipitation_probability,temperature_2m".to_string(),
                ),
            ])
            .send()
            .await?
            .error_for_status()?;

        let data: ForecastData = resp.json().await?;
        Ok(data)
    }
}
