use crate::{
    config::ProviderSettings,
    error::ForecastError,
    model::{Coordinates, ForecastResponse},
    provider::{openweathermap::OpenWeatherMapProvider, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod openweathermap;
pub mod weatherapi;

/// Upper bound on a single upstream provider call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Forecasts never cover more than this many days.
pub const MAX_FORECAST_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeatherMap,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeatherMap => "openweathermap",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeatherMap, ProviderId::WeatherApi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = ForecastError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "openweathermap" => Ok(ProviderId::OpenWeatherMap),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(ForecastError::UnsupportedProvider(value.to_string())),
        }
    }
}

/// A weather service that can be asked for a daily forecast.
///
/// Adapters split the work into `fetch` (network) and `normalize` (pure
/// mapping) so the mapping can be exercised without a server.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Fetch the raw provider payload for a location.
    async fn fetch(&self, coords: Coordinates) -> Result<String, ForecastError>;

    /// Map a raw payload into the canonical response shape.
    fn normalize(&self, raw: &str) -> Result<ForecastResponse, ForecastError>;

    async fn forecast(&self, coords: Coordinates) -> Result<ForecastResponse, ForecastError> {
        let raw = self.fetch(coords).await?;
        self.normalize(&raw)
    }
}

/// Base URLs of the upstream services.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub openweathermap: String,
    pub weatherapi: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openweathermap: openweathermap::DEFAULT_BASE_URL.to_string(),
            weatherapi: weatherapi::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Build the HTTP client shared by all provider calls.
pub fn http_client(timeout: Duration) -> Result<Client, ForecastError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ForecastError::Internal(format!("failed to build HTTP client: {e}")))
}

/// Construct the adapter for `id`.
pub fn provider_for(
    id: ProviderId,
    api_key: String,
    http: Client,
    endpoints: &ProviderEndpoints,
) -> Box<dyn ForecastProvider> {
    match id {
        ProviderId::OpenWeatherMap => Box::new(
            OpenWeatherMapProvider::new(api_key, http).with_base_url(&endpoints.openweathermap),
        ),
        ProviderId::WeatherApi => {
            Box::new(WeatherApiProvider::new(api_key, http).with_base_url(&endpoints.weatherapi))
        }
    }
}

/// Resolve the configured provider and produce a normalized forecast.
pub async fn forecast_for(
    settings: &ProviderSettings,
    http: &Client,
    endpoints: &ProviderEndpoints,
    coords: Coordinates,
) -> Result<ForecastResponse, ForecastError> {
    let (id, api_key) = settings.resolve()?;
    let provider = provider_for(id, api_key, http.clone(), endpoints);

    provider.forecast(coords).await
}

/// GET `url` and return the body, mapping transport errors and
/// non-success statuses to `UpstreamFetchFailed`.
pub(crate) async fn get_body(
    http: &Client,
    provider: ProviderId,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String, ForecastError> {
    let res = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ForecastError::upstream(provider, format!("request failed: {e}")))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| ForecastError::upstream(provider, format!("failed to read body: {e}")))?;

    if !status.is_success() {
        tracing::warn!(%provider, %status, "upstream returned non-success status");
        return Err(ForecastError::upstream(
            provider,
            format!("status {status}: {}", truncate_body(&body)),
        ));
    }

    Ok(body)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
