//! Client-side weather state shared by every widget of a session.
//!
//! A [`WeatherStore`] locates the user, asks the forecast endpoint for a
//! forecast and publishes [`WeatherSnapshot`]s through a `watch` channel.
//! Widgets hold a receiver and re-render on change.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::watch;

use crate::{
    error::ClientError,
    model::{Coordinates, ForecastDay, ForecastResponse, TempUnit},
    server::ErrorBody,
};

/// Shown when the endpoint fails without telling us why.
pub const FETCH_FALLBACK_MESSAGE: &str = "Unable to fetch weather data";

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, ClientError>;
}

#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn fetch(&self, coords: Coordinates) -> Result<ForecastResponse, ClientError>;
}

/// Geolocator backed by a location known up front.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Option<Coordinates>);

#[async_trait]
impl Geolocator for FixedLocation {
    async fn locate(&self) -> Result<Coordinates, ClientError> {
        self.0.ok_or(ClientError::GeolocationUnavailable)
    }
}

/// Calls the forecast endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpForecastSource {
    http: Client,
    endpoint: String,
}

impl HttpForecastSource {
    /// `endpoint` is the full forecast URL, e.g. `http://127.0.0.1:3000/forecast`.
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self { http, endpoint: endpoint.into() }
    }
}

#[async_trait]
impl ForecastSource for HttpForecastSource {
    async fn fetch(&self, coords: Coordinates) -> Result<ForecastResponse, ClientError> {
        let fallback = || ClientError::FetchFailed(FETCH_FALLBACK_MESSAGE.to_string());

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("lat", coords.lat), ("lon", coords.lon)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("forecast endpoint unreachable: {e}");
                fallback()
            })?;

        let status = res.status();
        if !status.is_success() {
            let message = res.json::<ErrorBody>().await.ok().map(|b| b.error);
            tracing::warn!(%status, ?message, "forecast endpoint returned an error");
            return Err(message.map(ClientError::FetchFailed).unwrap_or_else(fallback));
        }

        res.json::<ForecastResponse>().await.map_err(|e| {
            tracing::warn!("malformed forecast response: {e}");
            fallback()
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Failed(ClientError),
}

/// What every subscriber sees.
#[derive(Debug, Clone)]
pub struct WeatherSnapshot {
    pub phase: Phase,
    /// Last successful forecast. Survives later failures.
    pub weather: Option<Arc<ForecastResponse>>,
    pub temp_unit: TempUnit,
}

impl WeatherSnapshot {
    pub fn loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn error(&self) -> Option<&ClientError> {
        match &self.phase {
            Phase::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn today(&self) -> Option<&ForecastDay> {
        self.weather.as_ref().and_then(|w| w.forecast.first())
    }
}

pub struct WeatherStore {
    geolocator: Arc<dyn Geolocator>,
    source: Arc<dyn ForecastSource>,
    state: watch::Sender<WeatherSnapshot>,
    latest: AtomicU64,
}

impl WeatherStore {
    /// The temperature unit is fixed here from `locale` for the store's lifetime.
    pub fn new(
        geolocator: Arc<dyn Geolocator>,
        source: Arc<dyn ForecastSource>,
        locale: &str,
    ) -> Self {
        let (state, _) = watch::channel(WeatherSnapshot {
            phase: Phase::Idle,
            weather: None,
            temp_unit: TempUnit::from_locale(locale),
        });

        Self { geolocator, source, state, latest: AtomicU64::new(0) }
    }

    pub fn subscribe(&self) -> watch::Receiver<WeatherSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> WeatherSnapshot {
        self.state.borrow().clone()
    }

    pub fn temp_unit(&self) -> TempUnit {
        self.state.borrow().temp_unit
    }

    /// First load after the store is created.
    pub async fn mount(&self) {
        self.refresh().await;
    }

    /// Locate, fetch and publish the outcome.
    ///
    /// Each call takes a ticket; only the most recent ticket may publish,
    /// so an overtaken refresh never overwrites a newer result.
    pub async fn refresh(&self) {
        let mut ticket = 0;
        self.state.send_modify(|s| {
            ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            s.phase = Phase::Loading;
        });

        let outcome = match self.geolocator.locate().await {
            Ok(coords) => self.source.fetch(coords).await,
            Err(err) => Err(err),
        };

        self.state.send_if_modified(|s| {
            if self.latest.load(Ordering::SeqCst) != ticket {
                tracing::debug!(ticket, "discarding result of superseded refresh");
                return false;
            }

            match outcome {
                Ok(forecast) => {
                    s.weather = Some(Arc::new(forecast));
                    s.phase = Phase::Ready;
                }
                Err(err) => {
                    tracing::warn!("weather refresh failed: {err}");
                    s.phase = Phase::Failed(err);
                }
            }
            true
        });
    }
}
