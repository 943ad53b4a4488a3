//! HTTP surface of the forecast normalizer.
//!
//! `GET /forecast?lat=&lon=&units=` (also mounted at the dashboard path
//! `/api/weather/forecast`) answers with a [`ForecastResponse`] or with a
//! status code and `{"error": "..."}` body.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::{
    config::SettingsSource,
    error::ForecastError,
    model::{Coordinates, ForecastResponse, Units},
    provider::{ProviderEndpoints, forecast_for},
};

#[derive(Clone)]
pub struct AppState {
    settings: Arc<dyn SettingsSource>,
    http: Client,
    endpoints: Arc<ProviderEndpoints>,
}

impl AppState {
    pub fn new(settings: Arc<dyn SettingsSource>, http: Client) -> Self {
        Self { settings, http, endpoints: Arc::new(ProviderEndpoints::default()) }
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = Arc::new(endpoints);
        self
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/forecast", get(get_forecast))
        .route("/api/weather/forecast", get(get_forecast))
        .with_state(state)
}

/// Serve the forecast routes on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("listening on {addr}");
    }

    axum::serve(listener, routes(state)).with_graceful_shutdown(shutdown).await
}

#[derive(Debug, Default)]
pub struct ForecastQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub units: Option<String>,
}

impl ForecastQuery {
    /// Build from raw query pairs. The first occurrence of a key wins and
    /// unknown keys are ignored, so no query string is ever rejected here.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();

        for (key, value) in pairs {
            let slot = match key.as_str() {
                "lat" => &mut query.lat,
                "lon" => &mut query.lon,
                "units" => &mut query.units,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        query
    }

    fn coordinates(&self) -> Result<Coordinates, ForecastError> {
        let (Some(lat), Some(lon)) = (present(&self.lat), present(&self.lon)) else {
            return Err(ForecastError::MissingParameter);
        };

        let parse = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite());
        match (parse(lat), parse(lon)) {
            (Some(lat), Some(lon)) => Ok(Coordinates { lat, lon }),
            _ => Err(ForecastError::InvalidParameter),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

async fn get_forecast(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ForecastResponse>, ForecastError> {
    let query = ForecastQuery::from_pairs(pairs);
    let coords = query.coordinates()?;
    let units = Units::parse_or_default(query.units.as_deref());

    // Read on every request, never cached.
    let settings = state.settings.settings();

    tracing::debug!(lat = coords.lat, lon = coords.lon, ?units, "forecast requested");

    let forecast = forecast_for(&settings, &state.http, &state.endpoints, coords).await?;
    Ok(Json(forecast))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ForecastError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForecastError::MissingParameter
            | ForecastError::InvalidParameter
            | ForecastError::UnsupportedProvider(_) => StatusCode::BAD_REQUEST,
            ForecastError::NotConfigured => StatusCode::NOT_FOUND,
            ForecastError::UpstreamFetchFailed { .. } | ForecastError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ForecastError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Error encountered while processing forecast request: {self}");
        } else {
            tracing::debug!("Rejected forecast request: {self}");
        }

        (status, Json(ErrorBody { error: self.public_message().to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ProviderSettings, model::Condition};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    fn app(settings: ProviderSettings, upstream: Option<&MockServer>) -> Router {
        let mut state = AppState::new(Arc::new(settings), Client::new());
        if let Some(server) = upstream {
            state = state.with_endpoints(ProviderEndpoints {
                openweathermap: server.uri(),
                weatherapi: server.uri(),
            });
        }
        routes(state)
    }

    async fn request(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn openweathermap_payload() -> String {
        json!({
            "city": { "name": "Gothenburg", "country": "SE" },
            "list": [{
                "dt": 1_792_411_200,
                "main": { "temp": 11.2, "temp_min": 9.0, "temp_max": 12.4 },
                "weather": [{ "main": "Rain" }],
                "pop": 0.42
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn missing_lat_is_bad_request() {
        let settings = ProviderSettings::new("openweathermap", "KEY");

        for uri in ["/forecast?lon=11.9", "/forecast?lat=&lon=11.9&units=imperial", "/forecast"] {
            let (status, body) = request(app(settings.clone(), None), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": "Latitude and longitude are required" }));
        }
    }

    #[tokio::test]
    async fn repeated_parameters_use_first_value() {
        let (status, body) =
            request(app(ProviderSettings::default(), None), "/forecast?lat=1&lat=2&lon=3").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Weather API not configured" }));

        let settings = ProviderSettings::new("openweathermap", "KEY");
        let (status, body) =
            request(app(settings, None), "/forecast?lat=north&lat=57.7&lon=11.9").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Latitude and longitude must be numbers");
    }

    #[test]
    fn query_pairs_keep_first_occurrence() {
        let pairs = [("units", "imperial"), ("lat", "1"), ("x", "y"), ("lat", "2"), ("lon", "3")];
        let query = ForecastQuery::from_pairs(
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        );

        assert_eq!(query.lat.as_deref(), Some("1"));
        assert_eq!(query.lon.as_deref(), Some("3"));
        assert_eq!(query.units.as_deref(), Some("imperial"));
    }

    #[tokio::test]
    async fn non_numeric_coordinates_are_bad_request() {
        let settings = ProviderSettings::new("openweathermap", "KEY");
        let (status, body) = request(app(settings, None), "/forecast?lat=north&lon=11.9").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Latitude and longitude must be numbers");
    }

    #[tokio::test]
    async fn unconfigured_provider_is_not_found() {
        let (status, body) =
            request(app(ProviderSettings::default(), None), "/forecast?lat=57.7&lon=11.9").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Weather API not configured" }));
    }

    #[tokio::test]
    async fn unknown_provider_is_bad_request() {
        let settings = ProviderSettings::new("darksky", "KEY");
        let (status, body) = request(app(settings, None), "/forecast?lat=57.7&lon=11.9").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Unsupported weather provider" }));
    }

    #[tokio::test]
    async fn upstream_failure_is_internal_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let settings = ProviderSettings::new("weatherapi", "KEY");
        let (status, body) = request(app(settings, Some(&server)), "/forecast?lat=1&lon=2").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch weather data" }));
    }

    #[tokio::test]
    async fn garbage_upstream_body_is_internal_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let settings = ProviderSettings::new("openweathermap", "KEY");
        let (status, _) = request(app(settings, Some(&server)), "/forecast?lat=1&lon=2").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn returns_normalized_forecast_on_both_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(openweathermap_payload()))
            .mount(&server)
            .await;

        let settings = ProviderSettings::new("openweathermap", "KEY");

        for uri in ["/forecast?lat=57.7&lon=11.9", "/api/weather/forecast?lat=57.7&lon=11.9"] {
            let (status, body) = request(app(settings.clone(), Some(&server)), uri).await;
            assert_eq!(status, StatusCode::OK);

            let res: ForecastResponse = serde_json::from_value(body).unwrap();
            assert_eq!(res.location, "Gothenburg, SE");
            assert_eq!(res.forecast.len(), 1);
            assert_eq!(res.forecast[0].temp, 11);
            assert_eq!(res.forecast[0].temp_f, 52);
            assert_eq!(res.forecast[0].precipitation, 42);
            assert_eq!(res.forecast[0].condition, Condition::Rain);
        }
    }
}
