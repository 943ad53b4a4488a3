//! End-to-end: weather store -> forecast endpoint -> mocked provider.

use std::sync::Arc;

use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot};
use weather_core::{
    AppState, ClientError, Condition, Coordinates, FixedLocation, HttpForecastSource, Phase,
    ProviderEndpoints, ProviderSettings, TempUnit, WeatherStore,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

/// Start the endpoint on an ephemeral port. Dropping the sender stops it.
async fn spawn_endpoint(state: AppState) -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    tokio::spawn(weather_core::serve(listener, state, async move {
        let _ = stop_rx.await;
    }));

    (format!("http://{addr}/api/weather/forecast"), stop_tx)
}

fn store(endpoint: String, location: Option<Coordinates>, locale: &str) -> WeatherStore {
    WeatherStore::new(
        Arc::new(FixedLocation(location)),
        Arc::new(HttpForecastSource::new(reqwest::Client::new(), endpoint)),
        locale,
    )
}

#[tokio::test]
async fn store_receives_normalized_weatherapi_forecast() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast.json"))
        .and(query_param("q", "40.71,-74.01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "location": { "name": "New York", "country": "USA" },
            "forecast": { "forecastday": [
                { "date": "2026-10-19", "day": {
                    "avgtemp_c": 14.2, "avgtemp_f": 57.6,
                    "daily_chance_of_rain": 10,
                    "condition": { "text": "Partly Cloudy" } } },
                { "date": "2026-10-20", "day": {
                    "avgtemp_c": 9.0, "avgtemp_f": 48.2,
                    "daily_chance_of_rain": 90,
                    "condition": { "text": "Heavy snow" } } }
            ] }
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let state = AppState::new(
        Arc::new(ProviderSettings::new("weatherapi", "KEY")),
        reqwest::Client::new(),
    )
    .with_endpoints(ProviderEndpoints {
        openweathermap: upstream.uri(),
        weatherapi: upstream.uri(),
    });
    let (endpoint, _stop) = spawn_endpoint(state).await;

    let store = store(endpoint, Some(Coordinates { lat: 40.71, lon: -74.01 }), "en-US");
    store.mount().await;

    let snapshot = store.snapshot();
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.temp_unit, TempUnit::F);

    let weather = snapshot.weather.as_ref().unwrap();
    assert_eq!(weather.location, "New York, USA");
    assert_eq!(weather.forecast.len(), 2);
    assert_eq!(weather.forecast[0].temp_in(TempUnit::F), 58);
    assert_eq!(weather.forecast[0].condition, Condition::Clouds);
    assert_eq!(weather.forecast[1].condition, Condition::Snow);
    assert_eq!(weather.forecast[1].precipitation, 90);
}

#[tokio::test]
async fn store_reports_unconfigured_endpoint() {
    let state = AppState::new(Arc::new(ProviderSettings::default()), reqwest::Client::new());
    let (endpoint, _stop) = spawn_endpoint(state).await;

    let store = store(endpoint, Some(Coordinates { lat: 1.0, lon: 2.0 }), "en-GB");
    store.mount().await;

    let snapshot = store.snapshot();
    assert_eq!(
        snapshot.phase,
        Phase::Failed(ClientError::FetchFailed("Weather API not configured".into()))
    );
    assert!(snapshot.weather.is_none());
}
