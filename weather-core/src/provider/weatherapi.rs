use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::ForecastError,
    model::{
        Condition, Coordinates, ForecastDay, ForecastResponse, celsius_to_fahrenheit, date_label,
        round_half_up, weekday_label,
    },
    provider::{MAX_FORECAST_DAYS, ProviderId, get_body},
};

use super::ForecastProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    avgtemp_c: f64,
    avgtemp_f: Option<f64>,
    mintemp_c: Option<f64>,
    mintemp_f: Option<f64>,
    maxtemp_c: Option<f64>,
    maxtemp_f: Option<f64>,
    daily_chance_of_rain: Option<f64>,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: NaiveDate,
    day: WaDay,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    forecast: WaForecast,
}

#[async_trait]
impl ForecastProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    async fn fetch(&self, coords: Coordinates) -> Result<String, ForecastError> {
        let url = format!("{}/v1/forecast.json", self.base_url);
        let q = format!("{},{}", coords.lat, coords.lon);
        let days = MAX_FORECAST_DAYS.to_string();

        tracing::debug!(q = %q, "requesting WeatherAPI forecast");

        get_body(
            &self.http,
            self.id(),
            &url,
            &[("key", self.api_key.as_str()), ("q", q.as_str()), ("days", days.as_str())],
        )
        .await
    }

    fn normalize(&self, raw: &str) -> Result<ForecastResponse, ForecastError> {
        let parsed: WaForecastResponse = serde_json::from_str(raw).map_err(|e| {
            ForecastError::Internal(format!("failed to parse WeatherAPI forecast JSON: {e}"))
        })?;

        let mut days = parsed.forecast.forecastday;
        days.sort_by_key(|d| d.date);
        days.dedup_by_key(|d| d.date);

        let forecast = days.iter().take(MAX_FORECAST_DAYS).map(to_forecast_day).collect();

        Ok(ForecastResponse {
            location: format!("{}, {}", parsed.location.name, parsed.location.country),
            forecast,
        })
    }
}

fn to_forecast_day(entry: &WaForecastDay) -> ForecastDay {
    let day = &entry.day;
    let temp = round_half_up(day.avgtemp_c);

    // Provider-supplied Fahrenheit is trusted; derived only when absent.
    let paired = |c: Option<f64>, f: Option<f64>| match c.map(round_half_up) {
        Some(c) => (Some(c), Some(f.map(round_half_up).unwrap_or_else(|| celsius_to_fahrenheit(c)))),
        None => (None, None),
    };
    let (temp_min, temp_min_f) = paired(day.mintemp_c, day.mintemp_f);
    let (temp_max, temp_max_f) = paired(day.maxtemp_c, day.maxtemp_f);

    ForecastDay {
        date: date_label(entry.date),
        day: weekday_label(entry.date),
        temp,
        temp_f: day.avgtemp_f.map(round_half_up).unwrap_or_else(|| celsius_to_fahrenheit(temp)),
        temp_min,
        temp_min_f,
        temp_max,
        temp_max_f,
        condition: Condition::classify(&day.condition.text),
        precipitation: round_half_up(day.daily_chance_of_rain.unwrap_or(0.0)).clamp(0, 100) as u8,
    }
}
