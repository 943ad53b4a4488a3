use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
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

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Hour (UTC) whose entry represents its day when present.
const REPRESENTATIVE_HOUR: u32 = 12;

/// OpenWeatherMap 5 day / 3 hour forecast.
#[derive(Debug, Clone)]
pub struct OpenWeatherMapProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherMapProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    pop: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

#[async_trait]
impl ForecastProvider for OpenWeatherMapProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeatherMap
    }

    async fn fetch(&self, coords: Coordinates) -> Result<String, ForecastError> {
        let url = format!("{}/data/2.5/forecast", self.base_url);
        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();

        tracing::debug!(lat = %lat, lon = %lon, "requesting OpenWeatherMap forecast");

        get_body(
            &self.http,
            self.id(),
            &url,
            &[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ],
        )
        .await
    }

    fn normalize(&self, raw: &str) -> Result<ForecastResponse, ForecastError> {
        let parsed: OwForecastResponse = serde_json::from_str(raw).map_err(|e| {
            ForecastError::Internal(format!("failed to parse OpenWeatherMap forecast JSON: {e}"))
        })?;

        let forecast = pick_daily_entries(&parsed.list)
            .into_iter()
            .take(MAX_FORECAST_DAYS)
            .map(|(date, entry)| to_forecast_day(date, entry))
            .collect();

        Ok(ForecastResponse {
            location: format!("{}, {}", parsed.city.name, parsed.city.country),
            forecast,
        })
    }
}

/// Select one entry per UTC calendar date, in order of first appearance.
///
/// The first entry seen for a date holds its slot until an entry at the
/// representative hour arrives, which then replaces it. That hour is also
/// read in UTC rather than in the server's local zone, so the pick only
/// matches a local-noon rule when the host runs on UTC.
fn pick_daily_entries(list: &[OwForecastEntry]) -> Vec<(NaiveDate, &OwForecastEntry)> {
    let mut days: Vec<(NaiveDate, &OwForecastEntry)> = Vec::new();

    for entry in list {
        let Some(at) = DateTime::<Utc>::from_timestamp(entry.dt, 0) else {
            tracing::warn!(dt = entry.dt, "skipping entry with out-of-range timestamp");
            continue;
        };
        let date = at.date_naive();

        match days.iter_mut().find(|(d, _)| *d == date) {
            Some(slot) if at.hour() == REPRESENTATIVE_HOUR => slot.1 = entry,
            Some(_) => {}
            None => days.push((date, entry)),
        }
    }

    days
}

fn to_forecast_day(date: NaiveDate, entry: &OwForecastEntry) -> ForecastDay {
    let temp = round_half_up(entry.main.temp);
    let temp_min = round_half_up(entry.main.temp_min);
    let temp_max = round_half_up(entry.main.temp_max);
    let label = entry.weather.first().map(|w| w.main.as_str()).unwrap_or_default();

    ForecastDay {
        date: date_label(date),
        day: weekday_label(date),
        temp,
        temp_f: celsius_to_fahrenheit(temp),
        temp_min: Some(temp_min),
        temp_min_f: Some(celsius_to_fahrenheit(temp_min)),
        temp_max: Some(temp_max),
        temp_max_f: Some(celsius_to_fahrenheit(temp_max)),
        condition: Condition::classify(label),
        precipitation: pop_to_percent(entry.pop),
    }
}

fn pop_to_percent(pop: Option<f64>) -> u8 {
    round_half_up(pop.unwrap_or(0.0) * 100.0).clamp(0, 100) as u8
}
