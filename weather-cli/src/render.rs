//! Text widgets drawn from a [`WeatherSnapshot`].

use weather_core::{ForecastDay, Phase, TempUnit, WeatherSnapshot};

pub const LOADING: &str = "Loading weather...";
pub const UNAVAILABLE: &str = "Unable to load weather data";

/// Compact temperature shown in a header bar, e.g. `12°C`.
pub fn header_temperature(snapshot: &WeatherSnapshot) -> String {
    match (&snapshot.phase, snapshot.today()) {
        (Phase::Ready, Some(today)) => {
            format!("{}{}", today.temp_in(snapshot.temp_unit), snapshot.temp_unit.symbol())
        }
        (Phase::Loading, _) | (Phase::Idle, _) => LOADING.to_string(),
        _ => UNAVAILABLE.to_string(),
    }
}

/// The multi-day forecast panel.
pub fn forecast_panel(snapshot: &WeatherSnapshot) -> Vec<String> {
    match &snapshot.phase {
        Phase::Idle | Phase::Loading => vec![LOADING.to_string()],
        Phase::Failed(err) => vec![format!("{UNAVAILABLE} ({err})")],
        Phase::Ready => {
            let Some(weather) = &snapshot.weather else {
                return vec![UNAVAILABLE.to_string()];
            };

            let mut lines = vec![weather.location.clone()];
            lines.extend(weather.forecast.iter().map(|d| day_line(d, snapshot.temp_unit)));
            lines
        }
    }
}

fn day_line(day: &ForecastDay, unit: TempUnit) -> String {
    let symbol = unit.symbol();
    let range = day
        .range_in(unit)
        .map(|(min, max)| format!("  {min}{symbol} / {max}{symbol}"))
        .unwrap_or_default();

    format!(
        "{:<4}{:<8}{:<14}{:>4}{symbol}{range}  {:>3}%",
        day.day,
        day.date,
        day.condition,
        day.temp_in(unit),
        day.precipitation,
    )
}
