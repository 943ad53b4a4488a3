use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Normalized weather classification shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Snow,
    Thunderstorm,
}

impl Condition {
    /// Classify a provider's free-text label.
    ///
    /// Substrings are tested in priority order and the first match wins.
    /// Text that matches nothing falls back to [`Condition::Clouds`].
    pub fn classify(text: &str) -> Self {
        let text = text.to_lowercase();

        if text.contains("rain") {
            Condition::Rain
        } else if text.contains("drizzle") {
            Condition::Drizzle
        } else if text.contains("snow") {
            Condition::Snow
        } else if text.contains("thunder") || text.contains("storm") {
            Condition::Thunderstorm
        } else if text.contains("cloud") {
            Condition::Clouds
        } else if text.contains("clear") || text.contains("sunny") {
            Condition::Clear
        } else {
            Condition::Clouds
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Clear => "clear",
            Condition::Clouds => "clouds",
            Condition::Rain => "rain",
            Condition::Drizzle => "drizzle",
            Condition::Snow => "snow",
            Condition::Thunderstorm => "thunderstorm",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Unit system requested by the caller of the forecast endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Parse the `units` query value. Anything unrecognized means metric.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            Some("imperial") => Units::Imperial,
            _ => Units::Metric,
        }
    }
}

/// Temperature display preference of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TempUnit {
    #[default]
    C,
    F,
}

/// Countries whose locale implies Fahrenheit.
const FAHRENHEIT_COUNTRIES: &[&str] = &["US", "BS", "KY", "LR", "PW", "FM", "MH"];

impl TempUnit {
    /// Derive the unit from a locale tag such as `en-US` or `en_US.UTF-8`.
    pub fn from_locale(locale: &str) -> Self {
        let tag = locale.split('.').next().unwrap_or_default();
        let country = tag.split(['-', '_']).nth(1).map(str::to_uppercase);

        match country {
            Some(code) if FAHRENHEIT_COUNTRIES.contains(&code.as_str()) => TempUnit::F,
            _ => TempUnit::C,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TempUnit::C => "°C",
            TempUnit::F => "°F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One calendar day's outlook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: String,
    pub day: String,
    pub temp: i32,
    pub temp_f: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_min_f: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_max: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_max_f: Option<i32>,
    pub condition: Condition,
    pub precipitation: u8,
}

impl ForecastDay {
    /// Representative temperature in the requested unit.
    pub fn temp_in(&self, unit: TempUnit) -> i32 {
        match unit {
            TempUnit::C => self.temp,
            TempUnit::F => self.temp_f,
        }
    }

    /// Daily (min, max) in the requested unit, when the provider supplied them.
    pub fn range_in(&self, unit: TempUnit) -> Option<(i32, i32)> {
        match unit {
            TempUnit::C => self.temp_min.zip(self.temp_max),
            TempUnit::F => self.temp_min_f.zip(self.temp_max_f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub location: String,
    pub forecast: Vec<ForecastDay>,
}

/// Rounds halves toward positive infinity, so `-2.5` becomes `-2`.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

pub fn celsius_to_fahrenheit(celsius: i32) -> i32 {
    round_half_up(f64::from(celsius) * 9.0 / 5.0 + 32.0)
}

/// Display label for a date, e.g. `Oct 19`.
pub fn date_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Abbreviated weekday, e.g. `Mon`.
pub fn weekday_label(date: NaiveDate) -> String {
    date.format("%a").to_string()
}
