//! Request options and typed responses of the OpenWeatherMap One Call 3.0
//! and geocoding APIs.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Request options
// ─────────────────────────────────────────────

/// Unit system for temperatures and wind speeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Kelvin, m/s.
    Standard,
    /// Celsius, m/s.
    #[default]
    Metric,
    /// Fahrenheit, mph.
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Units::Standard),
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(format!("unknown units '{other}'")),
        }
    }
}

/// Blocks that can be left out of a One Call response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExcludeInfo {
    Current,
    Minutely,
    Hourly,
    Daily,
    Alerts,
}

impl ExcludeInfo {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExcludeInfo::Current => "current",
            ExcludeInfo::Minutely => "minutely",
            ExcludeInfo::Hourly => "hourly",
            ExcludeInfo::Daily => "daily",
            ExcludeInfo::Alerts => "alerts",
        }
    }
}

/// Language codes accepted by the `lang` parameter.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "sq", "af", "ar", "az", "eu", "be", "bg", "ca", "zh_cn", "zh_tw", "hr", "cz", "da", "nl",
    "en", "fi", "fr", "gl", "de", "el", "he", "hi", "hu", "is", "id", "it", "ja", "kr", "ku",
    "la", "lt", "mk", "no", "fa", "pl", "pt", "pt_br", "ro", "ru", "sr", "sk", "sl", "sp", "sv",
    "th", "tr", "ua", "vi", "zu",
];

pub fn is_supported_language(code: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&code)
}

// ─────────────────────────────────────────────
// Shared pieces
// ─────────────────────────────────────────────

/// One entry of a `weather` array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherDetails {
    /// Condition code, see [`Condition`](super::Condition).
    pub id: u32,
    /// Condition group, e.g. `Rain`.
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// Rain or snow volume.
///
/// Current and hourly entries report `{"1h": mm}`; daily entries a plain total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Precipitation {
    LastHour {
        #[serde(rename = "1h", default)]
        one_h: Option<f64>,
    },
    Total(f64),
}

impl Precipitation {
    /// Millimetres per hour worth reporting, if any.
    pub fn mm_per_h(&self) -> Option<f64> {
        match self {
            Precipitation::LastHour { one_h } => *one_h,
            Precipitation::Total(total) if *total > 0.0 => Some(*total),
            Precipitation::Total(_) => None,
        }
    }
}

// ─────────────────────────────────────────────
// One Call
// ─────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Current {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub dt: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub sunrise: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub sunset: Option<DateTime<Utc>>,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub dew_point: f64,
    pub clouds: f64,
    pub uvi: f64,
    #[serde(default)]
    pub visibility: Option<f64>,
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_gust: Option<f64>,
    pub wind_deg: f64,
    #[serde(default)]
    pub rain: Option<Precipitation>,
    #[serde(default)]
    pub snow: Option<Precipitation>,
    #[serde(default)]
    pub weather: Vec<WeatherDetails>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Minutely {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub dt: DateTime<Utc>,
    pub precipitation: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Hourly {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub dt: DateTime<Utc>,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub dew_point: f64,
    pub uvi: f64,
    pub clouds: f64,
    #[serde(default)]
    pub visibility: Option<f64>,
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_gust: Option<f64>,
    pub wind_deg: f64,
    /// Probability of precipitation, 0–1.
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub rain: Option<Precipitation>,
    #[serde(default)]
    pub snow: Option<Precipitation>,
    #[serde(default)]
    pub weather: Vec<WeatherDetails>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DailyFeelsLike {
    pub morn: f64,
    pub day: f64,
    pub eve: f64,
    pub night: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DailyTemp {
    pub morn: f64,
    pub day: f64,
    pub eve: f64,
    pub night: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Daily {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub dt: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub sunrise: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub sunset: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub moonrise: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub moonset: Option<DateTime<Utc>>,
    pub moon_phase: f64,
    #[serde(default)]
    pub summary: Option<String>,
    pub temp: DailyTemp,
    pub feels_like: DailyFeelsLike,
    pub pressure: f64,
    pub humidity: f64,
    pub dew_point: f64,
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_gust: Option<f64>,
    pub wind_deg: f64,
    pub clouds: f64,
    pub uvi: f64,
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub rain: Option<Precipitation>,
    #[serde(default)]
    pub snow: Option<Precipitation>,
    #[serde(default)]
    pub weather: Vec<WeatherDetails>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Alert {
    pub sender_name: String,
    pub event: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub end: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `GET /data/3.0/onecall`. Blocks are absent when excluded.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct OneCallResponse {
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    pub timezone_offset: i32,
    #[serde(default)]
    pub current: Option<Current>,
    #[serde(default)]
    pub minutely: Option<Vec<Minutely>>,
    #[serde(default)]
    pub hourly: Option<Vec<Hourly>>,
    #[serde(default)]
    pub daily: Option<Vec<Daily>>,
    #[serde(default)]
    pub alerts: Option<Vec<Alert>>,
}

// ─────────────────────────────────────────────
// Timemachine, day summary, overview
// ─────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TimemachinePoint {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub dt: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub sunrise: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub sunset: Option<DateTime<Utc>>,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: f64,
    pub humidity: f64,
    pub dew_point: f64,
    #[serde(default)]
    pub uvi: f64,
    pub clouds: f64,
    #[serde(default)]
    pub visibility: Option<f64>,
    pub wind_speed: f64,
    pub wind_deg: f64,
    #[serde(default)]
    pub weather: Vec<WeatherDetails>,
}

/// `GET /data/3.0/onecall/timemachine`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TimemachineResponse {
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    pub timezone_offset: i32,
    pub data: Vec<TimemachinePoint>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Afternoon {
    pub afternoon: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PrecipitationTotal {
    pub total: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DayTemperature {
    pub min: f64,
    pub max: f64,
    pub afternoon: f64,
    pub night: f64,
    pub evening: f64,
    pub morning: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct WindDetails {
    pub speed: f64,
    pub direction: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DayWind {
    pub max: WindDetails,
}

/// `GET /data/3.0/onecall/day_summary`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DaySummaryResponse {
    pub lat: f64,
    pub lon: f64,
    #[serde(alias = "timezone")]
    pub tz: String,
    pub date: NaiveDate,
    pub units: Units,
    #[serde(alias = "clouds")]
    pub cloud_cover: Afternoon,
    pub humidity: Afternoon,
    pub precipitation: PrecipitationTotal,
    pub pressure: Afternoon,
    pub temperature: DayTemperature,
    pub wind: DayWind,
}

/// `GET /data/3.0/onecall/overview`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct OverviewResponse {
    pub lat: f64,
    pub lon: f64,
    #[serde(alias = "timezone")]
    pub tz: String,
    pub date: NaiveDate,
    pub units: Units,
    pub weather_overview: String,
}

// ─────────────────────────────────────────────
// Geocoding
// ─────────────────────────────────────────────

/// One match of `GET /geo/1.0/direct`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GeocodeResponse {
    pub name: String,
    #[serde(default)]
    pub local_names: Option<HashMap<String, String>>,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
