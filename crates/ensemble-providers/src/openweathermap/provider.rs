//! Location-based weather lookups returning compact JSON for tool output.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::client::{OpenWeatherMapApi, MAX_GEOCODE_LIMIT};
use super::types::{Alert, ExcludeInfo, Precipitation, WeatherDetails};
use super::WeatherError;

/// Weather lookups by free-form location name.
///
/// Each entry is `{temp_c, wind_meter_per_sec, weather, rain_mm_per_h?,
/// snow_mm_per_h?}`; forecasts wrap entries in `hourly` / `daily`.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: &str) -> Result<Value, WeatherError>;

    async fn forecast_hourly(&self, location: &str) -> Result<Value, WeatherError>;

    async fn forecast_daily(&self, location: &str) -> Result<Value, WeatherError>;
}

/// [`WeatherProvider`] backed by OpenWeatherMap, with a per-instance
/// location → (lat, lon) cache.
pub struct OpenWeatherMapProvider {
    api: OpenWeatherMapApi,
    alerts: bool,
    latlon_cache: Mutex<HashMap<String, (f64, f64)>>,
}

impl OpenWeatherMapProvider {
    pub fn new(api: OpenWeatherMapApi) -> Self {
        Self {
            api,
            alerts: false,
            latlon_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Include alert descriptions in the output.
    pub fn with_alerts(mut self, alerts: bool) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn api(&self) -> &OpenWeatherMapApi {
        &self.api
    }

    /// Coordinates of `location`, geocoded once per lowercased name.
    pub async fn latlon(&self, location: &str) -> Result<(f64, f64), WeatherError> {
        let key = location.to_lowercase();
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let matches = self.api.geocode(location, MAX_GEOCODE_LIMIT).await?;
        let first = matches
            .first()
            .ok_or_else(|| WeatherError::LocationNotFound(location.to_string()))?;
        let coords = (first.lat, first.lon);
        debug!(location = %location, lat = coords.0, lon = coords.1, "geocoded location");

        if let Ok(mut cache) = self.latlon_cache.lock() {
            cache.insert(key, coords);
        }
        Ok(coords)
    }

    fn cached(&self, key: &str) -> Option<(f64, f64)> {
        self.latlon_cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).copied())
    }

    fn attach_alerts(&self, target: &mut Map<String, Value>, alerts: Option<&[Alert]>) {
        if !self.alerts {
            return;
        }
        if let Some(alerts) = alerts.filter(|a| !a.is_empty()) {
            let descriptions: Vec<&str> = alerts.iter().map(|a| a.description.as_str()).collect();
            target.insert("alerts".into(), json!(descriptions));
        }
    }
}

fn format_entry(
    temp: f64,
    wind_speed: f64,
    weather: &[WeatherDetails],
    rain: Option<&Precipitation>,
    snow: Option<&Precipitation>,
) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert("temp_c".into(), json!(temp));
    entry.insert("wind_meter_per_sec".into(), json!(wind_speed));
    entry.insert(
        "weather".into(),
        json!(weather.first().map(|w| w.main.as_str()).unwrap_or("Unknown")),
    );
    if let Some(mm) = rain.and_then(Precipitation::mm_per_h) {
        entry.insert("rain_mm_per_h".into(), json!(mm));
    }
    if let Some(mm) = snow.and_then(Precipitation::mm_per_h) {
        entry.insert("snow_mm_per_h".into(), json!(mm));
    }
    entry
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    async fn current(&self, location: &str) -> Result<Value, WeatherError> {
        let (lat, lon) = self.latlon(location).await?;
        let resp = self
            .api
            .one_call(
                lat,
                lon,
                &[ExcludeInfo::Minutely, ExcludeInfo::Hourly, ExcludeInfo::Daily],
            )
            .await?;
        let current = resp
            .current
            .as_ref()
            .ok_or(WeatherError::MissingBlock("current"))?;

        let mut result = format_entry(
            current.temp,
            current.wind_speed,
            &current.weather,
            current.rain.as_ref(),
            current.snow.as_ref(),
        );
        self.attach_alerts(&mut result, resp.alerts.as_deref());
        Ok(Value::Object(result))
    }

    async fn forecast_hourly(&self, location: &str) -> Result<Value, WeatherError> {
        let (lat, lon) = self.latlon(location).await?;
        let resp = self
            .api
            .one_call(
                lat,
                lon,
                &[ExcludeInfo::Current, ExcludeInfo::Minutely, ExcludeInfo::Daily],
            )
            .await?;

        let hours: Vec<Value> = resp
            .hourly
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|h| {
                Value::Object(format_entry(
                    h.temp,
                    h.wind_speed,
                    &h.weather,
                    h.rain.as_ref(),
                    h.snow.as_ref(),
                ))
            })
            .collect();

        let mut result = Map::new();
        result.insert("hourly".into(), Value::Array(hours));
        self.attach_alerts(&mut result, resp.alerts.as_deref());
        Ok(Value::Object(result))
    }

    async fn forecast_daily(&self, location: &str) -> Result<Value, WeatherError> {
        let (lat, lon) = self.latlon(location).await?;
        let resp = self
            .api
            .one_call(
                lat,
                lon,
                &[ExcludeInfo::Current, ExcludeInfo::Minutely, ExcludeInfo::Hourly],
            )
            .await?;

        // Daily temps are a min/max/period record; report the daytime value.
        let days: Vec<Value> = resp
            .daily
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|d| {
                Value::Object(format_entry(
                    d.temp.day,
                    d.wind_speed,
                    &d.weather,
                    d.rain.as_ref(),
                    d.snow.as_ref(),
                ))
            })
            .collect();

        let mut result = Map::new();
        result.insert("daily".into(), Value::Array(days));
        self.attach_alerts(&mut result, resp.alerts.as_deref());
        Ok(Value::Object(result))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
