//! HTTP client for the One Call 3.0 and geocoding endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use super::types::{
    is_supported_language, DaySummaryResponse, ExcludeInfo, GeocodeResponse, OneCallResponse,
    OverviewResponse, TimemachineResponse, Units,
};
use super::WeatherError;

pub const DEFAULT_API_BASE: &str = "https://api.openweathermap.org";

/// Most results the geocoding endpoint returns.
pub const MAX_GEOCODE_LIMIT: u8 = 5;

/// Client bound to one API key, unit system and language.
///
/// Every request carries `appid`, `units` and `lang`.
#[derive(Clone)]
pub struct OpenWeatherMapApi {
    client: reqwest::Client,
    api_key: String,
    units: Units,
    language: String,
    api_base: String,
}

impl std::fmt::Debug for OpenWeatherMapApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherMapApi")
            .field("api_base", &self.api_base)
            .field("units", &self.units)
            .field("language", &self.language)
            .finish()
    }
}

impl OpenWeatherMapApi {
    /// Fails with `UnsupportedLanguage` unless `language` is in
    /// [`SUPPORTED_LANGUAGES`](super::SUPPORTED_LANGUAGES).
    pub fn new(
        api_key: impl Into<String>,
        units: Units,
        language: &str,
    ) -> Result<Self, WeatherError> {
        if !is_supported_language(language) {
            return Err(WeatherError::UnsupportedLanguage(language.to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            units,
            language: language.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the client at another host (proxies, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.api_base, path);
        debug!(url = %url, params = query.len(), "openweathermap request");

        let resp = self
            .client
            .get(&url)
            .query(query)
            .query(&[
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
                ("lang", self.language.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, path = path, "openweathermap API error");
            return Err(WeatherError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<T>().await?)
    }

    /// Current conditions and forecasts; `exclude` drops whole blocks.
    pub async fn one_call(
        &self,
        lat: f64,
        lon: f64,
        exclude: &[ExcludeInfo],
    ) -> Result<OneCallResponse, WeatherError> {
        let exclude = exclude
            .iter()
            .map(ExcludeInfo::as_str)
            .collect::<Vec<_>>()
            .join(",");
        self.get(
            "/data/3.0/onecall",
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("exclude", exclude),
            ],
        )
        .await
    }

    /// Historical data for one moment.
    pub async fn timemachine(
        &self,
        lat: f64,
        lon: f64,
        dt: DateTime<Utc>,
    ) -> Result<TimemachineResponse, WeatherError> {
        self.get(
            "/data/3.0/onecall/timemachine",
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("dt", dt.timestamp().to_string()),
            ],
        )
        .await
    }

    /// Aggregates for one calendar day.
    pub async fn day_summary(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
    ) -> Result<DaySummaryResponse, WeatherError> {
        self.get(
            "/data/3.0/onecall/day_summary",
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
            ],
        )
        .await
    }

    /// Human-readable weather summary for today.
    pub async fn overview(&self, lat: f64, lon: f64) -> Result<OverviewResponse, WeatherError> {
        self.get(
            "/data/3.0/onecall/overview",
            &[("lat", lat.to_string()), ("lon", lon.to_string())],
        )
        .await
    }

    /// Resolve a place name; `limit` must not exceed [`MAX_GEOCODE_LIMIT`].
    pub async fn geocode(
        &self,
        query: &str,
        limit: u8,
    ) -> Result<Vec<GeocodeResponse>, WeatherError> {
        if limit > MAX_GEOCODE_LIMIT {
            return Err(WeatherError::GeocodeLimit(limit));
        }
        self.get(
            "/geo/1.0/direct",
            &[("q", query.to_string()), ("limit", limit.to_string())],
        )
        .await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> OpenWeatherMapApi {
        OpenWeatherMapApi::new("owm-key", Units::Metric, "en")
            .unwrap()
            .with_api_base(server.uri())
    }

    #[test]
    fn test_unsupported_language() {
        let err = OpenWeatherMapApi::new("k", Units::Metric, "klingon").unwrap_err();
        assert!(matches!(err, WeatherError::UnsupportedLanguage(ref l) if l == "klingon"));
    }

    #[tokio::test]
    async fn test_geocode_limit_checked_before_request() {
        let server = MockServer::start().await;
        let err = api(&server).geocode("Sofia", 6).await.unwrap_err();
        assert!(matches!(err, WeatherError::GeocodeLimit(6)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_geocode_sends_common_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Sofia"))
            .and(query_param("limit", "5"))
            .and(query_param("appid", "owm-key"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Sofia", "lat": 42.6977, "lon": 23.3219, "country": "BG"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let hits = api(&server).geocode("Sofia", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].country, "BG");
    }

    #[tokio::test]
    async fn test_one_call_exclude_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .and(query_param("lat", "42.5"))
            .and(query_param("lon", "23.25"))
            .and(query_param("exclude", "minutely,hourly,daily"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lat": 42.5, "lon": 23.25, "timezone": "Europe/Sofia", "timezone_offset": 10800
            })))
            .mount(&server)
            .await;

        let resp = api(&server)
            .one_call(
                42.5,
                23.25,
                &[ExcludeInfo::Minutely, ExcludeInfo::Hourly, ExcludeInfo::Daily],
            )
            .await
            .unwrap();
        assert_eq!(resp.timezone, "Europe/Sofia");
        assert!(resp.current.is_none());
    }

    #[tokio::test]
    async fn test_timemachine_and_day_summary_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall/timemachine"))
            .and(query_param("dt", "1718000000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lat": 1.0, "lon": 2.0, "timezone": "UTC", "timezone_offset": 0,
                "data": [{
                    "dt": 1718000000, "temp": 18.0, "feels_like": 17.5, "pressure": 1010,
                    "humidity": 70, "dew_point": 12.0, "clouds": 75,
                    "wind_speed": 2.0, "wind_deg": 90,
                    "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}]
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall/day_summary"))
            .and(query_param("date", "2024-06-10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lat": 1.0, "lon": 2.0, "tz": "+00:00", "date": "2024-06-10", "units": "metric",
                "cloud_cover": {"afternoon": 0}, "humidity": {"afternoon": 40},
                "precipitation": {"total": 0}, "pressure": {"afternoon": 1015},
                "temperature": {"min": 10, "max": 20, "afternoon": 19, "night": 11, "evening": 15, "morning": 12},
                "wind": {"max": {"speed": 4, "direction": 200}}
            })))
            .mount(&server)
            .await;

        let client = api(&server);
        let dt = DateTime::from_timestamp(1718000000, 0).unwrap();
        let history = client.timemachine(1.0, 2.0, dt).await.unwrap();
        assert_eq!(history.data[0].weather[0].main, "Clouds");

        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let summary = client.day_summary(1.0, 2.0, date).await.unwrap();
        assert_eq!(summary.temperature.max, 20.0);
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall/overview"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let err = api(&server).overview(1.0, 2.0).await.unwrap_err();
        match err {
            WeatherError::Api { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Invalid API key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
