//! OpenWeatherMap integration.
//!
//! - [`client::OpenWeatherMapApi`]: raw endpoint access with typed responses
//! - [`provider::OpenWeatherMapProvider`]: location lookups for agent tools
//! - [`conditions`]: condition code and icon tables

pub mod client;
pub mod conditions;
pub mod provider;
pub mod types;

pub use client::OpenWeatherMapApi;
pub use conditions::{Condition, Icon};
pub use provider::{OpenWeatherMapProvider, WeatherProvider};
pub use types::{ExcludeInfo, Units, SUPPORTED_LANGUAGES};

use ensemble_core::config::schema::WeatherConfig;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("geocoding limit must be at most 5, got {0}")]
    GeocodeLimit(u8),

    #[error("could not find location: {0}")]
    LocationNotFound(String),

    #[error("response has no {0} block")]
    MissingBlock(&'static str),

    #[error("missing OpenWeatherMap API key (set tools.weather.apiKey or OPENWEATHERMAP_API_KEY)")]
    MissingApiKey,

    #[error("invalid units: {0}")]
    InvalidUnits(String),

    #[error("OpenWeatherMap returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Build a provider from the `tools.weather` config section.
pub fn provider_from_config(config: &WeatherConfig) -> Result<OpenWeatherMapProvider, WeatherError> {
    let api_key = config.resolved_api_key().ok_or(WeatherError::MissingApiKey)?;
    let units: Units = config.units.parse().map_err(WeatherError::InvalidUnits)?;
    let mut api = OpenWeatherMapApi::new(api_key, units, &config.language)?;
    if let Some(base) = &config.api_base {
        api = api.with_api_base(base.as_str());
    }
    Ok(OpenWeatherMapProvider::new(api).with_alerts(config.alerts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WeatherConfig {
        WeatherConfig {
            api_key: "owm-key".into(),
            api_base: Some("http://localhost:9999/".into()),
            units: "imperial".into(),
            language: "bg".into(),
            alerts: true,
        }
    }

    #[test]
    fn test_provider_from_config() {
        let provider = provider_from_config(&config()).unwrap();
        assert_eq!(provider.api().units(), Units::Imperial);
        assert_eq!(provider.api().language(), "bg");
    }

    #[test]
    fn test_provider_from_config_rejects_bad_units() {
        let cfg = WeatherConfig {
            units: "kelvin".into(),
            ..config()
        };
        assert!(matches!(
            provider_from_config(&cfg),
            Err(WeatherError::InvalidUnits(_))
        ));
    }

    #[test]
    fn test_provider_from_config_rejects_bad_language() {
        let cfg = WeatherConfig {
            language: "tlh".into(),
            ..config()
        };
        assert!(matches!(
            provider_from_config(&cfg),
            Err(WeatherError::UnsupportedLanguage(_))
        ));
    }
}
