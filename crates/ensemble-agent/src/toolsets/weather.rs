//! Weather toolset: current conditions and forecasts by location name.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use ensemble_core::config::schema::WeatherConfig;
use ensemble_providers::openweathermap::{provider_from_config, WeatherProvider};

use crate::toolset::Toolset;
use crate::tools::{require_string, Tool, ToolContext};

pub const NAME: &str = "weather";

/// Weather client attached to an agent's [`ToolContext`].
#[derive(Clone)]
pub struct WeatherState {
    pub provider: Arc<dyn WeatherProvider>,
}

/// Toolset backed by OpenWeatherMap. The client is created on first use by
/// each agent from `config`, unless the agent already carries one.
pub fn toolset(config: WeatherConfig) -> Toolset {
    let init = move |ctx: &ToolContext| -> anyhow::Result<()> {
        if ctx.contains::<WeatherState>() {
            return Ok(());
        }
        let provider = provider_from_config(&config)?;
        ctx.insert(WeatherState {
            provider: Arc::new(provider),
        })
    };

    Toolset {
        name: NAME.to_string(),
        description: "Enables access to current and forecast weather data".to_string(),
        agent_description: "A helpful assistant with access to weather data. Ask them to tell \
                            you about the current or forecast weather."
            .to_string(),
        agent_system_prompt: "You are a helpful AI assistant with access to weather data (via \
                              the provided functions). In fact, your only job is to lookup the \
                              weather, so please help out where you can."
            .to_string(),
        preferred_llm: "mistral".to_string(),
        tools: vec![
            Arc::new(WeatherTool::Current),
            Arc::new(WeatherTool::Hourly),
            Arc::new(WeatherTool::Daily),
        ],
        init: Some(Arc::new(init)),
    }
}

/// The three lookups share a shape; only the provider call differs.
#[derive(Clone, Copy, Debug)]
pub enum WeatherTool {
    Current,
    Hourly,
    Daily,
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        match self {
            WeatherTool::Current => "get_current_weather",
            WeatherTool::Hourly => "get_hourly_forecast",
            WeatherTool::Daily => "get_daily_forecast",
        }
    }

    fn description(&self) -> &str {
        match self {
            WeatherTool::Current => {
                "Get the current weather for a location. Returns temperature (Celsius), \
                 wind speed (m/s), the weather condition and any precipitation."
            }
            WeatherTool::Hourly => "Get the hour-by-hour weather forecast for the next 48 hours.",
            WeatherTool::Daily => "Get the day-by-day weather forecast for the next 8 days.",
        }
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name, optionally with country code (e.g. 'Sofia, BG')"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        params: HashMap<String, Value>,
    ) -> anyhow::Result<String> {
        let location = require_string(&params, "location")?;
        let state = ctx
            .get::<WeatherState>()
            .ok_or_else(|| anyhow::anyhow!("weather toolset not initialized for {}", ctx.agent_name()))?;

        let value = match self {
            WeatherTool::Current => state.provider.current(&location).await?,
            WeatherTool::Hourly => state.provider.forecast_hourly(&location).await?,
            WeatherTool::Daily => state.provider.forecast_daily(&location).await?,
        };
        Ok(serde_json::to_string(&value)?)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
