//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentsConfig`, `ProvidersConfig`, `ToolsConfig`,
//! `TranscriptionConfig`, `BuilderConfig`, `PatchesConfig`, `StoreConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::utils::expand_home;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration, loaded from `~/.ensemble/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agents: AgentsConfig,
    pub providers: ProvidersConfig,
    pub tools: ToolsConfig,
    pub transcription: TranscriptionConfig,
    pub builder: BuilderConfig,
    pub patches: PatchesConfig,
    pub store: StoreConfig,
}

// ─────────────────────────────────────────────
// Agents
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

/// Settings used when an agent is created without a stored profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentDefaults {
    /// Name the agent introduces itself with in multi-party chats.
    pub name: String,
    /// Default LLM model identifier.
    pub model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            name: "assistant".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Credentials and endpoint for one LLM backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Custom API base URL (overrides the registry default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub ollama: ProviderConfig,
    pub litellm: ProviderConfig,
    pub openrouter: ProviderConfig,
    pub groq: ProviderConfig,
    pub mistral: ProviderConfig,
}

impl ProvidersConfig {
    /// Provider config by registry name (e.g. `"ollama"`).
    pub fn get_by_name(&self, name: &str) -> Option<&ProviderConfig> {
        self.entries()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, cfg)| cfg)
    }

    fn entries(&self) -> [(&'static str, &ProviderConfig); 6] {
        [
            ("openai", &self.openai),
            ("ollama", &self.ollama),
            ("litellm", &self.litellm),
            ("openrouter", &self.openrouter),
            ("groq", &self.groq),
            ("mistral", &self.mistral),
        ]
    }

    /// Map of provider name → config, as consumed by the provider registry.
    pub fn to_map(&self) -> HashMap<String, ProviderConfig> {
        self.entries()
            .into_iter()
            .map(|(name, cfg)| (name.to_string(), cfg.clone()))
            .collect()
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    pub weather: WeatherConfig,
}

/// OpenWeatherMap settings for the weather toolset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeatherConfig {
    /// Falls back to `OPENWEATHERMAP_API_KEY` when empty.
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// `standard`, `metric` or `imperial`.
    pub units: String,
    pub language: String,
    /// Include alert descriptions in tool output.
    pub alerts: bool,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            units: "metric".to_string(),
            language: "en".to_string(),
            alerts: false,
        }
    }
}

impl WeatherConfig {
    /// Configured key, or the `OPENWEATHERMAP_API_KEY` environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var("OPENWEATHERMAP_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
    }
}

// ─────────────────────────────────────────────
// Transcription
// ─────────────────────────────────────────────

/// Speech-to-text settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionConfig {
    /// Bearer token; local servers usually need none.
    pub api_key: String,
    /// OpenAI-compatible base URL serving `/audio/transcriptions`.
    pub api_base: String,
    /// Whisper preset name (`tiny`, `base`, `small`, `medium`, `large`, `*.en`).
    pub model: String,
    /// Release the loaded model after each transcription.
    pub auto_close: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "http://localhost:8000/v1".to_string(),
            model: "base".to_string(),
            auto_close: true,
        }
    }
}

// ─────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────

/// Multi-agent builder settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuilderConfig {
    /// Model used to plan the roster and pick capabilities.
    pub model: String,
    /// Upper bound on generated agents.
    pub max_agents: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_agents: 5,
        }
    }
}

// ─────────────────────────────────────────────
// Patches
// ─────────────────────────────────────────────

/// Vendored-dependency patch workflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatchesConfig {
    /// Checkout of the patched dependency.
    pub repo_path: String,
    /// Directory holding the numbered `.diff` files.
    pub patches_path: String,
    pub git_url: String,
    pub target_tag: String,
    /// Run inside the checkout after patches are applied (e.g. `pip install -e .`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
    /// Run before a fresh setup to remove a previous install.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uninstall_command: Option<String>,
}

impl Default for PatchesConfig {
    fn default() -> Self {
        Self {
            repo_path: "~/.ensemble/vendor/autogen".to_string(),
            patches_path: "patches".to_string(),
            git_url: "https://github.com/microsoft/autogen.git".to_string(),
            target_tag: "v0.2.29".to_string(),
            install_command: None,
            uninstall_command: None,
        }
    }
}

impl PatchesConfig {
    pub fn repo_dir(&self) -> PathBuf {
        expand_home(&self.repo_path)
    }

    pub fn patches_dir(&self) -> PathBuf {
        expand_home(&self.patches_path)
    }
}

// ─────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Record store document path.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "~/.ensemble/store.json".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn file_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agents.defaults.max_tokens, 4096);
        assert_eq!(config.agents.defaults.temperature, 0.7);
        assert_eq!(config.tools.weather.units, "metric");
        assert_eq!(config.patches.target_tag, "v0.2.29");
        assert!(config.transcription.auto_close);
    }

    #[test]
    fn test_config_from_json_camel_case() {
        let json = serde_json::json!({
            "agents": {
                "defaults": { "model": "mistral", "maxTokens": 1024 }
            },
            "tools": {
                "weather": { "apiKey": "owm-123", "language": "de", "alerts": true }
            },
            "patches": { "repoPath": "/tmp/autogen", "targetTag": "v0.2.30" }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.agents.defaults.model, "mistral");
        assert_eq!(config.agents.defaults.max_tokens, 1024);
        assert_eq!(config.tools.weather.api_key, "owm-123");
        assert_eq!(config.tools.weather.language, "de");
        assert!(config.tools.weather.alerts);
        // Defaults preserved for missing fields
        assert_eq!(config.tools.weather.units, "metric");
        assert_eq!(config.patches.repo_dir(), PathBuf::from("/tmp/autogen"));
        assert_eq!(config.patches.target_tag, "v0.2.30");
        assert_eq!(
            config.patches.git_url,
            "https://github.com/microsoft/autogen.git"
        );
    }

    #[test]
    fn test_config_json_uses_camel_case() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert!(json["agents"]["defaults"].get("maxTokens").is_some());
        assert!(json["transcription"].get("autoClose").is_some());
        assert!(json["builder"].get("maxAgents").is_some());
        assert!(json["agents"]["defaults"].get("max_tokens").is_none());
    }

    #[test]
    fn test_providers_get_by_name() {
        let mut providers = ProvidersConfig::default();
        providers.mistral.api_key = "ms-123".to_string();

        assert!(providers.get_by_name("mistral").unwrap().is_configured());
        assert!(!providers.get_by_name("openai").unwrap().is_configured());
        assert!(providers.get_by_name("anthropic").is_none());
        assert_eq!(providers.to_map().len(), 6);
    }

    #[test]
    fn test_weather_key_prefers_config() {
        let cfg = WeatherConfig {
            api_key: "from-config".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.resolved_api_key().as_deref(), Some("from-config"));
    }

    #[test]
    fn test_empty_json_gives_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.agents.defaults.name, "assistant");
        assert_eq!(config.builder.max_agents, 5);
        assert!(config.store.file_path().ends_with("store.json"));
    }
}
