//! Config loader: reads `~/.ensemble/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.ensemble/config.json`
//! 3. Environment variables `ENSEMBLE_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from `path` (or the default path) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `ENSEMBLE_AGENTS__DEFAULTS__MODEL`, `..._MAX_TOKENS`, `..._TEMPERATURE`
/// - `ENSEMBLE_PROVIDERS__<NAME>__API_KEY` / `__API_BASE`
/// - `ENSEMBLE_TOOLS__WEATHER__API_KEY`, `..._UNITS`, `..._LANGUAGE`
/// - `ENSEMBLE_TRANSCRIPTION__API_KEY`, `ENSEMBLE_TRANSCRIPTION__MODEL`
/// - `ENSEMBLE_BUILDER__MODEL`
/// - `ENSEMBLE_PATCHES__REPO_PATH`
/// - `ENSEMBLE_STORE__PATH`
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("ENSEMBLE_AGENTS__DEFAULTS__MODEL") {
        config.agents.defaults.model = val;
    }
    if let Ok(val) = std::env::var("ENSEMBLE_AGENTS__DEFAULTS__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agents.defaults.max_tokens = n;
        }
    }
    if let Ok(val) = std::env::var("ENSEMBLE_AGENTS__DEFAULTS__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.agents.defaults.temperature = t;
        }
    }

    apply_provider_env(&mut config.providers.openai, "OPENAI");
    apply_provider_env(&mut config.providers.ollama, "OLLAMA");
    apply_provider_env(&mut config.providers.litellm, "LITELLM");
    apply_provider_env(&mut config.providers.openrouter, "OPENROUTER");
    apply_provider_env(&mut config.providers.groq, "GROQ");
    apply_provider_env(&mut config.providers.mistral, "MISTRAL");

    if let Ok(val) = std::env::var("ENSEMBLE_TOOLS__WEATHER__API_KEY") {
        config.tools.weather.api_key = val;
    }
    if let Ok(val) = std::env::var("ENSEMBLE_TOOLS__WEATHER__UNITS") {
        config.tools.weather.units = val;
    }
    if let Ok(val) = std::env::var("ENSEMBLE_TOOLS__WEATHER__LANGUAGE") {
        config.tools.weather.language = val;
    }

    if let Ok(val) = std::env::var("ENSEMBLE_TRANSCRIPTION__API_KEY") {
        config.transcription.api_key = val;
    }
    if let Ok(val) = std::env::var("ENSEMBLE_TRANSCRIPTION__MODEL") {
        config.transcription.model = val;
    }

    if let Ok(val) = std::env::var("ENSEMBLE_BUILDER__MODEL") {
        config.builder.model = val;
    }
    if let Ok(val) = std::env::var("ENSEMBLE_PATCHES__REPO_PATH") {
        config.patches.repo_path = val;
    }
    if let Ok(val) = std::env::var("ENSEMBLE_STORE__PATH") {
        config.store.path = val;
    }

    config
}

fn apply_provider_env(provider: &mut ProviderConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("ENSEMBLE_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("ENSEMBLE_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
