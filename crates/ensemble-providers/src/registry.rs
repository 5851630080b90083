//! Provider registry: static specs for the supported LLM backends.
//!
//! Each `ProviderSpec` describes how to reach one backend: keywords for
//! model matching, the env var holding its key, and its default endpoint.
//! All of them speak the OpenAI chat completions protocol.

use std::collections::HashMap;

pub use ensemble_core::config::schema::ProviderConfig;

/// Static specification describing one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Internal name, also the key under `providers` in the config.
    pub name: &'static str,
    /// Lowercase keywords matched against model names.
    pub keywords: &'static [&'static str],
    /// Environment variable consulted when the config has no key.
    pub env_key: &'static str,
    pub display_name: &'static str,
    /// Gateways route any model and are used as a last resort.
    pub is_gateway: bool,
    /// Self-hosted servers that accept any (or no) key.
    pub is_local: bool,
    pub default_api_base: &'static str,
}

impl ProviderSpec {
    /// Whether `config` (or the environment) makes this provider usable.
    pub fn is_usable(&self, config: &ProviderConfig) -> bool {
        if self.is_local {
            return true;
        }
        config.is_configured() || self.env_api_key().is_some()
    }

    /// API key from config, falling back to `env_key`. Local providers get
    /// a placeholder so the bearer header stays well formed.
    pub fn resolve_api_key(&self, config: &ProviderConfig) -> String {
        if config.is_configured() {
            return config.api_key.clone();
        }
        match self.env_api_key() {
            Some(key) => key,
            None if self.is_local => "not-needed".to_string(),
            None => String::new(),
        }
    }

    fn env_api_key(&self) -> Option<String> {
        std::env::var(self.env_key).ok().filter(|k| !k.is_empty())
    }
}

/// Supported providers, in matching priority order.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        name: "openai",
        keywords: &["openai", "gpt"],
        env_key: "OPENAI_API_KEY",
        display_name: "OpenAI",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.openai.com/v1",
    },
    ProviderSpec {
        name: "mistral",
        keywords: &["mistral", "mixtral", "codestral"],
        env_key: "MISTRAL_API_KEY",
        display_name: "Mistral",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.mistral.ai/v1",
    },
    ProviderSpec {
        name: "groq",
        keywords: &["groq"],
        env_key: "GROQ_API_KEY",
        display_name: "Groq",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.groq.com/openai/v1",
    },
    ProviderSpec {
        name: "ollama",
        keywords: &["ollama", "llama", "phi", "gemma"],
        env_key: "OLLAMA_API_KEY",
        display_name: "Ollama",
        is_gateway: false,
        is_local: true,
        default_api_base: "http://localhost:11434/v1",
    },
    ProviderSpec {
        name: "litellm",
        keywords: &["litellm"],
        env_key: "LITELLM_API_KEY",
        display_name: "LiteLLM",
        is_gateway: false,
        is_local: true,
        default_api_base: "http://localhost:4000",
    },
    ProviderSpec {
        name: "openrouter",
        keywords: &["openrouter"],
        env_key: "OPENROUTER_API_KEY",
        display_name: "OpenRouter",
        is_gateway: true,
        is_local: false,
        default_api_base: "https://openrouter.ai/api/v1",
    },
];

/// First non-gateway provider whose keywords appear in `model`.
pub fn find_by_model(model: &str) -> Option<&'static ProviderSpec> {
    let model_lower = model.to_lowercase();
    PROVIDERS.iter().find(|spec| {
        !spec.is_gateway && spec.keywords.iter().any(|kw| model_lower.contains(kw))
    })
}

pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|spec| spec.name == name)
}

/// Model name as sent on the wire: an explicit `<provider>/` routing prefix
/// naming `spec` is removed (`ollama/mistral` → `mistral`).
pub fn resolve_model_name(model: &str, spec: &ProviderSpec) -> String {
    model
        .strip_prefix(spec.name)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(model)
        .to_string()
}

/// Match a model name to a usable provider.
///
/// 1. An explicit `<provider>/` prefix wins.
/// 2. Keyword match, if that provider is usable.
/// 3. First local provider with an explicit `apiBase` in the config.
/// 4. First usable gateway.
pub fn match_provider(
    model: &str,
    providers: &HashMap<String, ProviderConfig>,
) -> Option<(ProviderConfig, &'static ProviderSpec)> {
    let config_for = |spec: &ProviderSpec| providers.get(spec.name).cloned().unwrap_or_default();

    if let Some((prefix, _)) = model.split_once('/') {
        if let Some(spec) = find_by_name(prefix) {
            let config = config_for(spec);
            if spec.is_usable(&config) {
                return Some((config, spec));
            }
        }
    }

    if let Some(spec) = find_by_model(model) {
        let config = config_for(spec);
        if spec.is_usable(&config) && (!spec.is_local || config.api_base.is_some()) {
            return Some((config, spec));
        }
    }

    let local = PROVIDERS.iter().filter(|s| s.is_local).find_map(|spec| {
        providers
            .get(spec.name)
            .filter(|c| c.api_base.is_some())
            .map(|c| (c.clone(), spec))
    });
    if local.is_some() {
        return local;
    }

    PROVIDERS.iter().filter(|s| s.is_gateway).find_map(|spec| {
        let config = config_for(spec);
        spec.is_usable(&config).then_some((config, spec))
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(key: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: key.to_string(),
            ..Default::default()
        }
    }

    fn based(base: &str) -> ProviderConfig {
        ProviderConfig {
            api_base: Some(base.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_by_model() {
        assert_eq!(find_by_model("gpt-4o-mini").unwrap().name, "openai");
        assert_eq!(find_by_model("mistral-large-latest").unwrap().name, "mistral");
        assert_eq!(find_by_model("open-mixtral-8x7b").unwrap().name, "mistral");
        assert_eq!(find_by_model("llama3.1:8b").unwrap().name, "ollama");
        assert!(find_by_model("unknown-model").is_none());
    }

    #[test]
    fn test_find_by_model_skips_gateways() {
        assert!(find_by_model("openrouter").is_none());
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(find_by_name("litellm").unwrap().display_name, "LiteLLM");
        assert!(find_by_name("anthropic").is_none());
    }

    #[test]
    fn test_resolve_model_name_strips_own_prefix() {
        let ollama = find_by_name("ollama").unwrap();
        assert_eq!(resolve_model_name("ollama/mistral", ollama), "mistral");
        assert_eq!(resolve_model_name("mistral", ollama), "mistral");
        assert_eq!(resolve_model_name("ollamax/mistral", ollama), "ollamax/mistral");

        let openrouter = find_by_name("openrouter").unwrap();
        assert_eq!(
            resolve_model_name("mistralai/mistral-7b", openrouter),
            "mistralai/mistral-7b"
        );
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        let litellm = find_by_name("litellm").unwrap();
        let config = ProviderConfig::default();
        assert!(litellm.is_usable(&config));
        assert_eq!(litellm.resolve_api_key(&config), "not-needed");
    }

    #[test]
    fn test_match_by_keyword_with_key() {
        let mut providers = HashMap::new();
        providers.insert("mistral".to_string(), keyed("ms-123"));
        let (config, spec) = match_provider("mistral-small", &providers).unwrap();
        assert_eq!(spec.name, "mistral");
        assert_eq!(config.api_key, "ms-123");
    }

    #[test]
    fn test_match_explicit_prefix() {
        let providers = HashMap::new();
        let (_, spec) = match_provider("litellm/mistral", &providers).unwrap();
        assert_eq!(spec.name, "litellm");
    }

    #[test]
    fn test_match_falls_back_to_configured_local() {
        let mut providers = HashMap::new();
        providers.insert("ollama".to_string(), based("http://gpu-box:11434/v1"));
        let (config, spec) = match_provider("some-finetune", &providers).unwrap();
        assert_eq!(spec.name, "ollama");
        assert_eq!(config.api_base.as_deref(), Some("http://gpu-box:11434/v1"));
    }

    #[test]
    fn test_match_falls_back_to_gateway() {
        let mut providers = HashMap::new();
        providers.insert("openrouter".to_string(), keyed("sk-or-abc"));
        let (_, spec) = match_provider("some-finetune", &providers).unwrap();
        assert_eq!(spec.name, "openrouter");
    }
}
