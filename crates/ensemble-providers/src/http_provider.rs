//! Generic HTTP LLM provider for OpenAI-compatible `/chat/completions` APIs.
//!
//! Covers every backend in the registry (OpenAI, Mistral, Groq, Ollama,
//! LiteLLM, OpenRouter) as well as ad-hoc endpoints stored as model records.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, error, warn};

use ensemble_core::store::ModelRecord;
use ensemble_core::types::{
    ChatCompletionRequest, ChatCompletionResponse, LlmResponse, Message, ToolDefinition,
};

use crate::registry::{resolve_model_name, ProviderConfig, ProviderSpec};
use crate::traits::{LlmProvider, LlmRequestConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// LLM provider speaking the OpenAI chat completions protocol over `reqwest`.
pub struct HttpProvider {
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.mistral.ai/v1"`).
    api_base: String,
    api_key: String,
    default_model: String,
    extra_headers: HeaderMap,
    display_name: String,
    /// Registry entry, absent for ad-hoc endpoints.
    spec: Option<&'static ProviderSpec>,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .field("provider", &self.display_name)
            .finish()
    }
}

impl HttpProvider {
    /// Provider for a registry entry, with the user's config applied.
    pub fn new(config: &ProviderConfig, spec: &'static ProviderSpec, model: &str) -> Self {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| spec.default_api_base.to_string());

        HttpProvider {
            client: build_client(),
            api_base,
            api_key: spec.resolve_api_key(config),
            default_model: model.to_string(),
            extra_headers: header_map(config.extra_headers.as_ref()),
            display_name: spec.display_name.to_string(),
            spec: Some(spec),
        }
    }

    /// Provider for an arbitrary OpenAI-compatible endpoint.
    pub fn for_endpoint(api_base: &str, api_key: &str, model: &str) -> Self {
        HttpProvider {
            client: build_client(),
            api_base: api_base.to_string(),
            api_key: api_key.to_string(),
            default_model: model.to_string(),
            extra_headers: HeaderMap::new(),
            display_name: "Custom".to_string(),
            spec: None,
        }
    }

    /// Provider bound to a stored model record.
    pub fn from_record(record: &ModelRecord) -> Self {
        let mut provider = Self::for_endpoint(&record.base_url, &record.api_key, &record.model);
        provider.display_name = record.name.clone();
        provider
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    fn resolve_model(&self, model: &str) -> String {
        match self.spec {
            Some(spec) => resolve_model_name(model, spec),
            None => model.to_string(),
        }
    }
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default HTTP client");
            reqwest::Client::new()
        })
}

fn header_map(headers: Option<&HashMap<String, String>>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (key, value) in headers.into_iter().flatten() {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(val)) => {
                map.insert(name, val);
            }
            _ => warn!("Invalid header: {}={}", key, value),
        }
    }
    map
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> LlmResponse {
        let resolved_model = self.resolve_model(model);
        // Some servers reject an empty tools array.
        let tools = tools.filter(|t| !t.is_empty());

        debug!(
            provider = %self.display_name,
            model = %resolved_model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Calling LLM"
        );

        let request_body = ChatCompletionRequest {
            model: resolved_model,
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
            tool_choice: tools.map(|_| "auto".to_string()),
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
        };

        let mut request = self
            .client
            .post(self.completions_url())
            .headers(self.extra_headers.clone())
            .json(&request_body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!(provider = %self.display_name, error = %e, "HTTP request failed");
                return LlmResponse::error(format!("Error calling LLM: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                provider = %self.display_name,
                status = %status,
                body = %error_text,
                "API error"
            );
            return LlmResponse::error(format!("Error calling LLM: {}: {}", status, error_text));
        }

        match response.json::<ChatCompletionResponse>().await {
            Ok(chat_resp) => {
                let llm_resp: LlmResponse = chat_resp.into();
                debug!(
                    provider = %self.display_name,
                    has_content = llm_resp.content.is_some(),
                    tool_calls = llm_resp.tool_calls.len(),
                    finish_reason = llm_resp.finish_reason.as_deref().unwrap_or("?"),
                    "LLM response received"
                );
                llm_resp
            }
            Err(e) => {
                error!(provider = %self.display_name, error = %e, "Failed to parse LLM response");
                LlmResponse::error(format!("Error parsing LLM response: {}", e))
            }
        }
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

// ─────────────────────────────────────────────
// Builder (convenience)
// ─────────────────────────────────────────────

/// Build an `HttpProvider` for `model` from the configured providers.
pub fn create_provider(
    model: &str,
    providers: &HashMap<String, ProviderConfig>,
) -> anyhow::Result<HttpProvider> {
    let (config, spec) = crate::registry::match_provider(model, providers).ok_or_else(|| {
        anyhow!(
            "No configured provider found for model '{}'. \
             Set an API key (e.g. OPENAI_API_KEY, MISTRAL_API_KEY) or an Ollama/LiteLLM apiBase.",
            model
        )
    })?;

    debug!(
        provider = spec.display_name,
        model = model,
        api_base = config.api_base.as_deref().unwrap_or(spec.default_api_base),
        "Creating LLM provider"
    );

    Ok(HttpProvider::new(&config, spec, model))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
