//! LLM provider trait.
//!
//! Every chat backend implements this trait. `HttpProvider` covers all
//! OpenAI-compatible APIs; tests substitute scripted implementations.

use async_trait::async_trait;
use ensemble_core::config::schema::AgentDefaults;
use ensemble_core::types::{LlmResponse, Message, ToolDefinition};

/// Sampling parameters passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl From<&AgentDefaults> for LlmRequestConfig {
    fn from(defaults: &AgentDefaults) -> Self {
        Self {
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages`: Conversation in OpenAI format.
    /// * `tools`: Tool definitions the model may call.
    /// * `model`: Model identifier (e.g. `"mistral"`, `"gpt-4o"`).
    /// * `config`: Temperature, max_tokens.
    ///
    /// On transport or API errors this returns `LlmResponse::error(...)`
    /// instead of propagating.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> LlmResponse;

    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
