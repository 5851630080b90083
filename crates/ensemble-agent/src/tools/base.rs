//! Tool trait: the interface every toolset function implements.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use ensemble_core::types::ToolDefinition;

use super::context::ToolContext;

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The decision-making agent sends `to_definition()` to the model; the
/// executing agent dispatches calls via `execute()`, passing the context of
/// the agent that owns the tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used by the LLM to call this tool (e.g. `"get_current_weather"`).
    fn name(&self) -> &str;

    /// Human-readable description shown to the LLM. Must not be empty.
    fn description(&self) -> &str;

    /// JSON Schema describing the parameters (as a `serde_json::Value`).
    ///
    /// Must be `{"type": "object", "properties": {...}, "required": [...]}`.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    ///
    /// Returns the tool output as a string (the LLM reads this). Errors are
    /// turned into an error string by the registry.
    async fn execute(&self, ctx: &ToolContext, params: HashMap<String, Value>)
        -> anyhow::Result<String>;

    /// Build the `ToolDefinition` sent to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Extract a required `String` param, returning a user-friendly error.
pub fn require_string(params: &HashMap<String, Value>, key: &str) -> anyhow::Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

/// Extract an optional `String` param.
pub fn optional_string(params: &HashMap<String, Value>, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}
