//! Tool registry: executable functions of one agent, keyed by name.

use std::collections::HashMap;
use std::sync::Arc;

use ensemble_core::types::ToolDefinition;
use tracing::{debug, warn};

use super::base::Tool;
use super::context::ToolContext;

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name and dispatches calls.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Overwrites any previous tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        debug!(tool = tool.name(), "registered tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools, sorted for determinism.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// LLM-facing definitions for all registered tools.
    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    /// Execute a tool by name.
    ///
    /// The model always gets a `String` back, even on failure.
    pub async fn execute(
        &self,
        name: &str,
        ctx: &ToolContext,
        params: HashMap<String, serde_json::Value>,
    ) -> String {
        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => {
                warn!(tool = name, "tool not found");
                return format!("Error: Tool '{name}' not found");
            }
        };

        match tool.execute(ctx, params).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, agent = ctx.agent_name(), error = %e, "tool execution failed");
                format!("Error executing {name}: {e}")
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to echo" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            ctx: &ToolContext,
            params: HashMap<String, serde_json::Value>,
        ) -> anyhow::Result<String> {
            let text = params
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or("(empty)");
            Ok(format!("{} says: {text}", ctx.agent_name()))
        }
    }

    struct FailTool;

    #[async_trait]
    impl Tool for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}, "required": []})
        }
        async fn execute(
            &self,
            _ctx: &ToolContext,
            _params: HashMap<String, serde_json::Value>,
        ) -> anyhow::Result<String> {
            anyhow::bail!("intentional failure")
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        assert!(reg.has("echo"));
        assert!(!reg.has("nope"));
        assert_eq!(reg.len(), 1);
        assert!(reg.get("echo").is_some());
    }

    #[test]
    fn test_names_and_definitions_sorted() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.tool_names(), vec!["echo", "fail"]);
        let defs = reg.get_definitions();
        assert_eq!(defs[0].function.name, "echo");
        assert_eq!(defs[1].function.name, "fail");
    }

    #[tokio::test]
    async fn test_execute_passes_context() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let ctx = ToolContext::new("helper");
        let mut params = HashMap::new();
        params.insert("text".into(), json!("hello"));
        assert_eq!(reg.execute("echo", &ctx, params).await, "helper says: hello");
    }

    #[tokio::test]
    async fn test_execute_not_found() {
        let reg = ToolRegistry::default();
        let ctx = ToolContext::new("helper");
        let result = reg.execute("missing", &ctx, HashMap::new()).await;
        assert_eq!(result, "Error: Tool 'missing' not found");
    }

    #[tokio::test]
    async fn test_execute_error_caught() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(FailTool));
        let ctx = ToolContext::new("helper");
        let result = reg.execute("fail", &ctx, HashMap::new()).await;
        assert!(result.starts_with("Error executing fail:"));
        assert!(result.contains("intentional failure"));
    }
}
