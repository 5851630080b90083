//! Toolset-equipped agent that answers through an inner pair of agents.
//!
//! The inner assistant talks to the model and decides which tools to call;
//! the inner proxy only executes them. Every reply starts from a clean slate:
//! the caller's conversation is replayed into the assistant, the latest
//! message is sent through the proxy, and whichever side produced the
//! substantive answer is returned.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use ensemble_core::types::Message;
use ensemble_providers::traits::{LlmProvider, LlmRequestConfig};

use crate::conversable::{ConversableAgent, LlmBinding};
use crate::error::AgentError;
use crate::toolset::{Toolset, ToolsetRegistry};
use crate::tools::ToolContext;

pub const DEFAULT_PROMPT: &str = "You are a helpful AI Assistant.";
pub const DEFAULT_DESCRIPTION: &str = "A helpful AI Assistant.";

/// Optional overrides for [`ApiAgent::new`].
#[derive(Clone, Debug, Default)]
pub struct AgentOptions {
    pub system_message: Option<String>,
    pub description: Option<String>,
    /// Falls back to the provider's default model.
    pub model: Option<String>,
    pub request: LlmRequestConfig,
}

pub struct ApiAgent {
    name: String,
    system_message: String,
    description: String,
    toolsets: Vec<String>,
    context: Arc<ToolContext>,
    assistant: ConversableAgent,
    proxy: ConversableAgent,
    /// Conversations with outside callers, keyed by sender.
    history: HashMap<String, Vec<Message>>,
}

impl ApiAgent {
    /// Build the agent and register every tool of the named toolsets.
    ///
    /// With exactly one toolset, its prompt and agent description replace
    /// the defaults unless overridden in `options`.
    pub fn new(
        name: impl Into<String>,
        toolsets: &[String],
        registry: &ToolsetRegistry,
        options: AgentOptions,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self, AgentError> {
        let name = name.into();
        let resolved: Vec<Arc<Toolset>> = toolsets
            .iter()
            .map(|n| registry.find(n))
            .collect::<Result<_, _>>()?;

        let main_set = match resolved.as_slice() {
            [only] => Some(only),
            _ => None,
        };
        let system_message = options
            .system_message
            .filter(|s| !s.is_empty())
            .or_else(|| main_set.map(|t| t.agent_system_prompt.clone()))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_PROMPT.to_string());
        let description = options
            .description
            .filter(|s| !s.is_empty())
            .or_else(|| main_set.map(|t| t.agent_description.clone()))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        let context = Arc::new(ToolContext::new(name.clone()));
        let llm = LlmBinding::new(provider, options.model).with_config(options.request);

        let assistant = ConversableAgent::new(format!("{name}_inner_assistant"), &system_message)
            .with_llm(llm)
            .with_context(context.clone());
        let proxy = ConversableAgent::new(format!("{name}_inner_user_proxy"), "")
            .with_context(context.clone());

        let mut agent = Self {
            name,
            system_message,
            description,
            toolsets: toolsets.to_vec(),
            context,
            assistant,
            proxy,
            history: HashMap::new(),
        };
        for toolset in &resolved {
            agent.register_toolset(toolset)?;
        }

        info!(
            agent = %agent.name,
            toolsets = ?agent.toolsets,
            tools = agent.assistant.llm_tools().len(),
            "api agent ready"
        );
        Ok(agent)
    }

    fn register_toolset(&mut self, toolset: &Toolset) -> Result<(), AgentError> {
        toolset.initialize(&self.context)?;

        for tool in &toolset.tools {
            if self.proxy.has_function(tool.name()) {
                debug!(tool = tool.name(), toolset = %toolset.name, "tool already registered, skipping");
                continue;
            }
            if tool.description().trim().is_empty() {
                return Err(AgentError::MissingToolDescription(tool.name().to_string()));
            }
            self.assistant.register_for_llm(tool.to_definition());
            self.proxy.register_for_execution(tool.clone());
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn toolsets(&self) -> &[String] {
        &self.toolsets
    }

    pub fn context(&self) -> &Arc<ToolContext> {
        &self.context
    }

    pub fn model(&self) -> Option<&str> {
        self.assistant.llm().map(|l| l.model.as_str())
    }

    /// Names of the tools offered to the model.
    pub fn tool_names(&self) -> Vec<&str> {
        self.assistant
            .llm_tools()
            .iter()
            .map(|d| d.function.name.as_str())
            .collect()
    }

    /// Conversation recorded with `sender`.
    pub fn chat_history(&self, sender: &str) -> &[Message] {
        self.history
            .get(sender)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Forget every recorded conversation.
    pub fn reset(&mut self) {
        self.history.clear();
        self.assistant.reset();
        self.proxy.reset();
    }

    /// Reply to the last of `messages` (or of the history kept for `sender`).
    ///
    /// Returns the tool output when the model asked for tools, the model's
    /// own text otherwise.
    pub async fn generate_api_reply(
        &mut self,
        messages: Option<&[Message]>,
        sender: &str,
    ) -> Result<Option<String>, AgentError> {
        let messages: Vec<Message> = match messages {
            Some(m) => m.to_vec(),
            None => self.chat_history(sender).to_vec(),
        };
        let Some((latest, earlier)) = messages.split_last() else {
            return Err(AgentError::EmptyConversation);
        };

        self.proxy.reset();
        self.assistant.reset();

        let assistant_name = self.assistant.name().to_string();
        let proxy_name = self.proxy.name().to_string();
        self.assistant.set_chat_messages(&proxy_name, earlier.to_vec());

        let text = latest.text().unwrap_or_default();
        self.proxy.send(text, &mut self.assistant, true).await?;

        let agent_reply = self.proxy.chat_messages(&assistant_name).last().cloned();
        let proxy_reply = self.proxy.generate_reply(&assistant_name).await?;

        if proxy_reply.is_default() {
            debug!(agent = %self.name, "no tool call, returning model text");
            Ok(agent_reply.and_then(|m| m.text().map(str::to_string)))
        } else {
            debug!(agent = %self.name, "returning tool output");
            Ok(proxy_reply.content())
        }
    }

    /// Record `content` from `sender`, reply, and record the reply.
    pub async fn receive(
        &mut self,
        content: &str,
        sender: &str,
    ) -> Result<Option<String>, AgentError> {
        self.history
            .entry(sender.to_string())
            .or_default()
            .push(Message::user_from(sender, content));

        let reply = self.generate_api_reply(None, sender).await?;

        if let Some(text) = &reply {
            self.history
                .entry(sender.to_string())
                .or_default()
                .push(Message::assistant(text.clone()));
        }
        Ok(reply)
    }
}

impl std::fmt::Debug for ApiAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiAgent")
            .field("name", &self.name)
            .field("toolsets", &self.toolsets)
            .field("assistant", &self.assistant)
            .field("proxy", &self.proxy)
            .finish()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversable::tests::{MockProvider, UpperTool};
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    fn registry_with(tools: Vec<Arc<dyn Tool>>) -> ToolsetRegistry {
        let mut registry = ToolsetRegistry::new();
        registry.register(Toolset {
            name: "text".into(),
            description: "Text utilities".into(),
            agent_description: "Knows text tricks.".into(),
            agent_system_prompt: "You transform text.".into(),
            preferred_llm: "mistral".into(),
            tools,
            init: None,
        });
        registry
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_toolset_supplies_prompt_and_description() {
        let registry = registry_with(vec![Arc::new(UpperTool)]);
        let provider = Arc::new(MockProvider::new(vec![]));
        let agent = ApiAgent::new(
            "helper",
            &names(&["text"]),
            &registry,
            AgentOptions::default(),
            provider,
        )
        .unwrap();

        assert_eq!(agent.system_message(), "You transform text.");
        assert_eq!(agent.description(), "Knows text tricks.");
        assert_eq!(agent.tool_names(), vec!["upper"]);
        assert_eq!(agent.model(), Some("mock-model"));
    }

    #[test]
    fn test_defaults_without_toolsets_and_explicit_override() {
        let registry = registry_with(vec![]);
        let provider = Arc::new(MockProvider::new(vec![]));

        let plain = ApiAgent::new("a", &[], &registry, AgentOptions::default(), provider.clone())
            .unwrap();
        assert_eq!(plain.system_message(), DEFAULT_PROMPT);
        assert_eq!(plain.description(), DEFAULT_DESCRIPTION);

        let options = AgentOptions {
            system_message: Some("Custom.".into()),
            ..Default::default()
        };
        let custom = ApiAgent::new("b", &names(&["text"]), &registry, options, provider).unwrap();
        assert_eq!(custom.system_message(), "Custom.");
        assert_eq!(custom.description(), "Knows text tricks.");
    }

    #[test]
    fn test_unknown_toolset_rejected() {
        let registry = registry_with(vec![]);
        let err = ApiAgent::new(
            "a",
            &names(&["nonexistent"]),
            &registry,
            AgentOptions::default(),
            Arc::new(MockProvider::new(vec![])),
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::ToolsetNotFound(ref n) if n == "nonexistent"));
    }

    #[test]
    fn test_tool_without_description_rejected() {
        struct Undocumented;

        #[async_trait]
        impl Tool for Undocumented {
            fn name(&self) -> &str {
                "mystery"
            }
            fn description(&self) -> &str {
                ""
            }
            fn parameters(&self) -> Value {
                json!({"type": "object", "properties": {}})
            }
            async fn execute(
                &self,
                _ctx: &ToolContext,
                _params: HashMap<String, Value>,
            ) -> anyhow::Result<String> {
                Ok(String::new())
            }
        }

        let registry = registry_with(vec![Arc::new(Undocumented)]);
        let err = ApiAgent::new(
            "a",
            &names(&["text"]),
            &registry,
            AgentOptions::default(),
            Arc::new(MockProvider::new(vec![])),
        )
        .unwrap_err();
        assert!(matches!(err, AgentError::MissingToolDescription(ref n) if n == "mystery"));
    }

    #[test]
    fn test_duplicate_tool_names_skipped() {
        let mut registry = registry_with(vec![Arc::new(UpperTool)]);
        registry.register(Toolset {
            name: "more-text".into(),
            description: String::new(),
            agent_description: String::new(),
            agent_system_prompt: String::new(),
            preferred_llm: String::new(),
            tools: vec![Arc::new(UpperTool)],
            init: None,
        });

        let agent = ApiAgent::new(
            "a",
            &names(&["text", "more-text"]),
            &registry,
            AgentOptions::default(),
            Arc::new(MockProvider::new(vec![])),
        )
        .unwrap();
        assert_eq!(agent.tool_names(), vec!["upper"]);
        assert_eq!(agent.system_message(), DEFAULT_PROMPT);
    }

    #[tokio::test]
    async fn test_no_tool_call_returns_model_text() {
        let registry = registry_with(vec![Arc::new(UpperTool)]);
        let provider = Arc::new(MockProvider::new(vec![MockProvider::text("Hi there!")]));
        let mut agent = ApiAgent::new(
            "helper",
            &names(&["text"]),
            &registry,
            AgentOptions::default(),
            provider.clone(),
        )
        .unwrap();

        let history = vec![
            Message::user("earlier question"),
            Message::assistant("earlier answer"),
            Message::user("hello"),
        ];
        let reply = agent.generate_api_reply(Some(&history), "user").await.unwrap();
        assert_eq!(reply.as_deref(), Some("Hi there!"));

        // System prompt + two replayed messages + the forwarded latest one.
        let calls = provider.calls.lock().unwrap();
        let (sent, tool_count) = &calls[0];
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0], Message::system("You transform text."));
        assert_eq!(sent[1].text(), Some("earlier question"));
        assert_eq!(sent[3].text(), Some("hello"));
        assert_eq!(*tool_count, 1);
    }

    #[tokio::test]
    async fn test_tool_call_returns_tool_output() {
        let registry = registry_with(vec![Arc::new(UpperTool)]);
        let provider = Arc::new(MockProvider::new(vec![MockProvider::tool_call(
            "upper",
            json!({"text": "sofia"}),
        )]));
        let mut agent = ApiAgent::new(
            "helper",
            &names(&["text"]),
            &registry,
            AgentOptions::default(),
            provider.clone(),
        )
        .unwrap();

        let reply = agent.receive("shout sofia", "user").await.unwrap();
        assert_eq!(reply.as_deref(), Some("SOFIA"));
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
        assert_eq!(agent.chat_history("user").len(), 2);
    }

    #[tokio::test]
    async fn test_receive_uses_recorded_history() {
        let registry = registry_with(vec![]);
        let provider = Arc::new(MockProvider::new(vec![
            MockProvider::text("first"),
            MockProvider::text("second"),
        ]));
        let mut agent = ApiAgent::new(
            "helper",
            &[],
            &registry,
            AgentOptions::default(),
            provider.clone(),
        )
        .unwrap();

        agent.receive("one", "alice").await.unwrap();
        agent.receive("two", "alice").await.unwrap();

        let calls = provider.calls.lock().unwrap();
        // Second call: system + "one" + "first" + "two".
        assert_eq!(calls[1].0.len(), 4);
        assert_eq!(calls[1].0[2].text(), Some("first"));
        assert!(agent.chat_history("bob").is_empty());
    }

    #[tokio::test]
    async fn test_spaced_agent_name_is_sent_as_valid_wire_name() {
        let registry = registry_with(vec![]);
        let provider = Arc::new(MockProvider::new(vec![MockProvider::text("Sunny.")]));
        let mut agent = ApiAgent::new(
            "Weather Bot",
            &[],
            &registry,
            AgentOptions::default(),
            provider.clone(),
        )
        .unwrap();
        assert_eq!(agent.name(), "Weather Bot");

        let reply = agent.receive("hello", "front desk").await.unwrap();
        assert_eq!(reply.as_deref(), Some("Sunny."));

        let calls = provider.calls.lock().unwrap();
        let forwarded = serde_json::to_value(calls[0].0.last().unwrap()).unwrap();
        assert_eq!(
            forwarded,
            json!({"role": "user", "content": "hello", "name": "Weather_Bot_inner_user_proxy"})
        );
        for message in &calls[0].0 {
            let json = serde_json::to_value(message).unwrap();
            if let Some(name) = json.get("name").and_then(Value::as_str) {
                assert!(name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
            }
        }
    }

    #[tokio::test]
    async fn test_model_tool_call_without_tools_returns_error_text() {
        let registry = registry_with(vec![]);
        let provider = Arc::new(MockProvider::new(vec![MockProvider::tool_call(
            "get_current_weather",
            json!({"location": "Sofia"}),
        )]));
        let mut agent =
            ApiAgent::new("helper", &[], &registry, AgentOptions::default(), provider).unwrap();

        let reply = agent.receive("weather in Sofia?", "user").await.unwrap();
        assert_eq!(
            reply.as_deref(),
            Some("Error: Tool 'get_current_weather' not found")
        );
    }

    #[tokio::test]
    async fn test_empty_conversation() {
        let registry = registry_with(vec![]);
        let mut agent = ApiAgent::new(
            "helper",
            &[],
            &registry,
            AgentOptions::default(),
            Arc::new(MockProvider::new(vec![])),
        )
        .unwrap();
        let err = agent.generate_api_reply(None, "nobody").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyConversation));
    }

    #[tokio::test]
    async fn test_llm_failure_is_an_error() {
        let registry = registry_with(vec![]);
        let provider = Arc::new(MockProvider::new(vec![
            ensemble_core::types::LlmResponse::error("Error calling LLM: 503"),
        ]));
        let mut agent =
            ApiAgent::new("helper", &[], &registry, AgentOptions::default(), provider).unwrap();
        let err = agent.receive("hi", "user").await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }
}
