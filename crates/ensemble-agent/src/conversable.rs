//! Minimal two-party agent engine.
//!
//! A [`ConversableAgent`] keeps one message log per peer. It can send a
//! message to another agent (optionally asking for one reply round), call
//! its LLM over a log, and execute tool calls found in the last message of
//! a log.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use ensemble_core::types::{Message, ToolDefinition};
use ensemble_providers::traits::{LlmProvider, LlmRequestConfig};

use crate::error::AgentError;
use crate::tools::{Tool, ToolContext, ToolRegistry};

/// The model an agent talks to.
#[derive(Clone)]
pub struct LlmBinding {
    pub provider: Arc<dyn LlmProvider>,
    pub model: String,
    pub config: LlmRequestConfig,
}

impl LlmBinding {
    /// Bind to `provider`, falling back to its default model.
    pub fn new(provider: Arc<dyn LlmProvider>, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| provider.default_model().to_string());
        Self {
            provider,
            model,
            config: LlmRequestConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LlmRequestConfig) -> Self {
        self.config = config;
        self
    }
}

// ─────────────────────────────────────────────
// Replies
// ─────────────────────────────────────────────

/// Output of one tool call.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolResponse {
    pub tool_call_id: String,
    pub content: String,
}

/// What an agent answers with.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Nothing to say: no model and no tool calls to run.
    Default,
    Message(Message),
    ToolResponses(Vec<ToolResponse>),
}

impl Reply {
    pub fn is_default(&self) -> bool {
        matches!(self, Reply::Default)
    }

    /// Text of the reply; tool outputs are joined with blank lines.
    pub fn content(&self) -> Option<String> {
        match self {
            Reply::Default => None,
            Reply::Message(msg) => msg.text().map(str::to_string),
            Reply::ToolResponses(responses) => Some(
                responses
                    .iter()
                    .map(|r| r.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
        }
    }

    /// The reply as logged by the agent that produced it.
    fn into_message(self) -> Option<Message> {
        match self {
            Reply::Default => None,
            Reply::Message(msg) => Some(msg),
            Reply::ToolResponses(_) => self.content().map(Message::assistant),
        }
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

pub struct ConversableAgent {
    name: String,
    system_message: String,
    description: String,
    llm: Option<LlmBinding>,
    /// Definitions offered to the model.
    llm_tools: Vec<ToolDefinition>,
    /// Functions this agent executes.
    function_map: ToolRegistry,
    context: Arc<ToolContext>,
    chat_messages: HashMap<String, Vec<Message>>,
}

impl ConversableAgent {
    pub fn new(name: impl Into<String>, system_message: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            context: Arc::new(ToolContext::new(name.clone())),
            name,
            system_message: system_message.into(),
            description: String::new(),
            llm: None,
            llm_tools: Vec::new(),
            function_map: ToolRegistry::new(),
            chat_messages: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_llm(mut self, llm: LlmBinding) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Run tools against `context` instead of this agent's own.
    pub fn with_context(mut self, context: Arc<ToolContext>) -> Self {
        self.context = context;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    pub fn update_system_message(&mut self, system_message: impl Into<String>) {
        self.system_message = system_message.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn llm(&self) -> Option<&LlmBinding> {
        self.llm.as_ref()
    }

    pub fn context(&self) -> &Arc<ToolContext> {
        &self.context
    }

    /// Offer a tool to the model.
    pub fn register_for_llm(&mut self, definition: ToolDefinition) {
        self.llm_tools.retain(|d| d.function.name != definition.function.name);
        self.llm_tools.push(definition);
    }

    /// Let this agent execute a tool.
    pub fn register_for_execution(&mut self, tool: Arc<dyn Tool>) {
        self.function_map.register(tool);
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.function_map.has(name)
    }

    pub fn llm_tools(&self) -> &[ToolDefinition] {
        &self.llm_tools
    }

    pub fn chat_messages(&self, peer: &str) -> &[Message] {
        self.chat_messages
            .get(peer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replace the log kept for `peer`.
    pub fn set_chat_messages(&mut self, peer: &str, messages: Vec<Message>) {
        self.chat_messages.insert(peer.to_string(), messages);
    }

    /// Forget every conversation.
    pub fn reset(&mut self) {
        self.chat_messages.clear();
    }

    /// Deliver `content` to `recipient`. With `request_reply`, the recipient
    /// answers once and the answer is logged on both sides.
    pub async fn send(
        &mut self,
        content: &str,
        recipient: &mut ConversableAgent,
        request_reply: bool,
    ) -> Result<(), AgentError> {
        self.push(&recipient.name, Message::assistant(content));
        recipient.push(&self.name, Message::user_from(&self.name, content));

        if !request_reply {
            return Ok(());
        }

        let reply = recipient.generate_reply(&self.name).await?;
        if let Some(message) = reply.into_message() {
            self.push(&recipient.name, received(&message, &recipient.name));
            recipient.push(&self.name, message);
        }
        Ok(())
    }

    /// Answer the last message in the log kept for `sender`.
    ///
    /// Pending tool calls are executed first; otherwise the model is asked.
    pub async fn generate_reply(&self, sender: &str) -> Result<Reply, AgentError> {
        let messages = self.chat_messages(sender);

        if let Some(responses) = self.generate_tool_calls_reply(messages).await {
            return Ok(Reply::ToolResponses(responses));
        }

        match &self.llm {
            Some(llm) => self.generate_oai_reply(llm, messages).await.map(Reply::Message),
            None => Ok(Reply::Default),
        }
    }

    async fn generate_oai_reply(
        &self,
        llm: &LlmBinding,
        history: &[Message],
    ) -> Result<Message, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.system_message.clone()));
        messages.extend_from_slice(history);

        let tools = (!self.llm_tools.is_empty()).then_some(self.llm_tools.as_slice());
        debug!(
            agent = %self.name,
            model = %llm.model,
            messages = messages.len(),
            tools = self.llm_tools.len(),
            "LLM call"
        );

        let response = llm
            .provider
            .chat(&messages, tools, &llm.model, &llm.config)
            .await;

        if response.is_error() {
            return Err(AgentError::Llm(response.content.unwrap_or_default()));
        }
        Ok(response.into_message(Some(self.name.clone())))
    }

    /// Run the tool calls of the last message. Calls naming a function this
    /// agent does not hold are answered with the registry's error text.
    async fn generate_tool_calls_reply(&self, messages: &[Message]) -> Option<Vec<ToolResponse>> {
        let calls = messages.last()?.tool_calls();
        if calls.is_empty() {
            return None;
        }

        let mut responses = Vec::with_capacity(calls.len());
        for call in calls {
            info!(agent = %self.name, tool = %call.function.name, "executing tool call");

            let content =
                match serde_json::from_str::<HashMap<String, serde_json::Value>>(&call.function.arguments) {
                    Ok(params) => {
                        self.function_map
                            .execute(&call.function.name, &self.context, params)
                            .await
                    }
                    Err(e) => format!(
                        "Error: arguments for {} must be a JSON object: {e}",
                        call.function.name
                    ),
                };

            debug!(tool = %call.function.name, result_len = content.len(), "tool result");
            responses.push(ToolResponse {
                tool_call_id: call.id.clone(),
                content,
            });
        }
        Some(responses)
    }

    fn push(&mut self, peer: &str, message: Message) {
        self.chat_messages
            .entry(peer.to_string())
            .or_default()
            .push(message);
    }
}

/// How a message from `from` looks in the receiver's log. Text becomes a
/// user turn; tool-call requests stay assistant turns so they can be run.
fn received(message: &Message, from: &str) -> Message {
    match message {
        Message::Assistant {
            content: Some(text),
            tool_calls: None,
            ..
        } => Message::user_from(from, text.clone()),
        other => other.clone(),
    }
}

impl std::fmt::Debug for ConversableAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversableAgent")
            .field("name", &self.name)
            .field("model", &self.llm.as_ref().map(|l| l.model.as_str()))
            .field("functions", &self.function_map.tool_names())
            .finish()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
