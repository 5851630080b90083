//! Errors raised while assembling or running agents.

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Toolset {0} not found")]
    ToolsetNotFound(String),

    #[error("Tool {0} must have a description")]
    MissingToolDescription(String),

    #[error("initializing toolset {name} failed: {reason}")]
    ToolsetInit { name: String, reason: String },

    #[error("builder model proposed no agents for: {0}")]
    EmptyRoster(String),

    #[error("no message to reply to")]
    EmptyConversation,

    #[error("LLM call failed: {0}")]
    Llm(String),
}
