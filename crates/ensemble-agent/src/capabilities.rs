//! Optional abilities the builder can attach to generated agents.

use std::sync::Arc;

use chrono::Local;
use tracing::debug;

use crate::conversable::ConversableAgent;
use crate::error::AgentError;
use crate::toolset::Toolset;

/// Something that can be bolted onto an existing agent.
pub trait Capability: Send + Sync {
    /// Name offered to the builder model; selection matches it exactly.
    fn name(&self) -> &str;

    fn add_to_agent(&self, agent: &mut ConversableAgent) -> Result<(), AgentError>;
}

// ─────────────────────────────────────────────
// Toolset
// ─────────────────────────────────────────────

/// Gives an agent every tool of a toolset, both to call and to execute.
pub struct ToolsetCapability {
    name: String,
    toolset: Arc<Toolset>,
}

impl ToolsetCapability {
    /// Named after the toolset, e.g. `weather` → `WeatherCapability`.
    pub fn new(toolset: Arc<Toolset>) -> Self {
        let mut chars = toolset.name.chars();
        let name = match chars.next() {
            Some(first) => format!("{}{}Capability", first.to_uppercase(), chars.as_str()),
            None => "Capability".to_string(),
        };
        Self { name, toolset }
    }
}

impl Capability for ToolsetCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_to_agent(&self, agent: &mut ConversableAgent) -> Result<(), AgentError> {
        self.toolset.initialize(agent.context())?;

        for tool in &self.toolset.tools {
            if agent.has_function(tool.name()) {
                continue;
            }
            if tool.description().trim().is_empty() {
                return Err(AgentError::MissingToolDescription(tool.name().to_string()));
            }
            agent.register_for_llm(tool.to_definition());
            agent.register_for_execution(tool.clone());
        }

        let prompt = format!(
            "{}\n\nYou have access to {} tools: {}.",
            agent.system_message(),
            self.toolset.name,
            self.toolset.description
        );
        agent.update_system_message(prompt);
        debug!(agent = agent.name(), capability = %self.name, "capability attached");
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Date awareness
// ─────────────────────────────────────────────

/// Tells the agent today's date.
#[derive(Debug, Default)]
pub struct DateAwarenessCapability;

impl Capability for DateAwarenessCapability {
    fn name(&self) -> &str {
        "DateAwarenessCapability"
    }

    fn add_to_agent(&self, agent: &mut ConversableAgent) -> Result<(), AgentError> {
        let today = Local::now().format("%Y-%m-%d (%A)");
        let prompt = format!("{}\n\nToday's date is {today}.", agent.system_message());
        agent.update_system_message(prompt);
        Ok(())
    }
}
