//! Toolsets: named bundles of tools plus the prompts an agent built around
//! them should use.
//!
//! The registry is an ordered list. Lookup is a linear scan; the first
//! toolset with a matching name wins.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::AgentError;
use crate::tools::{Tool, ToolContext};

/// Called once per agent before the toolset's tools are registered on it.
pub type ToolsetInit = Arc<dyn Fn(&ToolContext) -> anyhow::Result<()> + Send + Sync>;

pub struct Toolset {
    /// Lookup key.
    pub name: String,
    pub description: String,
    /// Description for an agent that only carries this toolset.
    pub agent_description: String,
    /// System prompt for an agent that only carries this toolset.
    pub agent_system_prompt: String,
    /// Model family the prompts were tuned for.
    pub preferred_llm: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub init: Option<ToolsetInit>,
}

impl Toolset {
    /// Run the initializer, if any.
    pub fn initialize(&self, ctx: &ToolContext) -> Result<(), AgentError> {
        let Some(init) = &self.init else {
            return Ok(());
        };
        debug!(toolset = %self.name, agent = ctx.agent_name(), "initializing toolset");
        init(ctx).map_err(|e| AgentError::ToolsetInit {
            name: self.name.clone(),
            reason: format!("{e:#}"),
        })
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

impl std::fmt::Debug for Toolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolset")
            .field("name", &self.name)
            .field("preferred_llm", &self.preferred_llm)
            .field("tools", &self.tool_names())
            .field("has_init", &self.init.is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Toolsets available to agent constructors.
#[derive(Debug, Default)]
pub struct ToolsetRegistry {
    toolsets: Vec<Arc<Toolset>>,
}

impl ToolsetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a toolset. A duplicate name is kept but never found.
    pub fn register(&mut self, toolset: Toolset) -> Arc<Toolset> {
        if self.toolsets.iter().any(|t| t.name == toolset.name) {
            warn!(toolset = %toolset.name, "toolset name already registered, lookups keep the first");
        }
        let toolset = Arc::new(toolset);
        self.toolsets.push(toolset.clone());
        toolset
    }

    pub fn find(&self, name: &str) -> Result<Arc<Toolset>, AgentError> {
        self.toolsets
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| AgentError::ToolsetNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Toolset>> {
        self.toolsets.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.toolsets.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.toolsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toolsets.is_empty()
    }
}
