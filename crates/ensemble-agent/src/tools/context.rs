//! Per-agent state handed to every tool call.
//!
//! Toolset initializers park their clients here (one value per type); tools
//! read them back when they run.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

/// Identity and private state of the agent that owns a tool.
pub struct ToolContext {
    agent_name: String,
    state: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ToolContext {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            state: RwLock::new(HashMap::new()),
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Store `value`, replacing any previous value of the same type.
    ///
    /// Fails when a tool panicked while holding the state lock.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> anyhow::Result<()> {
        let kind = std::any::type_name::<T>();
        let mut state = self.state.write().map_err(|_| {
            anyhow::anyhow!(
                "tool state of agent {} is poisoned, cannot attach {kind}",
                self.agent_name
            )
        })?;
        state.insert(TypeId::of::<T>(), Arc::new(value));
        debug!(agent = %self.agent_name, kind, "tool state attached");
        Ok(())
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let state = self.state.read().ok()?;
        let value = state.get(&TypeId::of::<T>())?.clone();
        value.downcast::<T>().ok()
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.state
            .read()
            .map(|state| state.contains_key(&TypeId::of::<T>()))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.state.read().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("ToolContext")
            .field("agent_name", &self.agent_name)
            .field("entries", &entries)
            .finish()
    }
}
