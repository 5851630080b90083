//! Ensemble Agent: toolsets, tool-dispatching agents and the agent builder.
//!
//! This crate contains:
//! - **tools**: Tool trait, per-agent context and the execution registry
//! - **toolset**: Named tool bundles with prompts and lazy initialization
//! - **conversable**: The two-party chat engine (LLM replies + tool execution)
//! - **api_agent**: An assistant/executor pair wrapped behind one reply call
//! - **builder**: Roster planning and capability attachment

pub mod api_agent;
pub mod builder;
pub mod capabilities;
pub mod conversable;
pub mod error;
pub mod tools;
pub mod toolset;
pub mod toolsets;

pub use api_agent::{AgentOptions, ApiAgent};
pub use builder::{AgentBuilder, AgentConfig, BuildConfig, CapabilityBuilder};
pub use capabilities::{Capability, DateAwarenessCapability, ToolsetCapability};
pub use conversable::{ConversableAgent, LlmBinding, Reply, ToolResponse};
pub use error::AgentError;
pub use tools::{Tool, ToolContext, ToolRegistry};
pub use toolset::{Toolset, ToolsetRegistry};
pub use toolsets::builtin_registry;
