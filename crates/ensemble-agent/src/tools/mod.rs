//! Tool trait, per-agent tool context and the executable-tool registry.

pub mod base;
pub mod context;
pub mod registry;

pub use base::{optional_string, require_string, Tool};
pub use context::ToolContext;
pub use registry::ToolRegistry;
