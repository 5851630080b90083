//! Persisted record types.
//!
//! Integer ids are assigned by [`Store`](super::Store) on insert; the `id`
//! value passed in is ignored. Commands use UUIDs so they can be referenced
//! before they are persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UsageInfo;

// ─────────────────────────────────────────────
// LLM model configuration
// ─────────────────────────────────────────────

/// An LLM endpoint agents can be bound to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecord {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    /// Model identifier sent to the endpoint (e.g. `mistral`).
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
    #[serde(default)]
    pub input_price_1k: f64,
    #[serde(default)]
    pub output_price_1k: f64,
}

impl ModelRecord {
    /// Price of one completion's token usage.
    pub fn cost(&self, usage: &UsageInfo) -> f64 {
        f64::from(usage.prompt_tokens) / 1000.0 * self.input_price_1k
            + f64::from(usage.completion_tokens) / 1000.0 * self.output_price_1k
    }
}

// ─────────────────────────────────────────────
// Agents and sessions
// ─────────────────────────────────────────────

/// A stored agent profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    /// Cleared when the referenced model is deleted.
    #[serde(default)]
    pub model_id: Option<u64>,
    /// Toolset path, e.g. `weather` or `weather,datetime`.
    pub path: String,
    #[serde(default)]
    pub description_override: String,
    #[serde(default)]
    pub prompt_override: String,
    /// Extra constructor arguments.
    #[serde(default)]
    pub init_kwargs: serde_json::Value,
}

impl AgentRecord {
    /// Toolset names encoded in `path`.
    pub fn toolsets(&self) -> Vec<String> {
        self.path
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(&self.description_override)
    }

    pub fn system_prompt(&self) -> Option<&str> {
        non_empty(&self.prompt_override)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub agent_ids: Vec<u64>,
    #[serde(default)]
    pub group_chat: bool,
}

/// One message spoken by an agent within a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    #[serde(default)]
    pub id: u64,
    pub session_id: u64,
    pub agent_id: u64,
    pub time: DateTime<Utc>,
    pub content: String,
}

/// A file attached to a message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFile {
    #[serde(default)]
    pub id: u64,
    pub message_id: u64,
    pub file: String,
}

// ─────────────────────────────────────────────
// Command audit trail
// ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandStatus {
    #[default]
    Pending,
    Approved,
    Executed,
    Reverted,
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CommandStatus::Pending => "PENDING",
            CommandStatus::Approved => "APPROVED",
            CommandStatus::Executed => "EXECUTED",
            CommandStatus::Reverted => "REVERTED",
        };
        f.write_str(label)
    }
}

/// The row a command operates on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandTarget {
    pub app: String,
    /// Record kind, e.g. `Agent`.
    pub model: String,
    pub pk: Option<String>,
}

impl CommandTarget {
    pub fn new(app: impl Into<String>, model: impl Into<String>, pk: Option<String>) -> Self {
        Self {
            app: app.into(),
            model: model.into(),
            pk,
        }
    }
}

/// Audit record of a requested state change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status: CommandStatus,
    pub tag: String,
    #[serde(default)]
    pub previous_command: Option<Uuid>,
    pub command: String,
    pub target_app: String,
    pub target_model: String,
    #[serde(default)]
    pub target_pk: Option<String>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

impl CommandRecord {
    /// New PENDING record.
    pub fn new(
        command: impl Into<String>,
        tag: impl Into<String>,
        target: CommandTarget,
        payload: Option<serde_json::Value>,
        previous_command: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            status: CommandStatus::Pending,
            tag: tag.into(),
            previous_command,
            command: command.into(),
            target_app: target.app,
            target_model: target.model,
            target_pk: target.pk,
            payload,
        }
    }

    pub fn target(&self) -> CommandTarget {
        CommandTarget::new(&self.target_app, &self.target_model, self.target_pk.clone())
    }
}
