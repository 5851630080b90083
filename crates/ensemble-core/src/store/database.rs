//! JSON-document store with referential cleanup on delete.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::records::{
    AgentRecord, CommandRecord, CommandStatus, MessageFile, MessageRecord, ModelRecord,
    SessionRecord,
};
use super::StoreError;

const STORE_VERSION: u32 = 1;

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreData {
    version: u32,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    models: Vec<ModelRecord>,
    #[serde(default)]
    agents: Vec<AgentRecord>,
    #[serde(default)]
    sessions: Vec<SessionRecord>,
    #[serde(default)]
    messages: Vec<MessageRecord>,
    #[serde(default)]
    message_files: Vec<MessageFile>,
    #[serde(default)]
    commands: Vec<CommandRecord>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            next_id: 1,
            models: Vec::new(),
            agents: Vec::new(),
            sessions: Vec::new(),
            messages: Vec::new(),
            message_files: Vec::new(),
            commands: Vec::new(),
        }
    }
}

/// Record store bound to one JSON file.
///
/// Mutations only touch memory; call [`Store::save`] to persist.
pub struct Store {
    path: PathBuf,
    data: StoreData,
}

impl Store {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!(path = %path.display(), "no store file, starting empty");
            return Ok(Self {
                path,
                data: StoreData::default(),
            });
        }

        let raw = std::fs::read_to_string(&path)?;
        let mut data: StoreData = serde_json::from_str(&raw)?;
        if data.version != STORE_VERSION {
            return Err(StoreError::UnsupportedVersion(data.version));
        }
        data.next_id = data.next_id.max(data.max_id() + 1);

        info!(
            path = %path.display(),
            models = data.models.len(),
            agents = data.agents.len(),
            sessions = data.sessions.len(),
            commands = data.commands.len(),
            "loaded record store"
        );
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole document to disk.
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "saved record store");
        Ok(())
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.data.next_id.max(1);
        self.data.next_id = id + 1;
        id
    }

    // ─────────────────────────────────────────
    // Models
    // ─────────────────────────────────────────

    pub fn models(&self) -> &[ModelRecord] {
        &self.data.models
    }

    pub fn model(&self, id: u64) -> Option<&ModelRecord> {
        self.data.models.iter().find(|m| m.id == id)
    }

    pub fn model_by_name(&self, name: &str) -> Option<&ModelRecord> {
        self.data.models.iter().find(|m| m.name == name)
    }

    pub fn model_mut(&mut self, id: u64) -> Option<&mut ModelRecord> {
        self.data.models.iter_mut().find(|m| m.id == id)
    }

    pub fn add_model(&mut self, mut record: ModelRecord) -> u64 {
        record.id = self.allocate_id();
        let id = record.id;
        self.data.models.push(record);
        id
    }

    /// Delete a model; agents bound to it fall back to no model.
    pub fn delete_model(&mut self, id: u64) -> bool {
        let before = self.data.models.len();
        self.data.models.retain(|m| m.id != id);
        if self.data.models.len() == before {
            return false;
        }
        for agent in self.data.agents.iter_mut().filter(|a| a.model_id == Some(id)) {
            agent.model_id = None;
        }
        true
    }

    // ─────────────────────────────────────────
    // Agents
    // ─────────────────────────────────────────

    pub fn agents(&self) -> &[AgentRecord] {
        &self.data.agents
    }

    pub fn agent(&self, id: u64) -> Option<&AgentRecord> {
        self.data.agents.iter().find(|a| a.id == id)
    }

    pub fn agent_by_name(&self, name: &str) -> Option<&AgentRecord> {
        self.data.agents.iter().find(|a| a.name == name)
    }

    pub fn agent_mut(&mut self, id: u64) -> Option<&mut AgentRecord> {
        self.data.agents.iter_mut().find(|a| a.id == id)
    }

    pub fn add_agent(&mut self, mut record: AgentRecord) -> Result<u64, StoreError> {
        if let Some(model_id) = record.model_id {
            if self.model(model_id).is_none() {
                return Err(StoreError::not_found("model", model_id));
            }
        }
        record.id = self.allocate_id();
        let id = record.id;
        self.data.agents.push(record);
        Ok(id)
    }

    /// Delete an agent together with its messages and session memberships.
    pub fn delete_agent(&mut self, id: u64) -> bool {
        let before = self.data.agents.len();
        self.data.agents.retain(|a| a.id != id);
        if self.data.agents.len() == before {
            return false;
        }
        for session in &mut self.data.sessions {
            session.agent_ids.retain(|a| *a != id);
        }
        self.delete_messages_where(|m| m.agent_id == id);
        true
    }

    // ─────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.data.sessions
    }

    pub fn session(&self, id: u64) -> Option<&SessionRecord> {
        self.data.sessions.iter().find(|s| s.id == id)
    }

    pub fn session_by_name(&self, name: &str) -> Option<&SessionRecord> {
        self.data.sessions.iter().find(|s| s.name == name)
    }

    pub fn add_session(&mut self, mut record: SessionRecord) -> Result<u64, StoreError> {
        if let Some(missing) = record.agent_ids.iter().find(|id| self.agent(**id).is_none()) {
            return Err(StoreError::not_found("agent", missing));
        }
        record.id = self.allocate_id();
        let id = record.id;
        self.data.sessions.push(record);
        Ok(id)
    }

    /// Add `agent_id` to a session's members if it is not there yet.
    pub fn join_session(&mut self, session_id: u64, agent_id: u64) -> Result<(), StoreError> {
        if self.agent(agent_id).is_none() {
            return Err(StoreError::not_found("agent", agent_id));
        }
        let session = self
            .data
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| StoreError::not_found("session", session_id))?;
        if !session.agent_ids.contains(&agent_id) {
            session.agent_ids.push(agent_id);
        }
        Ok(())
    }

    /// Delete a session and every message spoken in it.
    pub fn delete_session(&mut self, id: u64) -> bool {
        let before = self.data.sessions.len();
        self.data.sessions.retain(|s| s.id != id);
        if self.data.sessions.len() == before {
            return false;
        }
        self.delete_messages_where(|m| m.session_id == id);
        true
    }

    // ─────────────────────────────────────────
    // Messages
    // ─────────────────────────────────────────

    pub fn add_message(
        &mut self,
        session_id: u64,
        agent_id: u64,
        content: impl Into<String>,
    ) -> Result<u64, StoreError> {
        if self.session(session_id).is_none() {
            return Err(StoreError::not_found("session", session_id));
        }
        if self.agent(agent_id).is_none() {
            return Err(StoreError::not_found("agent", agent_id));
        }
        let id = self.allocate_id();
        self.data.messages.push(MessageRecord {
            id,
            session_id,
            agent_id,
            time: Utc::now(),
            content: content.into(),
        });
        Ok(id)
    }

    /// Messages of a session in insertion order.
    pub fn session_messages(&self, session_id: u64) -> Vec<&MessageRecord> {
        self.data
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .collect()
    }

    pub fn delete_message(&mut self, id: u64) -> bool {
        self.delete_messages_where(|m| m.id == id) > 0
    }

    fn delete_messages_where(&mut self, pred: impl Fn(&MessageRecord) -> bool) -> usize {
        let doomed: Vec<u64> = self
            .data
            .messages
            .iter()
            .filter(|m| pred(m))
            .map(|m| m.id)
            .collect();
        if doomed.is_empty() {
            return 0;
        }
        self.data.messages.retain(|m| !doomed.contains(&m.id));
        self.data
            .message_files
            .retain(|f| !doomed.contains(&f.message_id));
        doomed.len()
    }

    pub fn add_message_file(
        &mut self,
        message_id: u64,
        file: impl Into<String>,
    ) -> Result<u64, StoreError> {
        if !self.data.messages.iter().any(|m| m.id == message_id) {
            return Err(StoreError::not_found("message", message_id));
        }
        let id = self.allocate_id();
        self.data.message_files.push(MessageFile {
            id,
            message_id,
            file: file.into(),
        });
        Ok(id)
    }

    pub fn message_files(&self, message_id: u64) -> Vec<&MessageFile> {
        self.data
            .message_files
            .iter()
            .filter(|f| f.message_id == message_id)
            .collect()
    }

    // ─────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────

    pub fn commands(&self) -> &[CommandRecord] {
        &self.data.commands
    }

    pub fn command(&self, id: Uuid) -> Option<&CommandRecord> {
        self.data.commands.iter().find(|c| c.id == id)
    }

    pub fn insert_command(&mut self, record: CommandRecord) -> Result<Uuid, StoreError> {
        if let Some(prev) = record.previous_command {
            if self.command(prev).is_none() {
                return Err(StoreError::not_found("command", prev));
            }
        }
        let id = record.id;
        self.data.commands.push(record);
        Ok(id)
    }

    pub fn set_command_status(
        &mut self,
        id: Uuid,
        status: CommandStatus,
    ) -> Result<(), StoreError> {
        let record = self
            .data
            .commands
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("command", id))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(())
    }

    /// The command and its predecessors, newest first.
    pub fn command_chain(&self, id: Uuid) -> Vec<&CommandRecord> {
        let mut chain = Vec::new();
        let mut cursor = self.command(id);
        while let Some(record) = cursor {
            if chain.iter().any(|c: &&CommandRecord| c.id == record.id) {
                break;
            }
            chain.push(record);
            cursor = record.previous_command.and_then(|prev| self.command(prev));
        }
        chain
    }

    /// Delete a command and every command that follows from it.
    pub fn delete_command(&mut self, id: Uuid) -> bool {
        if self.command(id).is_none() {
            return false;
        }
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i];
            for child in &self.data.commands {
                if child.previous_command == Some(parent) && !doomed.contains(&child.id) {
                    doomed.push(child.id);
                }
            }
            i += 1;
        }
        self.data.commands.retain(|c| !doomed.contains(&c.id));
        true
    }

    /// JSON view of a record, addressed the way command targets are.
    pub fn record_json(&self, kind: &str, pk: &str) -> Option<serde_json::Value> {
        let value = match kind {
            "Command" => {
                let id = Uuid::parse_str(pk).ok()?;
                serde_json::to_value(self.command(id)?)
            }
            _ => {
                let id: u64 = pk.parse().ok()?;
                match kind {
                    "Model" => serde_json::to_value(self.model(id)?),
                    "Agent" => serde_json::to_value(self.agent(id)?),
                    "Session" => serde_json::to_value(self.session(id)?),
                    "Message" => {
                        serde_json::to_value(self.data.messages.iter().find(|m| m.id == id)?)
                    }
                    "MessageFile" => serde_json::to_value(
                        self.data.message_files.iter().find(|f| f.id == id)?,
                    ),
                    _ => return None,
                }
            }
        };
        value.ok()
    }
}

impl StoreData {
    fn max_id(&self) -> u64 {
        let ids = self
            .models
            .iter()
            .map(|r| r.id)
            .chain(self.agents.iter().map(|r| r.id))
            .chain(self.sessions.iter().map(|r| r.id))
            .chain(self.messages.iter().map(|r| r.id))
            .chain(self.message_files.iter().map(|r| r.id));
        ids.max().unwrap_or(0)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
