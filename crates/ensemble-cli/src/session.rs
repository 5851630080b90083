//! Records agent conversations into the record store.
//!
//! The human side is stored under a profile named [`USER_PROFILE`], created
//! on first use with no toolsets.

use anyhow::{Context, Result};
use tracing::debug;

use ensemble_core::store::{AgentRecord, SessionRecord, Store};

pub const USER_PROFILE: &str = "user";

pub struct SessionRecorder {
    store: Store,
    session_id: u64,
    user_id: u64,
    agent_id: u64,
}

impl SessionRecorder {
    /// Open (or create) session `name` with `agent_id` as a member.
    pub fn open(mut store: Store, name: &str, agent_id: u64) -> Result<Self> {
        let user_id = ensure_agent(&mut store, USER_PROFILE, "")?;

        let session_id = match store.session_by_name(name) {
            Some(session) => session.id,
            None => store.add_session(SessionRecord {
                id: 0,
                name: name.to_string(),
                agent_ids: Vec::new(),
                group_chat: false,
            })?,
        };
        store.join_session(session_id, user_id)?;
        store.join_session(session_id, agent_id)?;
        store.save().context("saving session")?;

        debug!(session = name, session_id, agent_id, "recording session");
        Ok(Self {
            store,
            session_id,
            user_id,
            agent_id,
        })
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Store one user message and the agent's reply, then persist.
    pub fn record(&mut self, input: &str, reply: Option<&str>) -> Result<()> {
        self.store.add_message(self.session_id, self.user_id, input)?;
        if let Some(reply) = reply {
            self.store.add_message(self.session_id, self.agent_id, reply)?;
        }
        self.store.save().context("saving session messages")?;
        Ok(())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

/// Id of the agent profile `name`, creating it with toolset `path` if missing.
pub fn ensure_agent(store: &mut Store, name: &str, path: &str) -> Result<u64> {
    if let Some(agent) = store.agent_by_name(name) {
        return Ok(agent.id);
    }
    let id = store.add_agent(AgentRecord {
        id: 0,
        name: name.to_string(),
        model_id: None,
        path: path.to_string(),
        description_override: String::new(),
        prompt_override: String::new(),
        init_kwargs: serde_json::Value::Null,
    })?;
    Ok(id)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_exchange_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = Store::open(&path).unwrap();
        let agent_id = ensure_agent(&mut store, "weather-helper", "weather").unwrap();
        let mut recorder = SessionRecorder::open(store, "trip", agent_id).unwrap();

        recorder.record("Weather in Sofia?", Some("Sunny")).unwrap();
        recorder.record("And tomorrow?", None).unwrap();

        let reopened = Store::open(&path).unwrap();
        let session = reopened.session_by_name("trip").unwrap();
        assert_eq!(session.agent_ids.len(), 2);
        let messages = reopened.session_messages(session.id);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Weather in Sofia?", "Sunny", "And tomorrow?"]);
        assert_eq!(messages[1].agent_id, agent_id);
    }

    #[test]
    fn reopening_session_reuses_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = Store::open(&path).unwrap();
        let agent_id = ensure_agent(&mut store, "helper", "").unwrap();
        let first = SessionRecorder::open(store, "s", agent_id).unwrap();
        let first_id = first.session_id();

        let mut store = Store::open(&path).unwrap();
        assert_eq!(ensure_agent(&mut store, "helper", "").unwrap(), agent_id);
        let second = SessionRecorder::open(store, "s", agent_id).unwrap();
        assert_eq!(second.session_id(), first_id);
        assert_eq!(second.store().sessions().len(), 1);
        assert_eq!(second.store().agents().len(), 2);
    }
}
