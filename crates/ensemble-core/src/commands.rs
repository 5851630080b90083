//! Command pattern skeleton.
//!
//! A command names a target record and carries a JSON payload. Saving a
//! command writes a PENDING [`CommandRecord`] to the audit trail; concrete
//! commands decide what `execute` and `revert` do to the target.

use uuid::Uuid;

use crate::store::{CommandRecord, CommandTarget, Store, StoreError};

/// A reversible state change against one stored record.
pub trait Command: Send + Sync {
    /// Command name recorded in the audit trail.
    fn name(&self) -> &str;

    /// The record this command operates on.
    fn target(&self) -> CommandTarget;

    fn payload(&self) -> Option<serde_json::Value>;

    /// Apply the change.
    fn execute(&self, store: &mut Store) -> anyhow::Result<()>;

    /// Undo a previous `execute`.
    fn revert(&self, store: &mut Store) -> anyhow::Result<()>;

    /// Current JSON view of the target record, if it exists.
    fn target_object(&self, store: &Store) -> Option<serde_json::Value> {
        let target = self.target();
        store.record_json(&target.model, target.pk.as_deref()?)
    }

    /// Record this command as PENDING, optionally chained after `previous`.
    fn save(
        &self,
        store: &mut Store,
        tag: &str,
        previous: Option<Uuid>,
    ) -> Result<Uuid, StoreError> {
        let record = CommandRecord::new(self.name(), tag, self.target(), self.payload(), previous);
        store.insert_command(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AgentRecord, CommandStatus};
    use serde_json::json;
    use tempfile::TempDir;

    /// Renames an agent; keeps the old name for `revert`.
    struct RenameAgent {
        agent_id: u64,
        from: String,
        to: String,
    }

    impl RenameAgent {
        fn set_name(&self, store: &mut Store, name: &str) -> anyhow::Result<()> {
            let record = store
                .agent_mut(self.agent_id)
                .ok_or_else(|| anyhow::anyhow!("agent {} not found", self.agent_id))?;
            record.name = name.to_string();
            Ok(())
        }
    }

    impl Command for RenameAgent {
        fn name(&self) -> &str {
            "rename_agent"
        }

        fn target(&self) -> CommandTarget {
            CommandTarget::new("agents", "Agent", Some(self.agent_id.to_string()))
        }

        fn payload(&self) -> Option<serde_json::Value> {
            Some(json!({ "from": self.from, "to": self.to }))
        }

        fn execute(&self, store: &mut Store) -> anyhow::Result<()> {
            self.set_name(store, &self.to)
        }

        fn revert(&self, store: &mut Store) -> anyhow::Result<()> {
            self.set_name(store, &self.from)
        }
    }

    fn store_with_agent(dir: &TempDir) -> (Store, u64) {
        let mut store = Store::open(dir.path().join("store.json")).unwrap();
        let id = store
            .add_agent(AgentRecord {
                id: 0,
                name: "forecaster".into(),
                model_id: None,
                path: "weather".into(),
                description_override: String::new(),
                prompt_override: String::new(),
                init_kwargs: json!({}),
            })
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_save_creates_pending_record() {
        let dir = TempDir::new().unwrap();
        let (mut store, agent_id) = store_with_agent(&dir);
        let cmd = RenameAgent {
            agent_id,
            from: "forecaster".into(),
            to: "meteorologist".into(),
        };

        let id = cmd.save(&mut store, "ui", None).unwrap();
        let record = store.command(id).unwrap();
        assert_eq!(record.status, CommandStatus::Pending);
        assert_eq!(record.command, "rename_agent");
        assert_eq!(record.tag, "ui");
        assert_eq!(record.target_model, "Agent");
        assert_eq!(record.target_pk.as_deref(), Some(agent_id.to_string().as_str()));
        assert_eq!(record.payload.as_ref().unwrap()["to"], "meteorologist");
    }

    #[test]
    fn test_save_chains_previous() {
        let dir = TempDir::new().unwrap();
        let (mut store, agent_id) = store_with_agent(&dir);
        let cmd = RenameAgent {
            agent_id,
            from: "a".into(),
            to: "b".into(),
        };

        let first = cmd.save(&mut store, "batch", None).unwrap();
        let second = cmd.save(&mut store, "batch", Some(first)).unwrap();
        assert_eq!(store.command(second).unwrap().previous_command, Some(first));
    }

    #[test]
    fn test_target_object_resolves_record() {
        let dir = TempDir::new().unwrap();
        let (store, agent_id) = store_with_agent(&dir);
        let cmd = RenameAgent {
            agent_id,
            from: "forecaster".into(),
            to: "x".into(),
        };
        let obj = cmd.target_object(&store).unwrap();
        assert_eq!(obj["name"], "forecaster");
    }

    #[test]
    fn test_execute_and_revert() {
        let dir = TempDir::new().unwrap();
        let (mut store, agent_id) = store_with_agent(&dir);
        let cmd = RenameAgent {
            agent_id,
            from: "forecaster".into(),
            to: "meteorologist".into(),
        };
        let id = cmd.save(&mut store, "ui", None).unwrap();

        cmd.execute(&mut store).unwrap();
        store.set_command_status(id, CommandStatus::Executed).unwrap();
        assert_eq!(store.agent(agent_id).unwrap().name, "meteorologist");

        cmd.revert(&mut store).unwrap();
        store.set_command_status(id, CommandStatus::Reverted).unwrap();
        assert_eq!(store.agent(agent_id).unwrap().name, "forecaster");
        assert_eq!(store.command(id).unwrap().status, CommandStatus::Reverted);
    }
}
