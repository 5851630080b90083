//! Record store for model configs, agent profiles, sessions, messages and
//! the command audit trail.
//!
//! File format: one pretty-printed JSON document (default
//! `~/.ensemble/store.json`) holding every table, loaded and saved whole.

pub mod database;
pub mod records;

pub use database::Store;
pub use records::{
    AgentRecord, CommandRecord, CommandStatus, CommandTarget, MessageFile, MessageRecord,
    ModelRecord, SessionRecord,
};

/// Errors raised by [`Store`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("unsupported store version {0}")]
    UnsupportedVersion(u32),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
