//! Shared building blocks for Ensemble: chat message types, configuration,
//! the record store and the command audit trail.

pub mod commands;
pub mod config;
pub mod store;
pub mod types;
pub mod utils;
