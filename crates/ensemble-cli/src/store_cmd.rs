//! `ensemble store`: inspect and edit the record store.
//!
//! - `ensemble store models` / `agents` / `sessions [NAME]`: list records
//! - `ensemble store add-model ...`: register an LLM endpoint
//! - `ensemble store add-agent ...`: save an agent profile

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;

use ensemble_core::config::load_config;
use ensemble_core::store::{AgentRecord, ModelRecord, Store};
use ensemble_core::utils::truncate_string;

// ─────────────────────────────────────────────
// Subcommand enum
// ─────────────────────────────────────────────

#[derive(Subcommand)]
pub enum StoreCommands {
    /// List stored model endpoints
    Models,

    /// List stored agent profiles
    Agents,

    /// List sessions, or show one session's messages
    Sessions {
        /// Session name
        name: Option<String>,
    },

    /// Register an LLM endpoint
    AddModel {
        /// Unique name for the endpoint
        #[arg(short, long)]
        name: String,

        /// Model identifier sent to the endpoint
        #[arg(short, long)]
        model: String,

        /// OpenAI-compatible base URL
        #[arg(short, long)]
        base_url: String,

        #[arg(long, default_value = "")]
        api_key: String,

        #[arg(long, default_value_t = 4096)]
        max_tokens: u32,

        /// Price per 1k prompt tokens
        #[arg(long, default_value_t = 0.0)]
        input_price: f64,

        /// Price per 1k completion tokens
        #[arg(long, default_value_t = 0.0)]
        output_price: f64,
    },

    /// Save an agent profile
    AddAgent {
        #[arg(short, long)]
        name: String,

        /// Comma-separated toolsets, e.g. "weather"
        #[arg(short, long)]
        toolsets: String,

        /// Name of a stored model endpoint
        #[arg(short, long)]
        model: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// System prompt override
        #[arg(short, long)]
        prompt: Option<String>,
    },
}

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

pub fn dispatch(cmd: StoreCommands) -> Result<()> {
    let config = load_config(None);
    let mut store = Store::open(config.store.file_path()).context("opening record store")?;

    match cmd {
        StoreCommands::Models => list_models(&store),
        StoreCommands::Agents => list_agents(&store),
        StoreCommands::Sessions { name: None } => list_sessions(&store),
        StoreCommands::Sessions { name: Some(name) } => show_session(&store, &name)?,
        StoreCommands::AddModel {
            name,
            model,
            base_url,
            api_key,
            max_tokens,
            input_price,
            output_price,
        } => {
            let id = add_model(
                &mut store,
                ModelRecord {
                    id: 0,
                    name: name.clone(),
                    model,
                    api_key,
                    base_url,
                    max_tokens,
                    input_price_1k: input_price,
                    output_price_1k: output_price,
                },
            )?;
            store.save()?;
            println!("{} added model '{}' (id {id})", "✓".green(), name);
        }
        StoreCommands::AddAgent {
            name,
            toolsets,
            model,
            description,
            prompt,
        } => {
            let id = add_agent(&mut store, &name, &toolsets, model.as_deref(), description, prompt)?;
            store.save()?;
            println!("{} added agent '{}' (id {id})", "✓".green(), name);
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────

fn add_model(store: &mut Store, record: ModelRecord) -> Result<u64> {
    if store.model_by_name(&record.name).is_some() {
        bail!("model '{}' already exists", record.name);
    }
    Ok(store.add_model(record))
}

fn add_agent(
    store: &mut Store,
    name: &str,
    toolsets: &str,
    model: Option<&str>,
    description: Option<String>,
    prompt: Option<String>,
) -> Result<u64> {
    if store.agent_by_name(name).is_some() {
        bail!("agent '{name}' already exists");
    }
    let model_id = match model {
        Some(model) => match store.model_by_name(model) {
            Some(record) => Some(record.id),
            None => bail!("model '{model}' not found"),
        },
        None => None,
    };
    let id = store.add_agent(AgentRecord {
        id: 0,
        name: name.to_string(),
        model_id,
        path: toolsets.to_string(),
        description_override: description.unwrap_or_default(),
        prompt_override: prompt.unwrap_or_default(),
        init_kwargs: serde_json::Value::Null,
    })?;
    Ok(id)
}

fn list_models(store: &Store) {
    println!();
    if store.models().is_empty() {
        println!("{}", "No models stored.".dimmed());
    }
    for m in store.models() {
        println!(
            "  {:<4} {:<20} {:<24} {}",
            m.id,
            m.name.bold(),
            m.model,
            m.base_url.dimmed()
        );
    }
    println!();
}

fn list_agents(store: &Store) {
    println!();
    if store.agents().is_empty() {
        println!("{}", "No agents stored.".dimmed());
    }
    for a in store.agents() {
        let model = a
            .model_id
            .and_then(|id| store.model(id))
            .map(|m| m.name.as_str())
            .unwrap_or("(default)");
        println!(
            "  {:<4} {:<20} {:<20} {}",
            a.id,
            a.name.bold(),
            a.toolsets().join(","),
            model.dimmed()
        );
    }
    println!();
}

fn list_sessions(store: &Store) {
    println!();
    if store.sessions().is_empty() {
        println!("{}", "No sessions stored.".dimmed());
    }
    for s in store.sessions() {
        println!(
            "  {:<4} {:<20} {}",
            s.id,
            s.name.bold(),
            format!("{} messages", store.session_messages(s.id).len()).dimmed()
        );
    }
    println!();
}

fn show_session(store: &Store, name: &str) -> Result<()> {
    let Some(session) = store.session_by_name(name) else {
        bail!("session '{name}' not found");
    };
    println!();
    for message in store.session_messages(session.id) {
        let speaker = store
            .agent(message.agent_id)
            .map(|a| a.name.as_str())
            .unwrap_or("?");
        println!(
            "  {} {} {}",
            message.time.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            format!("{speaker}:").cyan(),
            truncate_string(&message.content, 200)
        );
    }
    println!();
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
