//! Ensemble CLI: entry point.
//!
//! # Commands
//!
//! - `ensemble agent [-m MESSAGE] [-t TOOLSET]...`: chat with a toolset agent (single-shot or REPL)
//! - `ensemble toolsets`: list the registered toolsets
//! - `ensemble build TASK`: plan and equip a team of agents
//! - `ensemble transcribe FILE`: speech to text
//! - `ensemble store ...`: inspect and edit the record store
//! - `ensemble patches [CHOICE]`: manage patches against the vendored checkout
//! - `ensemble onboard` / `ensemble status`

mod build_cmd;
mod helpers;
mod onboard;
mod patches;
mod repl;
mod session;
mod status;
mod store_cmd;
mod transcribe_cmd;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use ensemble_agent::{builtin_registry, AgentOptions, ApiAgent};
use ensemble_core::config::{load_config, Config};
use ensemble_core::store::Store;
use ensemble_providers::traits::LlmRequestConfig;

use crate::session::SessionRecorder;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Ensemble: toolset agents and agent teams
#[derive(Parser)]
#[command(name = "ensemble", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with a toolset agent (single-shot or interactive REPL)
    Agent {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Toolset to equip (repeatable)
        #[arg(short, long = "toolset")]
        toolsets: Vec<String>,

        /// Stored agent profile to load
        #[arg(short, long)]
        profile: Option<String>,

        /// Record the conversation under this session name
        #[arg(short, long)]
        session: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// List registered toolsets
    Toolsets,

    /// Plan a team of agents for a task and attach capabilities
    Build {
        /// Task description
        task: Option<String>,

        /// Save the planned roster to this file
        #[arg(long)]
        save: Option<String>,

        /// Rebuild a saved roster instead of planning
        #[arg(long, conflicts_with = "save")]
        load: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Transcribe an audio file
    Transcribe {
        /// Audio file path
        file: String,

        /// Model preset (tiny, base, small, medium, large; `.en` for English-only)
        #[arg(short, long)]
        model: Option<String>,

        /// Keep the model loaded after transcribing
        #[arg(long, default_value_t = false)]
        keep_loaded: bool,
    },

    /// Inspect and edit the record store
    Store {
        #[command(subcommand)]
        action: store_cmd::StoreCommands,
    },

    /// Manage patches against the vendored checkout
    Patches {
        /// "setup" or "create patch"; prompts when omitted
        choice: Option<String>,
    },

    /// Initialize configuration and data directories
    Onboard,

    /// Show configuration and provider status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Agent {
            message,
            toolsets,
            profile,
            session,
            logs,
        } => {
            init_logging(logs);
            run_agent(message, toolsets, profile, session).await
        }
        Commands::Toolsets => list_toolsets(),
        Commands::Build {
            task,
            save,
            load,
            logs,
        } => {
            init_logging(logs);
            build_cmd::run(task, save, load).await
        }
        Commands::Transcribe {
            file,
            model,
            keep_loaded,
        } => {
            init_logging(false);
            transcribe_cmd::run(&file, model, keep_loaded).await
        }
        Commands::Store { action } => store_cmd::dispatch(action),
        Commands::Patches { choice } => {
            init_logging(false);
            let code = patches::run(choice).await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Onboard => onboard::run(),
        Commands::Status => status::run(),
    }
}

// ─────────────────────────────────────────────
// Agent command
// ─────────────────────────────────────────────

async fn run_agent(
    message: Option<String>,
    toolsets: Vec<String>,
    profile: Option<String>,
    session: Option<String>,
) -> Result<()> {
    let config = load_config(None);
    let store = if profile.is_some() || session.is_some() {
        Some(Store::open(config.store.file_path()).context("opening record store")?)
    } else {
        None
    };

    let (agent, agent_id) = build_api_agent(&config, toolsets, profile.as_deref(), store.as_ref())?;

    let recorder = match (session, store) {
        (Some(name), Some(mut store)) => {
            let agent_id = match agent_id {
                Some(id) => id,
                None => session::ensure_agent(&mut store, agent.name(), &agent.toolsets().join(","))?,
            };
            Some(SessionRecorder::open(store, &name, agent_id)?)
        }
        _ => None,
    };

    match message {
        Some(msg) => {
            let mut agent = agent;
            let mut recorder = recorder;
            info!(agent = agent.name(), "processing single message");
            let reply = agent
                .receive(&msg, repl::CLI_SENDER)
                .await
                .context("agent processing failed")?;
            helpers::print_response(agent.name(), reply.as_deref());
            if let Some(recorder) = recorder.as_mut() {
                recorder.record(&msg, reply.as_deref())?;
            }
        }
        None => repl::run(agent, recorder).await?,
    }

    Ok(())
}

/// Build an [`ApiAgent`] from the config, optionally from a stored profile.
///
/// Returns the profile's record id alongside the agent when one was used.
fn build_api_agent(
    config: &Config,
    mut toolsets: Vec<String>,
    profile: Option<&str>,
    store: Option<&Store>,
) -> Result<(ApiAgent, Option<u64>)> {
    let defaults = &config.agents.defaults;
    let registry = builtin_registry(config);
    let mut request = LlmRequestConfig::from(defaults);

    let (name, options, model_record, record_id) = match (profile, store) {
        (Some(profile), Some(store)) => {
            let Some(record) = store.agent_by_name(profile) else {
                bail!("agent profile '{profile}' not found in {}", store.path().display());
            };
            for toolset in record.toolsets() {
                if !toolsets.contains(&toolset) {
                    toolsets.push(toolset);
                }
            }
            let model_record = record.model_id.and_then(|id| store.model(id)).cloned();
            if let Some(model) = &model_record {
                request.max_tokens = model.max_tokens;
            }
            let options = AgentOptions {
                system_message: record.system_prompt().map(String::from),
                description: record.description().map(String::from),
                model: model_record.as_ref().map(|m| m.model.clone()),
                request: request.clone(),
            };
            (record.name.clone(), options, model_record, Some(record.id))
        }
        _ => (
            defaults.name.clone(),
            AgentOptions {
                request: request.clone(),
                ..Default::default()
            },
            None,
            None,
        ),
    };

    let model = options
        .model
        .clone()
        .unwrap_or_else(|| defaults.model.clone());
    let provider = helpers::resolve_provider(config, &model, model_record.as_ref())?;
    let agent = ApiAgent::new(name, &toolsets, &registry, options, provider)?;
    Ok((agent, record_id))
}

fn list_toolsets() -> Result<()> {
    let config = load_config(None);
    let registry = builtin_registry(&config);

    println!();
    println!("{}", "Toolsets".cyan().bold());
    println!();
    for toolset in registry.iter() {
        println!("  {:<12} {}", toolset.name.bold(), toolset.description);
        println!(
            "  {:<12} {}",
            "",
            format!("tools: {}", toolset.tool_names().join(", ")).dimmed()
        );
    }
    println!();
    Ok(())
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("ensemble=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_core::store::{AgentRecord, ModelRecord};

    fn store_with_profile(dir: &std::path::Path) -> Store {
        let mut store = Store::open(dir.join("store.json")).unwrap();
        let model_id = store.add_model(ModelRecord {
            id: 0,
            name: "local".into(),
            model: "mistral".into(),
            api_key: String::new(),
            base_url: "http://localhost:11434/v1".into(),
            max_tokens: 2048,
            input_price_1k: 0.0,
            output_price_1k: 0.0,
        });
        store
            .add_agent(AgentRecord {
                id: 0,
                name: "forecaster".into(),
                model_id: Some(model_id),
                path: "weather".into(),
                description_override: "Knows the forecast.".into(),
                prompt_override: String::new(),
                init_kwargs: serde_json::Value::Null,
            })
            .unwrap();
        store
    }

    #[test]
    fn agent_from_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_profile(dir.path());
        let mut config = Config::default();
        config.tools.weather.api_key = "owm-key".into();

        let (agent, id) =
            build_api_agent(&config, Vec::new(), Some("forecaster"), Some(&store)).unwrap();
        assert_eq!(agent.name(), "forecaster");
        assert_eq!(agent.toolsets(), ["weather".to_string()]);
        assert_eq!(agent.description(), "Knows the forecast.");
        assert!(agent.system_message().contains("weather data"));
        assert_eq!(agent.model(), Some("mistral"));
        assert!(id.is_some());
    }

    #[test]
    fn unknown_profile_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_profile(dir.path());
        let err = build_api_agent(&Config::default(), Vec::new(), Some("nobody"), Some(&store))
            .err()
            .unwrap();
        assert!(err.to_string().contains("nobody"));
    }

    #[test]
    fn cli_parses_agent_flags() {
        let cli = Cli::try_parse_from([
            "ensemble", "agent", "-t", "weather", "-m", "hi", "--session", "trip",
        ])
        .unwrap();
        match cli.command {
            Commands::Agent {
                toolsets,
                message,
                session,
                ..
            } => {
                assert_eq!(toolsets, vec!["weather"]);
                assert_eq!(message.as_deref(), Some("hi"));
                assert_eq!(session.as_deref(), Some("trip"));
            }
            _ => panic!("expected agent command"),
        }
    }
}
