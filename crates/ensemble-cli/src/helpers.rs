//! Shared CLI helpers: path expansion, provider setup, response printing.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use ensemble_core::config::Config;
use ensemble_core::store::ModelRecord;
use ensemble_providers::http_provider::{create_provider, HttpProvider};
use ensemble_providers::traits::LlmProvider;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Provider for `model`: a stored model record wins over the configured providers.
pub fn resolve_provider(
    config: &Config,
    model: &str,
    record: Option<&ModelRecord>,
) -> Result<Arc<dyn LlmProvider>> {
    if let Some(record) = record {
        return Ok(Arc::new(HttpProvider::from_record(record)));
    }
    let provider = create_provider(model, &config.providers.to_map())?;
    Ok(Arc::new(provider))
}

/// Print an agent response to stdout.
pub fn print_response(agent: &str, response: Option<&str>) {
    println!();
    println!("{}", agent.cyan().bold());
    match response {
        Some(text) if !text.is_empty() => println!("{text}"),
        _ => println!("{}", "(no response)".dimmed()),
    }
    println!();
}

/// Print the banner shown at REPL start.
pub fn print_banner(agent: &str, toolsets: &[String]) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "Ensemble".cyan().bold(), version.dimmed());
    if toolsets.is_empty() {
        println!("{} {}", "Agent:".bold(), agent);
    } else {
        println!(
            "{} {} {}",
            "Agent:".bold(),
            agent,
            format!("[{}]", toolsets.join(", ")).dimmed()
        );
    }
    println!("{}", "Type a message, or \"exit\" to quit.".dimmed());
    println!();
}

/// Print a "thinking" placeholder (for non-log mode).
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
