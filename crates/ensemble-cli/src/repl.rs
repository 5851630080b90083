//! Interactive REPL around an [`ApiAgent`].
//!
//! Uses `rustyline` for readline-style editing with persistent history.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::{debug, warn};

use ensemble_agent::ApiAgent;

use crate::helpers;
use crate::session::SessionRecorder;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Sender name used for the terminal user.
pub const CLI_SENDER: &str = "user";

/// Run the interactive REPL loop.
pub async fn run(mut agent: ApiAgent, mut recorder: Option<SessionRecorder>) -> Result<()> {
    helpers::print_banner(agent.name(), agent.toolsets());

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(trimmed) {
            println!("\nGoodbye!");
            break;
        }
        if trimmed == "/reset" {
            agent.reset();
            println!("History cleared.\n");
            continue;
        }

        let _ = editor.add_history_entry(&input);

        debug!(agent = agent.name(), input = trimmed, "processing input");
        helpers::print_thinking();

        match agent.receive(trimmed, CLI_SENDER).await {
            Ok(reply) => {
                helpers::clear_thinking();
                helpers::print_response(agent.name(), reply.as_deref());
                if let Some(recorder) = recorder.as_mut() {
                    if let Err(e) = recorder.record(trimmed, reply.as_deref()) {
                        warn!(error = %e, "failed to record message");
                    }
                }
            }
            Err(e) => {
                helpers::clear_thinking();
                eprintln!("\nError: {e}\n");
            }
        }
    }

    save_history(&mut editor);
    Ok(())
}

fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = ensemble_core::utils::get_history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = ensemble_core::utils::get_history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("/quit"));
        assert!(is_exit_command(":q"));
        assert!(!is_exit_command("hello"));
        assert!(!is_exit_command("/reset"));
    }
}
