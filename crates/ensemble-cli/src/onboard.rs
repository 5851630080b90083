//! `ensemble onboard`: initialize configuration and data directories.
//!
//! - Creates `~/.ensemble/config.json` with defaults
//! - Creates an empty record store and the history/builds directories

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use ensemble_core::config::{get_config_path, load_config, save_config};
use ensemble_core::store::Store;
use ensemble_core::utils::{get_builds_path, get_data_path};

pub fn run() -> Result<()> {
    println!();
    println!("{}", "Ensemble Setup".cyan().bold());
    println!();

    let config_path = get_config_path();
    if config_path.exists() {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    } else {
        let config = load_config(None);
        save_config(&config, Some(&config_path))?;
        println!("  {} created config at {}", "✓".green(), config_path.display());
    }

    let config = load_config(None);
    let store_path = config.store.file_path();
    init_store(&store_path)?;

    let data_dir = get_data_path();
    for dir in [data_dir.join("history"), get_builds_path()] {
        std::fs::create_dir_all(&dir)?;
        println!("  {} {}", "✓".green(), dir.display());
    }

    println!();
    println!(
        "{}",
        "  Setup complete! Run `ensemble agent -t weather` to start chatting.".green()
    );
    println!();
    Ok(())
}

/// Write an empty store unless one already exists.
fn init_store(path: &Path) -> Result<()> {
    if path.exists() {
        println!("  {} store already exists at {}", "✓".green(), path.display());
        return Ok(());
    }
    Store::open(path)?.save()?;
    println!("  {} created store at {}", "✓".green(), path.display());
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
