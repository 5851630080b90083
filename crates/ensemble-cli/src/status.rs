//! `ensemble status`: show configuration and provider status.

use anyhow::Result;
use colored::Colorize;

use ensemble_core::config::{get_config_path, load_config};
use ensemble_core::store::Store;
use ensemble_providers::registry::PROVIDERS;

fn found(exists: bool) -> String {
    if exists {
        "✓".green().to_string()
    } else {
        "(not found)".red().to_string()
    }
}

fn key_status(set: bool) -> String {
    if set {
        format!("{} (key set)", "✓".green())
    } else {
        format!("{}", "· not configured".dimmed())
    }
}

pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "Ensemble Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        found(config_path.exists())
    );

    let store_path = config.store.file_path();
    println!(
        "  {:<18} {} {}",
        "Store:".bold(),
        store_path.display(),
        found(store_path.exists())
    );
    if store_path.exists() {
        match Store::open(&store_path) {
            Ok(store) => println!(
                "  {:<18} {}",
                "",
                format!(
                    "{} models | {} agents | {} sessions",
                    store.models().len(),
                    store.agents().len(),
                    store.sessions().len()
                )
                .dimmed()
            ),
            Err(e) => println!("  {:<18} {}", "", format!("unreadable: {e}").red()),
        }
    }

    println!("  {:<18} {}", "Model:".bold(), config.agents.defaults.model);
    println!(
        "  {:<18} {} | max_tokens: {}",
        "Parameters:".bold(),
        format!("temp: {}", config.agents.defaults.temperature).dimmed(),
        format!("{}", config.agents.defaults.max_tokens).dimmed(),
    );
    println!(
        "  {:<18} {} {}",
        "Builder:".bold(),
        config.builder.model,
        format!("(max {} agents)", config.builder.max_agents).dimmed()
    );

    println!();
    println!("  {}", "Providers:".bold());
    let providers_map = config.providers.to_map();
    for spec in PROVIDERS {
        let status = match providers_map.get(spec.name) {
            Some(prov_config) if spec.is_local && prov_config.api_base.is_some() => {
                format!("{} (local)", "✓".green())
            }
            Some(prov_config) => key_status(prov_config.is_configured()),
            None => key_status(false),
        };
        println!("    {:<20} {}", spec.display_name, status);
    }

    println!();
    println!(
        "  {:<18} {}",
        "OpenWeatherMap:".bold(),
        key_status(config.tools.weather.resolved_api_key().is_some())
    );
    println!(
        "  {:<18} {} {}",
        "Transcription:".bold(),
        config.transcription.api_base,
        format!("({})", config.transcription.model).dimmed()
    );
    let repo = config.patches.repo_dir();
    println!(
        "  {:<18} {} {}",
        "Patched checkout:".bold(),
        repo.display(),
        found(repo.join(".git").exists())
    );
    println!();

    Ok(())
}
