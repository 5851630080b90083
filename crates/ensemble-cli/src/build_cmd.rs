//! `ensemble build`: plan a team of agents and attach capabilities.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::debug;

use ensemble_agent::{
    builtin_registry, AgentBuilder, BuildConfig, Capability, CapabilityBuilder,
    ConversableAgent, DateAwarenessCapability, ToolContext, ToolsetCapability,
};
use ensemble_core::config::{load_config, Config};

use crate::helpers;

/// Every capability the builder may pick from: one per registered toolset
/// that can start with the current config, plus date awareness.
///
/// A toolset whose initializer fails (the weather toolset without an
/// OpenWeatherMap key) is not offered.
pub fn available_capabilities(config: &Config) -> Vec<Arc<dyn Capability>> {
    let registry = builtin_registry(config);
    let scratch = ToolContext::new("capability-check");
    let mut capabilities: Vec<Arc<dyn Capability>> = registry
        .iter()
        .filter(|toolset| match toolset.initialize(&scratch) {
            Ok(()) => true,
            Err(e) => {
                debug!(toolset = %toolset.name, error = %e, "toolset unavailable, not offered");
                false
            }
        })
        .map(|toolset| Arc::new(ToolsetCapability::new(toolset.clone())) as Arc<dyn Capability>)
        .collect();
    capabilities.push(Arc::new(DateAwarenessCapability));
    capabilities
}

pub async fn run(task: Option<String>, save: Option<String>, load: Option<String>) -> Result<()> {
    let config = load_config(None);
    let provider = helpers::resolve_provider(&config, &config.builder.model, None)?;
    let base = AgentBuilder::from_config(provider, &config);
    let builder = CapabilityBuilder::new(base, available_capabilities(&config));

    let (agents, build) = match (load, task) {
        (Some(path), _) => {
            let path = helpers::expand_tilde(&path);
            let build = BuildConfig::load(&path)?;
            let agents = builder.build_from_config(&build)?;
            (agents, build)
        }
        (None, Some(task)) => {
            println!("{}", format!("Planning agents for: {task}").dimmed());
            builder.build(&task).await.context("building agents")?
        }
        (None, None) => bail!("give a task, or --load a saved build"),
    };

    print_roster(&build, &agents);

    if let Some(path) = save {
        let path = helpers::expand_tilde(&path);
        build.save(&path)?;
        println!("  {} saved build to {}", "✓".green(), path.display());
        println!();
    }
    Ok(())
}

fn print_roster(build: &BuildConfig, agents: &[ConversableAgent]) {
    println!();
    println!("{} {}", "Task:".bold(), build.building_task);
    println!();
    for (agent, config) in agents.iter().zip(&build.agent_configs) {
        println!("  {} {}", agent.name().cyan().bold(), format!("({})", config.model).dimmed());
        println!("    {}", agent.description());
        if !config.capabilities.is_empty() {
            println!(
                "    {}",
                format!("capabilities: {}", config.capabilities.join(", ")).dimmed()
            );
        }
        let tools: Vec<&str> = agent
            .llm_tools()
            .iter()
            .map(|d| d.function.name.as_str())
            .collect();
        if !tools.is_empty() {
            println!("    {}", format!("tools: {}", tools.join(", ")).dimmed());
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability_names(config: &Config) -> Vec<String> {
        available_capabilities(config)
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    #[test]
    fn capabilities_cover_toolsets_and_date() {
        let mut config = Config::default();
        config.tools.weather.api_key = "owm-key".into();
        assert_eq!(
            capability_names(&config),
            vec!["WeatherCapability", "DateAwarenessCapability"]
        );
    }

    #[test]
    fn weather_not_offered_without_key() {
        let config = Config::default();
        if config.tools.weather.resolved_api_key().is_some() {
            // OPENWEATHERMAP_API_KEY is set in this environment.
            return;
        }
        assert_eq!(capability_names(&config), vec!["DateAwarenessCapability"]);
    }
}
