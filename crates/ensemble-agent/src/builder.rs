//! Multi-agent builder.
//!
//! [`AgentBuilder`] asks the builder model for a roster of experts for a
//! task, then for each expert's system message and description, and turns
//! the resulting [`BuildConfig`] into agents. [`CapabilityBuilder`] adds a
//! step: for every planned expert it asks which of the known capabilities
//! the expert needs and attaches them once the agents exist.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ensemble_core::config::Config;
use ensemble_core::types::Message;
use ensemble_providers::traits::{LlmProvider, LlmRequestConfig};

use crate::capabilities::Capability;
use crate::conversable::{ConversableAgent, LlmBinding};
use crate::error::AgentError;

// ─────────────────────────────────────────────
// Prompts
// ─────────────────────────────────────────────

fn agent_name_prompt(task: &str, max_agents: usize) -> String {
    format!(
        "# Your task\n\
         Suggest no more than {max_agents} experts with their name according to the following user requirement.\n\n\
         ## User requirement\n\
         {task}\n\n\
         # Task requirement\n\
         - Expert's name should follow the format: [skill]_Expert.\n\
         - Only reply the names of the experts, separated by \",\".\n\
         For example: Python_Expert, Math_Expert, ... "
    )
}

fn agent_sys_msg_prompt(task: &str, name: &str) -> String {
    format!(
        "# Your goal\n\
         Write a system message for the expert {name}, who will work with other experts on the task below.\n\n\
         # Task\n\
         {task}\n\n\
         # Task requirement\n\
         - Address the expert in the second person (\"You are ...\").\n\
         - Describe their skills and how they should contribute to the task.\n\
         - Only reply the system message."
    )
}

fn agent_description_prompt(name: &str, system_message: &str) -> String {
    format!(
        "# Your goal\n\
         Summarize, in one sentence, what the expert {name} can help with so that other agents know when to ask them.\n\n\
         # Expert system message\n\
         {system_message}\n\n\
         # Task requirement\n\
         - Only reply the description."
    )
}

fn agent_capabilities_prompt(task: &str, name: &str, capabilities: &str) -> String {
    format!(
        "# Your goal\n\
         Considering the following task, what capabilities should the following expert have (if any).\n\n\
         # Task\n\
         {task}\n\n\
         # Expert name\n\
         {name}\n\n\
         # Available capabilities\n\
         {capabilities}\n\n\
         # Task requirement\n\
         - Only reply the names of the capabilities, separated by \",\".\n\
         For example: YoutubeCapability, WebSurferCapability, ... "
    )
}

// ─────────────────────────────────────────────
// Build config
// ─────────────────────────────────────────────

/// One planned agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub name: String,
    pub model: String,
    pub system_message: String,
    pub description: String,
    /// Names of capabilities to attach after construction.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// A full roster, saved so it can be rebuilt without the builder model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub building_task: String,
    pub default_model: String,
    pub agent_configs: Vec<AgentConfig>,
}

impl BuildConfig {
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing build config {}", path.display()))?;
        debug!(path = %path.display(), agents = self.agent_configs.len(), "build config saved");
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading build config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing build config {}", path.display()))
    }
}

/// Split a comma-separated model reply into trimmed, non-empty items.
fn split_names(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ─────────────────────────────────────────────
// Base builder
// ─────────────────────────────────────────────

pub struct AgentBuilder {
    provider: Arc<dyn LlmProvider>,
    builder_model: String,
    agent_model: String,
    max_agents: usize,
    request: LlmRequestConfig,
}

impl AgentBuilder {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        builder_model: impl Into<String>,
        agent_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            builder_model: builder_model.into(),
            agent_model: agent_model.into(),
            max_agents: 5,
            request: LlmRequestConfig::default(),
        }
    }

    /// Builder model and limits from `builder`, agent model from `agents.defaults`.
    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &Config) -> Self {
        Self::new(
            provider,
            config.builder.model.clone(),
            config.agents.defaults.model.clone(),
        )
        .with_max_agents(config.builder.max_agents)
        .with_request(LlmRequestConfig::from(&config.agents.defaults))
    }

    pub fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = max_agents.max(1);
        self
    }

    pub fn with_request(mut self, request: LlmRequestConfig) -> Self {
        self.request = request;
        self
    }

    pub fn max_agents(&self) -> usize {
        self.max_agents
    }

    /// One-shot question to the builder model.
    async fn ask(&self, prompt: String) -> Result<String, AgentError> {
        let response = self
            .provider
            .chat(
                &[Message::user(prompt)],
                None,
                &self.builder_model,
                &self.request,
            )
            .await;
        if response.is_error() {
            return Err(AgentError::Llm(response.content.unwrap_or_default()));
        }
        Ok(response.content.unwrap_or_default().trim().to_string())
    }

    /// Ask the builder model for a roster and each member's prompts.
    pub async fn plan(&self, task: &str) -> Result<BuildConfig, AgentError> {
        info!(task = %task, max_agents = self.max_agents, "planning agents");

        let reply = self.ask(agent_name_prompt(task, self.max_agents)).await?;
        let mut names: Vec<String> = Vec::new();
        for name in split_names(&reply) {
            let name = name.replace(' ', "_");
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.truncate(self.max_agents);
        if names.is_empty() {
            return Err(AgentError::EmptyRoster(task.to_string()));
        }
        debug!(agents = ?names, "roster proposed");

        let mut agent_configs = Vec::with_capacity(names.len());
        for name in names {
            let system_message = self.ask(agent_sys_msg_prompt(task, &name)).await?;
            let description = self
                .ask(agent_description_prompt(&name, &system_message))
                .await?;
            agent_configs.push(AgentConfig {
                name,
                model: self.agent_model.clone(),
                system_message,
                description,
                capabilities: Vec::new(),
            });
        }

        Ok(BuildConfig {
            building_task: task.to_string(),
            default_model: self.agent_model.clone(),
            agent_configs,
        })
    }

    /// Instantiate every agent in `config`.
    pub fn build_agents(&self, config: &BuildConfig) -> Vec<ConversableAgent> {
        config
            .agent_configs
            .iter()
            .map(|agent| {
                let model = if agent.model.is_empty() {
                    config.default_model.clone()
                } else {
                    agent.model.clone()
                };
                let llm = LlmBinding::new(self.provider.clone(), Some(model))
                    .with_config(self.request.clone());
                ConversableAgent::new(&agent.name, &agent.system_message)
                    .with_description(&agent.description)
                    .with_llm(llm)
            })
            .collect()
    }

    pub async fn build(
        &self,
        task: &str,
    ) -> Result<(Vec<ConversableAgent>, BuildConfig), AgentError> {
        let config = self.plan(task).await?;
        Ok((self.build_agents(&config), config))
    }
}

// ─────────────────────────────────────────────
// Capability-aware builder
// ─────────────────────────────────────────────

pub struct CapabilityBuilder {
    base: AgentBuilder,
    capabilities: Vec<Arc<dyn Capability>>,
}

impl CapabilityBuilder {
    pub fn new(base: AgentBuilder, capabilities: Vec<Arc<dyn Capability>>) -> Self {
        Self { base, capabilities }
    }

    pub fn capability_names(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.name()).collect()
    }

    /// Capabilities the builder model picks for `agent`, in declaration order.
    ///
    /// Unknown names are dropped. A failed model call selects nothing.
    pub async fn select_capabilities(&self, task: &str, agent: &AgentConfig) -> Vec<String> {
        if self.capabilities.is_empty() {
            return Vec::new();
        }
        info!(agent = %agent.name, "preparing capabilities");

        let available = self.capability_names().join(", ");
        let reply = match self
            .base
            .ask(agent_capabilities_prompt(task, &agent.name, &available))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(agent = %agent.name, error = %e, "capability selection failed, attaching none");
                return Vec::new();
            }
        };

        let requested = split_names(&reply);
        if requested.is_empty() {
            warn!(agent = %agent.name, reply = %reply, "capability reply had no names");
        }
        self.capabilities
            .iter()
            .map(|c| c.name())
            .filter(|name| requested.iter().any(|r| r == name))
            .map(str::to_string)
            .collect()
    }

    /// Plan the roster, pick capabilities per agent, build and equip.
    pub async fn build(
        &self,
        task: &str,
    ) -> Result<(Vec<ConversableAgent>, BuildConfig), AgentError> {
        let mut config = self.base.plan(task).await?;
        for agent in &mut config.agent_configs {
            agent.capabilities = self.select_capabilities(task, agent).await;
        }
        let agents = self.build_from_config(&config)?;
        Ok((agents, config))
    }

    /// Rebuild a saved roster, attaching the capabilities it lists.
    ///
    /// Unknown capabilities and ones that fail to attach are skipped with a
    /// warning; the agent is built without them.
    pub fn build_from_config(
        &self,
        config: &BuildConfig,
    ) -> Result<Vec<ConversableAgent>, AgentError> {
        let mut agents = self.base.build_agents(config);
        for (agent, agent_config) in agents.iter_mut().zip(&config.agent_configs) {
            for name in &agent_config.capabilities {
                let Some(capability) = self.capabilities.iter().find(|c| c.name() == name) else {
                    warn!(agent = %agent_config.name, capability = %name, "unknown capability in config");
                    continue;
                };
                if let Err(e) = capability.add_to_agent(agent) {
                    warn!(
                        agent = %agent_config.name,
                        capability = %name,
                        error = %e,
                        "capability could not be attached, skipping"
                    );
                }
            }
        }
        Ok(agents)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{DateAwarenessCapability, ToolsetCapability};
    use crate::conversable::tests::{MockProvider, UpperTool};
    use crate::toolset::Toolset;
    use ensemble_core::types::LlmResponse;

    fn text_capability() -> Arc<dyn Capability> {
        Arc::new(ToolsetCapability::new(Arc::new(Toolset {
            name: "text".into(),
            description: "Text utilities".into(),
            agent_description: String::new(),
            agent_system_prompt: String::new(),
            preferred_llm: String::new(),
            tools: vec![Arc::new(UpperTool)],
            init: None,
        })))
    }

    fn scripted(replies: &[&str]) -> Arc<MockProvider> {
        Arc::new(MockProvider::new(
            replies.iter().map(|r| MockProvider::text(r)).collect(),
        ))
    }

    #[test]
    fn test_split_names() {
        assert_eq!(
            split_names(" A_Expert ,B_Expert,, "),
            vec!["A_Expert".to_string(), "B_Expert".to_string()]
        );
        assert!(split_names("   ").is_empty());
    }

    #[tokio::test]
    async fn test_plan_roster() {
        let provider = scripted(&[
            "Weather Expert, Travel_Expert, Weather Expert",
            "You are a weather expert.",
            "Knows the weather.",
            "You are a travel expert.",
            "Plans trips.",
        ]);
        let builder = AgentBuilder::new(provider.clone(), "gpt-4o", "mistral");

        let config = builder.plan("Plan a day out in Sofia").await.unwrap();
        assert_eq!(config.agent_configs.len(), 2);
        assert_eq!(config.agent_configs[0].name, "Weather_Expert");
        assert_eq!(config.agent_configs[0].system_message, "You are a weather expert.");
        assert_eq!(config.agent_configs[1].description, "Plans trips.");
        assert_eq!(config.default_model, "mistral");

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 5);
        assert!(calls[0].0[0].text().unwrap().contains("no more than 5 experts"));
    }

    #[tokio::test]
    async fn test_plan_respects_max_agents_and_empty_roster() {
        let provider = scripted(&["A_Expert, B_Expert, C_Expert", "sys", "desc"]);
        let builder = AgentBuilder::new(provider, "gpt-4o", "mistral").with_max_agents(1);
        let config = builder.plan("task").await.unwrap();
        assert_eq!(config.agent_configs.len(), 1);

        let builder = AgentBuilder::new(scripted(&[" , "]), "gpt-4o", "mistral");
        let err = builder.plan("task").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyRoster(_)));
    }

    #[tokio::test]
    async fn test_capability_builder_attaches_selected() {
        let provider = scripted(&[
            "Writer_Expert, Planner_Expert",
            "You write.",
            "Writes things.",
            "You plan.",
            "Plans things.",
            "TextCapability, YoutubeCapability",
            "DateAwarenessCapability",
        ]);
        let base = AgentBuilder::new(provider.clone(), "gpt-4o", "mistral");
        let builder = CapabilityBuilder::new(
            base,
            vec![text_capability(), Arc::new(DateAwarenessCapability)],
        );

        let (agents, config) = builder.build("Write and plan").await.unwrap();
        assert_eq!(config.agent_configs[0].capabilities, vec!["TextCapability"]);
        assert_eq!(
            config.agent_configs[1].capabilities,
            vec!["DateAwarenessCapability"]
        );

        assert_eq!(agents.len(), 2);
        assert!(agents[0].has_function("upper"));
        assert!(!agents[1].has_function("upper"));
        assert!(agents[1].system_message().contains("Today's date is"));
        assert_eq!(agents[0].llm().unwrap().model, "mistral");

        let calls = provider.calls.lock().unwrap();
        let cap_prompt = calls[5].0[0].text().unwrap();
        assert!(cap_prompt.contains("TextCapability, DateAwarenessCapability"));
        assert!(cap_prompt.ends_with("For example: YoutubeCapability, WebSurferCapability, ... "));
    }

    #[tokio::test]
    async fn test_capability_that_fails_to_attach_is_skipped() {
        let broken: Arc<dyn Capability> = Arc::new(ToolsetCapability::new(Arc::new(Toolset {
            name: "weather".into(),
            description: "Weather data".into(),
            agent_description: String::new(),
            agent_system_prompt: String::new(),
            preferred_llm: String::new(),
            tools: vec![Arc::new(UpperTool)],
            init: Some(Arc::new(|_ctx: &crate::tools::ToolContext| -> anyhow::Result<()> {
                anyhow::bail!("missing OpenWeatherMap API key")
            })),
        })));
        let provider = scripted(&[
            "Forecast_Expert",
            "You forecast.",
            "Forecasts things.",
            "WeatherCapability, DateAwarenessCapability",
        ]);
        let builder = CapabilityBuilder::new(
            AgentBuilder::new(provider.clone(), "gpt-4o", "mistral"),
            vec![broken, Arc::new(DateAwarenessCapability)],
        );

        let (agents, config) = builder.build("Plan a picnic").await.unwrap();
        assert_eq!(
            config.agent_configs[0].capabilities,
            vec!["WeatherCapability", "DateAwarenessCapability"]
        );
        assert_eq!(agents.len(), 1);
        assert!(!agents[0].has_function("upper"));
        assert!(agents[0].llm_tools().is_empty());
        assert!(agents[0].system_message().contains("Today's date is"));
        assert_eq!(provider.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_failed_selection_attaches_nothing() {
        let provider = Arc::new(MockProvider::new(vec![LlmResponse::error(
            "Error calling LLM: 500",
        )]));
        let builder = CapabilityBuilder::new(
            AgentBuilder::new(provider, "gpt-4o", "mistral"),
            vec![text_capability()],
        );
        let agent = AgentConfig {
            name: "Writer_Expert".into(),
            model: "mistral".into(),
            system_message: String::new(),
            description: String::new(),
            capabilities: Vec::new(),
        };
        assert!(builder.select_capabilities("task", &agent).await.is_empty());
    }

    #[test]
    fn test_build_config_save_load_and_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("builds").join("sofia.json");
        let config = BuildConfig {
            building_task: "Plan a day out".into(),
            default_model: "mistral".into(),
            agent_configs: vec![AgentConfig {
                name: "Writer_Expert".into(),
                model: String::new(),
                system_message: "You write.".into(),
                description: "Writes things.".into(),
                capabilities: vec!["TextCapability".into(), "GoneCapability".into()],
            }],
        };

        config.save(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"buildingTask\""));
        let loaded = BuildConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let builder = CapabilityBuilder::new(
            AgentBuilder::new(scripted(&[]), "gpt-4o", "gpt-4o"),
            vec![text_capability()],
        );
        let agents = builder.build_from_config(&loaded).unwrap();
        assert!(agents[0].has_function("upper"));
        assert_eq!(agents[0].llm().unwrap().model, "mistral");
        assert_eq!(agents[0].description(), "Writes things.");
    }

    #[test]
    fn test_load_missing_build_config() {
        assert!(BuildConfig::load(Path::new("/nonexistent/build.json")).is_err());
    }
}
