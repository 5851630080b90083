//! Built-in toolsets.

pub mod weather;

use ensemble_core::config::Config;

use crate::toolset::ToolsetRegistry;

/// Registry holding every built-in toolset, configured from `config`.
pub fn builtin_registry(config: &Config) -> ToolsetRegistry {
    let mut registry = ToolsetRegistry::new();
    registry.register(weather::toolset(config.tools.weather.clone()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = builtin_registry(&Config::default());
        assert_eq!(registry.names(), vec!["weather"]);
        assert!(registry.find("weather").is_ok());
    }
}
