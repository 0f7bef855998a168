//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::errors::ConfigError;
use crate::application::pipeline::PublisherStrategy;
use crate::infrastructure::registry::ServiceLifetime;

/// Mediator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MediatorConfig {
    /// How notification deliveries are run
    pub publisher: PublisherStrategy,
    /// Lifetime of every registered handler and behavior
    pub service_lifetime: ServiceLifetime,
}

impl MediatorConfig {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config {}: {}", path.display(), e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    /// Defaults overridden by `CQBUS_PUBLISHER` and `CQBUS_SERVICE_LIFETIME`
    pub fn load_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// Apply environment overrides on top of this configuration
    pub fn with_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(publisher) = std::env::var("CQBUS_PUBLISHER") {
            self.publisher = publisher.parse()?;
        }

        if let Ok(lifetime) = std::env::var("CQBUS_SERVICE_LIFETIME") {
            self.service_lifetime = lifetime.parse()?;
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MediatorConfig::default();
        assert_eq!(config.publisher, PublisherStrategy::Sequential);
        assert_eq!(config.service_lifetime, ServiceLifetime::Transient);
    }

    #[test]
    fn test_parse_kebab_case_yaml() {
        let config = MediatorConfig::from_yaml("publisher: concurrent\nservice-lifetime: singleton\n").unwrap();

        assert_eq!(config.publisher, PublisherStrategy::Concurrent);
        assert_eq!(config.service_lifetime, ServiceLifetime::Singleton);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = MediatorConfig::from_yaml("publisher: concurrent\n").unwrap();

        assert_eq!(config.service_lifetime, ServiceLifetime::Transient);
    }

    #[test]
    fn test_unknown_strategy_is_parse_error() {
        let err = MediatorConfig::from_yaml("publisher: parallel\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_yaml_round_trip_of_written_default() {
        let yaml = MediatorConfig::default().to_yaml().unwrap();

        assert!(yaml.contains("service-lifetime: transient"), "{}", yaml);
        assert_eq!(MediatorConfig::from_yaml(&yaml).unwrap(), MediatorConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("CQBUS_PUBLISHER", "concurrent");
        std::env::set_var("CQBUS_SERVICE_LIFETIME", "singleton");
        let config = MediatorConfig::load_env();
        std::env::remove_var("CQBUS_PUBLISHER");
        std::env::remove_var("CQBUS_SERVICE_LIFETIME");

        let config = config.unwrap();
        assert_eq!(config.publisher, PublisherStrategy::Concurrent);
        assert_eq!(config.service_lifetime, ServiceLifetime::Singleton);

        std::env::set_var("CQBUS_SERVICE_LIFETIME", "scoped");
        let err = MediatorConfig::default().with_env().unwrap_err();
        std::env::remove_var("CQBUS_SERVICE_LIFETIME");
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_load_missing_file_is_parse_error() {
        let err = MediatorConfig::load("/nonexistent/cqbus.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref msg) if msg.contains("Failed to read")));
    }
}
