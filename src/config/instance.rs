use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Registry connection descriptor
///
/// Selects a backend by `type` and carries everything that backend needs
/// to open its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfiguration {
    /// Backend name, resolved through the repository factory
    #[serde(rename = "type")]
    pub repository_type: String,

    /// Comma separated server address list
    pub server_lists: String,

    /// Optional namespace isolating this deployment inside the backend
    #[serde(default)]
    pub namespace: Option<String>,

    /// Backend specific properties
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl InstanceConfiguration {
    pub fn new(repository_type: &str, server_lists: &str) -> Self {
        Self {
            repository_type: repository_type.to_string(),
            server_lists: server_lists.to_string(),
            namespace: None,
            properties: HashMap::new(),
        }
    }

    /// Set the namespace
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Set a single backend property
    pub fn property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    /// Server addresses, trimmed, empty entries skipped
    pub fn server_addresses(&self) -> Vec<String> {
        self.server_lists
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Typed view over `properties`
    pub fn registry_properties(&self) -> RegistryProperties {
        RegistryProperties::from_map(&self.properties)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.repository_type.trim().is_empty() {
            return Err("Registry type cannot be empty".to_string());
        }

        if self.server_addresses().is_empty() {
            return Err("Registry server list cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Known registry properties with their defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryProperties {
    pub timeout_ms: u64,
}

impl RegistryProperties {
    pub const TIMEOUT: &'static str = "timeout";

    /// Unparseable values fall back to the default
    pub fn from_map(properties: &HashMap<String, String>) -> Self {
        let mut result = Self::default();

        if let Some(timeout) = properties.get(Self::TIMEOUT) {
            result.timeout_ms = parse_millis(Self::TIMEOUT, timeout, DEFAULT_TIMEOUT_MS);
        }

        result
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RegistryProperties {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

fn parse_millis(key: &str, raw: &str, default: u64) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(value) => value,
        Err(_) => {
            warn!(
                "Registry property '{}' has invalid value '{}', using default {}",
                key, raw, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let config = InstanceConfiguration::new("memory", "localhost:2181, localhost:2182,")
            .namespace("orchestration")
            .property("timeout", "500");

        assert_eq!(config.namespace.as_deref(), Some("orchestration"));
        assert_eq!(
            config.server_addresses(),
            vec!["localhost:2181".to_string(), "localhost:2182".to_string()]
        );
        assert_eq!(config.registry_properties().timeout_ms, 500);
    }

    #[test]
    fn test_validate() {
        assert!(InstanceConfiguration::new("memory", "localhost:2181").validate().is_ok());
        assert!(InstanceConfiguration::new("", "localhost:2181").validate().is_err());
        assert!(InstanceConfiguration::new("memory", " , ").validate().is_err());
    }

    #[test]
    fn test_properties_fall_back_to_defaults() {
        let config = InstanceConfiguration::new("memory", "localhost")
            .property("timeout", "soon");

        let properties = config.registry_properties();
        assert_eq!(properties.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(properties.timeout(), Duration::from_millis(3000));
    }

    #[test]
    fn test_deserialize_from_json() {
        let json =
            r#"{"type":"memory","server_lists":"127.0.0.1:2379","properties":{"timeout":"250"}}"#;
        let config: InstanceConfiguration = serde_json::from_str(json).unwrap();

        assert_eq!(config.repository_type, "memory");
        assert_eq!(config.namespace, None);
        assert_eq!(config.registry_properties().timeout_ms, 250);
    }
}
