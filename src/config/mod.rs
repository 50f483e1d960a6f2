pub mod datasource;
pub mod instance;
pub mod node;
pub mod properties;

pub use datasource::{DataSourceParameter, DataSourceUrl};
pub use instance::{InstanceConfiguration, RegistryProperties};
pub use node::ConfigNode;
pub use properties::ProxyProperties;

use serde::{Deserialize, Serialize};

/// Orchestration settings for one proxy process
///
/// `name` is the orchestration name, the second segment of every registry
/// path this process reads or writes; `root` is prepended to all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationConfiguration {
    pub name: String,

    #[serde(default)]
    pub root: String,

    pub registry: InstanceConfiguration,
}

impl OrchestrationConfiguration {
    pub fn new(name: &str, registry: InstanceConfiguration) -> Self {
        Self {
            name: name.to_string(),
            root: String::new(),
            registry,
        }
    }

    /// Set the registry root prefix, e.g. `/prod`
    pub fn root(mut self, root: &str) -> Self {
        self.root = root.trim_end_matches('/').to_string();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Orchestration name cannot be empty".to_string());
        }

        if self.name.contains('/') {
            return Err(format!("Orchestration name '{}' cannot contain '/'", self.name));
        }

        if !self.root.is_empty() && !self.root.starts_with('/') {
            return Err(format!("Registry root '{}' must start with '/'", self.root));
        }

        self.registry.validate()
    }
}
