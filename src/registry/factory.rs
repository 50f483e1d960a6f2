use super::{InMemoryRegistryRepository, InMemoryRegistryServer, RegistryRepository};
use crate::config::InstanceConfiguration;
use crate::core::{ProxyError, Result};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

type RepositoryConstructor = Arc<dyn Fn() -> Arc<dyn RegistryRepository> + Send + Sync>;

/// Named registry backend constructors, selected by `InstanceConfiguration::repository_type`
pub struct RegistryRepositoryFactory {
    constructors: BTreeMap<String, RepositoryConstructor>,
}

impl RegistryRepositoryFactory {
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Factory with every built-in backend registered
    ///
    /// The `memory` backend gets a fresh server private to this factory.
    pub fn with_default_repositories() -> Self {
        let mut factory = Self::new();
        factory.register_in_memory(InMemoryRegistryServer::new());
        factory
    }

    /// Registers `memory` against an existing server
    pub fn register_in_memory(&mut self, server: InMemoryRegistryServer) {
        self.register(InMemoryRegistryRepository::TYPE, move || {
            Arc::new(InMemoryRegistryRepository::new(server.clone())) as Arc<dyn RegistryRepository>
        });
    }

    /// Registers a constructor; a later registration of the same type wins
    pub fn register<F>(&mut self, repository_type: &str, constructor: F)
    where
        F: Fn() -> Arc<dyn RegistryRepository> + Send + Sync + 'static,
    {
        debug!("Registering registry type '{}'", repository_type);
        self.constructors
            .insert(repository_type.to_lowercase(), Arc::new(constructor));
    }

    /// Builds an uninitialized repository for `config`
    pub fn create(&self, config: &InstanceConfiguration) -> Result<Arc<dyn RegistryRepository>> {
        let repository_type = config.repository_type.trim().to_lowercase();
        match self.constructors.get(&repository_type) {
            Some(constructor) => Ok(constructor()),
            None => Err(ProxyError::Config(format!(
                "Unknown registry type '{}', available: [{}]",
                config.repository_type,
                self.list_types().join(", ")
            ))),
        }
    }

    pub fn list_types(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

impl Default for RegistryRepositoryFactory {
    fn default() -> Self {
        Self::with_default_repositories()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_default_memory_repository() {
        let factory = RegistryRepositoryFactory::with_default_repositories();
        let repository = factory
            .create(&InstanceConfiguration::new("Memory", "localhost"))
            .unwrap();

        assert_eq!(repository.get_type(), "memory");
        assert_eq!(factory.list_types(), vec!["memory"]);
    }

    #[test]
    fn test_unknown_type() {
        let factory = RegistryRepositoryFactory::new();
        let result = factory.create(&InstanceConfiguration::new("zookeeper", "localhost:2181"));

        assert!(matches!(result, Err(ProxyError::Config(_))));
    }

    #[tokio::test]
    async fn test_repositories_share_registered_server() {
        let server = InMemoryRegistryServer::new();
        let mut factory = RegistryRepositoryFactory::new();
        factory.register_in_memory(server.clone());

        let config = InstanceConfiguration::new("memory", "localhost");
        let first = factory.create(&config).unwrap();
        let second = factory.create(&config).unwrap();
        first.init(&config).await.unwrap();
        second.init(&config).await.unwrap();

        first.persist("/demo/key", "value").await;
        assert_eq!(second.get("/demo/key").await.as_deref(), Some("value"));
    }
}
