use super::{OrchestrationInstance, StateNode};
use crate::registry::RegistryRepository;
use log::info;
use std::sync::Arc;

/// Value marking a data source as disabled
pub const DISABLED_STATE: &str = "disabled";

/// Announces this instance and its data source state into the registry
///
/// Writes go through the repository's lenient failure policy, so nothing
/// here reports transport errors.
pub struct StateService {
    state_node: StateNode,
    repository: Arc<dyn RegistryRepository>,
    instance: OrchestrationInstance,
}

impl StateService {
    pub fn new(
        state_node: StateNode,
        repository: Arc<dyn RegistryRepository>,
        instance: OrchestrationInstance,
    ) -> Self {
        Self {
            state_node,
            repository,
            instance,
        }
    }

    pub fn state_node(&self) -> &StateNode {
        &self.state_node
    }

    pub fn instance(&self) -> &OrchestrationInstance {
        &self.instance
    }

    /// Ephemeral liveness node; it disappears with the registry session
    pub async fn persist_instance_online(&self) {
        let path = self.state_node.instances_node_full_path(self.instance.instance_id());
        self.repository.persist_ephemeral(&path, "").await;
        info!("Instance '{}' online at '{}'", self.instance, path);
    }

    /// Durable parent of per data source state
    pub async fn persist_data_sources_node(&self) {
        self.repository
            .persist(&self.state_node.data_sources_node_full_root_path(), "")
            .await;
    }

    /// Ids of every instance currently online
    pub async fn load_instance_ids(&self) -> Vec<String> {
        self.repository
            .get_children_keys(&self.state_node.instances_node_full_root_path())
            .await
    }

    /// Marks `<schema>.<data source>` disabled or enabled for every instance
    pub async fn update_data_source_disabled_state(
        &self,
        schema_name: &str,
        data_source_name: &str,
        disabled: bool,
    ) {
        let path = self
            .state_node
            .data_source_node_full_path(&format!("{}.{}", schema_name, data_source_name));
        let value = if disabled { DISABLED_STATE } else { "" };
        self.repository.persist(&path, value).await;
        info!(
            "Data source '{}.{}' {}",
            schema_name,
            data_source_name,
            if disabled { "disabled" } else { "enabled" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceConfiguration;
    use crate::registry::{InMemoryRegistryRepository, InMemoryRegistryServer};

    async fn service(server: &InMemoryRegistryServer, id: &str) -> StateService {
        let repository = InMemoryRegistryRepository::new(server.clone());
        repository
            .init(&InstanceConfiguration::new("memory", "localhost"))
            .await
            .unwrap();
        StateService::new(
            StateNode::new("", "demo"),
            Arc::new(repository),
            OrchestrationInstance::with_id(id),
        )
    }

    #[tokio::test]
    async fn test_persist_instance_online() {
        let server = InMemoryRegistryServer::new();
        let first = service(&server, "i1").await;
        let second = service(&server, "i2").await;

        first.persist_instance_online().await;
        second.persist_instance_online().await;

        assert!(server.contains_key("/demo/state/instances/i1").await);
        assert_eq!(first.load_instance_ids().await, vec!["i1", "i2"]);
    }

    #[tokio::test]
    async fn test_persist_data_sources_node_and_disabled_state() {
        let server = InMemoryRegistryServer::new();
        let service = service(&server, "i1").await;
        service.persist_data_sources_node().await;
        service.update_data_source_disabled_state("sharding_db", "ds_0", true).await;

        assert!(server.contains_key("/demo/state/datasources").await);
        assert_eq!(
            service
                .repository
                .get("/demo/state/datasources/sharding_db.ds_0")
                .await
                .as_deref(),
            Some(DISABLED_STATE)
        );

        service.update_data_source_disabled_state("sharding_db", "ds_0", false).await;
        assert_eq!(
            service
                .repository
                .get("/demo/state/datasources/sharding_db.ds_0")
                .await
                .as_deref(),
            Some("")
        );
    }
}
