use crate::config::{ConfigNode, OrchestrationConfiguration};
use crate::core::{ProxyError, Result};
use crate::event::{DataSourceStateChangedListener, EventBus, EventSender, RuleChangedListener};
use crate::registry::{RegistryRepository, RegistryRepositoryFactory};
use crate::rule::ShardingRuleConfiguration;
use crate::schema::ShardingSchema;
use crate::state::{OrchestrationInstance, StateNode, StateService};
use log::info;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Composition root of the orchestration layer
///
/// Owns the process-wide registry session and wires registry watches through
/// the event bus to every registered schema.
pub struct Orchestration {
    config: OrchestrationConfiguration,
    repository: Arc<dyn RegistryRepository>,
    config_node: ConfigNode,
    state_service: StateService,
    event_bus: Arc<EventBus>,
    sender: EventSender,
    schemas: RwLock<BTreeMap<String, Arc<ShardingSchema>>>,
}

impl Orchestration {
    /// Connects to the registry, announces this instance and starts watching
    pub async fn start(
        config: OrchestrationConfiguration,
        factory: &RegistryRepositoryFactory,
        instance: OrchestrationInstance,
    ) -> Result<Self> {
        config.validate().map_err(ProxyError::Config)?;

        let repository = factory.create(&config.registry)?;
        repository.init(&config.registry).await?;

        let config_node = ConfigNode::new(config.root.as_str(), config.name.as_str());
        let state_node = StateNode::new(config.root.as_str(), config.name.as_str());
        let state_service =
            StateService::new(state_node.clone(), Arc::clone(&repository), instance);
        state_service.persist_instance_online().await;
        state_service.persist_data_sources_node().await;

        let event_bus = Arc::new(EventBus::new());
        let sender = event_bus.spawn_dispatcher();
        repository
            .watch(
                &config_node.schema_path(),
                Arc::new(RuleChangedListener::new(config_node.clone(), sender.clone())),
            )
            .await;
        repository
            .watch(
                &state_node.data_sources_node_full_root_path(),
                Arc::new(DataSourceStateChangedListener::new(state_node, sender.clone())),
            )
            .await;

        info!(
            "Orchestration '{}' started on registry '{}' as instance '{}'",
            config.name,
            repository.get_type(),
            state_service.instance()
        );

        Ok(Self {
            config,
            repository,
            config_node,
            state_service,
            event_bus,
            sender,
            schemas: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn repository(&self) -> &Arc<dyn RegistryRepository> {
        &self.repository
    }

    pub fn state_service(&self) -> &StateService {
        &self.state_service
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn config_node(&self) -> &ConfigNode {
        &self.config_node
    }

    /// Subscribes `schema` to registry driven changes
    pub async fn register_schema(&self, schema: Arc<ShardingSchema>) {
        schema.subscribe(&self.event_bus).await;
        info!("Schema '{}' registered for orchestration", schema.name());
        self.schemas.write().await.insert(schema.name().to_string(), schema);
    }

    pub async fn schema(&self, schema_name: &str) -> Option<Arc<ShardingSchema>> {
        self.schemas.read().await.get(schema_name).cloned()
    }

    pub async fn schema_names(&self) -> Vec<String> {
        self.schemas.read().await.keys().cloned().collect()
    }

    /// Publishes a rule configuration to every instance watching the registry
    pub async fn persist_rule_configuration(
        &self,
        schema_name: &str,
        configuration: &ShardingRuleConfiguration,
    ) -> Result<()> {
        let json = serde_json::to_string(configuration)?;
        self.repository
            .persist(&self.config_node.rule_path(schema_name), &json)
            .await;
        Ok(())
    }

    pub async fn load_rule_configuration(
        &self,
        schema_name: &str,
    ) -> Result<Option<ShardingRuleConfiguration>> {
        match self.repository.get(&self.config_node.rule_path(schema_name)).await {
            Some(json) if !json.trim().is_empty() => Ok(Some(serde_json::from_str(&json)?)),
            _ => Ok(None),
        }
    }

    /// Waits until events already handed to the dispatcher have been applied
    pub async fn flush_events(&self) {
        self.sender.flush().await;
    }

    /// Releases the registry session; this instance's liveness node goes with it
    pub async fn close(&self) {
        self.repository.close().await;
        info!("Orchestration '{}' closed", self.config.name);
    }
}
