use super::{
    ChangeEvent, ChangedType, DataChangedEvent, DisabledStateChangedEvent, EventSender,
    ShardingRuleChangedEvent,
};
use crate::config::ConfigNode;
use crate::registry::DataChangedEventListener;
use crate::rule::ShardingRuleConfiguration;
use crate::state::{DISABLED_STATE, StateNode};
use log::{debug, warn};

/// Turns rule node changes into `RuleChanged` events
pub struct RuleChangedListener {
    config_node: ConfigNode,
    sender: EventSender,
}

impl RuleChangedListener {
    pub fn new(config_node: ConfigNode, sender: EventSender) -> Self {
        Self { config_node, sender }
    }

    fn create_event(&self, event: &DataChangedEvent) -> Option<ChangeEvent> {
        if event.changed_type == ChangedType::Deleted {
            return None;
        }
        let schema_name = self.config_node.schema_name_from_rule_path(&event.key)?;

        match serde_json::from_str::<ShardingRuleConfiguration>(&event.value) {
            Ok(configuration) => Some(ChangeEvent::RuleChanged(ShardingRuleChangedEvent {
                sharding_schema_name: schema_name,
                sharding_rule_configuration: configuration,
            })),
            Err(e) => {
                warn!("Ignoring malformed rule configuration at '{}': {}", event.key, e);
                None
            }
        }
    }
}

impl DataChangedEventListener for RuleChangedListener {
    fn on_change(&self, event: DataChangedEvent) {
        if let Some(change) = self.create_event(&event) {
            debug!("Rule of schema '{}' changed", change.schema_name());
            self.sender.send(change);
        }
    }
}

/// Turns data source state node changes into `DisabledStateChanged` events
///
/// A data source is disabled while its node holds `disabled`; any other
/// value, or removal of the node, enables it again.
pub struct DataSourceStateChangedListener {
    state_node: StateNode,
    sender: EventSender,
}

impl DataSourceStateChangedListener {
    pub fn new(state_node: StateNode, sender: EventSender) -> Self {
        Self { state_node, sender }
    }

    fn create_event(&self, event: &DataChangedEvent) -> Option<ChangeEvent> {
        let sharding_schema = self.state_node.get_orchestration_sharding_schema(&event.key)?;
        let disabled =
            event.changed_type != ChangedType::Deleted && event.value.trim() == DISABLED_STATE;

        Some(ChangeEvent::DisabledStateChanged(DisabledStateChangedEvent {
            sharding_schema,
            disabled,
        }))
    }
}

impl DataChangedEventListener for DataSourceStateChangedListener {
    fn on_change(&self, event: DataChangedEvent) {
        if let Some(change) = self.create_event(&event) {
            debug!("Data source state changed at '{}'", event.key);
            self.sender.send(change);
        }
    }
}
