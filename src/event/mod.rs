// ============================================================================
// Change Events
// ============================================================================
//
// Raw registry notifications (DataChangedEvent) and the typed events derived
// from them. Typed events form a closed enum so subscribers are selected by
// an explicit tag rather than by runtime type.
//
// ============================================================================

pub mod bus;
pub mod listener;

pub use bus::{ChangeEventHandler, EventBus, EventSender};
pub use listener::{DataSourceStateChangedListener, RuleChangedListener};

use crate::rule::ShardingRuleConfiguration;
use std::fmt;

/// Schema name used when a data source state path carries no schema part
pub const DEFAULT_LOGIC_SCHEMA_NAME: &str = "logic_db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangedType {
    Added,
    Updated,
    Deleted,
}

/// One observed change of one registry key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChangedEvent {
    pub key: String,
    pub value: String,
    pub changed_type: ChangedType,
}

impl DataChangedEvent {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        changed_type: ChangedType,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            changed_type,
        }
    }
}

/// `<schema>.<data source>` pair addressed by a state change
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrchestrationShardingSchema {
    pub schema_name: String,
    pub data_source_name: String,
}

impl OrchestrationShardingSchema {
    pub fn new(schema_name: impl Into<String>, data_source_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            data_source_name: data_source_name.into(),
        }
    }

    /// Parses `schema.data_source`; a bare name belongs to the default logic schema
    pub fn parse(value: &str) -> Self {
        match value.split_once('.') {
            Some((schema, data_source)) => Self::new(schema, data_source),
            None => Self::new(DEFAULT_LOGIC_SCHEMA_NAME, value),
        }
    }
}

impl fmt::Display for OrchestrationShardingSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.data_source_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardingRuleChangedEvent {
    pub sharding_schema_name: String,
    pub sharding_rule_configuration: ShardingRuleConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisabledStateChangedEvent {
    pub sharding_schema: OrchestrationShardingSchema,
    pub disabled: bool,
}

/// Tag used as the dispatch key of the event bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEventKind {
    RuleChanged,
    DisabledStateChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    RuleChanged(ShardingRuleChangedEvent),
    DisabledStateChanged(DisabledStateChangedEvent),
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeEventKind {
        match self {
            ChangeEvent::RuleChanged(_) => ChangeEventKind::RuleChanged,
            ChangeEvent::DisabledStateChanged(_) => ChangeEventKind::DisabledStateChanged,
        }
    }

    /// Logical schema the event is addressed to
    pub fn schema_name(&self) -> &str {
        match self {
            ChangeEvent::RuleChanged(event) => &event.sharding_schema_name,
            ChangeEvent::DisabledStateChanged(event) => &event.sharding_schema.schema_name,
        }
    }
}
