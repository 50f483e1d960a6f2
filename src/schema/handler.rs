use super::ShardingSchema;
use crate::core::Result;
use crate::event::{ChangeEvent, ChangeEventHandler, ChangeEventKind, EventBus};
use async_trait::async_trait;
use std::sync::Arc;

/// Forwards `RuleChanged` events to one schema
pub struct RuleChangedHandler {
    name: String,
    schema: Arc<ShardingSchema>,
}

#[async_trait]
impl ChangeEventHandler for RuleChangedHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &ChangeEvent) -> Result<()> {
        if let ChangeEvent::RuleChanged(event) = event {
            self.schema.renew_rule(event).await?;
        }
        Ok(())
    }
}

/// Forwards `DisabledStateChanged` events to one schema
pub struct DisabledStateChangedHandler {
    name: String,
    schema: Arc<ShardingSchema>,
}

#[async_trait]
impl ChangeEventHandler for DisabledStateChangedHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &ChangeEvent) -> Result<()> {
        if let ChangeEvent::DisabledStateChanged(event) = event {
            self.schema.renew_disabled_state(event).await;
        }
        Ok(())
    }
}

impl ShardingSchema {
    /// Registers this schema's handlers for both registry driven event kinds
    pub async fn subscribe(self: &Arc<Self>, bus: &EventBus) {
        bus.subscribe(
            ChangeEventKind::RuleChanged,
            Arc::new(RuleChangedHandler {
                name: format!("{}.rule", self.name()),
                schema: Arc::clone(self),
            }),
        )
        .await;
        bus.subscribe(
            ChangeEventKind::DisabledStateChanged,
            Arc::new(DisabledStateChangedHandler {
                name: format!("{}.disabled_state", self.name()),
                schema: Arc::clone(self),
            }),
        )
        .await;
    }
}
