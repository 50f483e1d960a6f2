// ============================================================================
// Live Schema
// ============================================================================
//
// The query-serving view of one logical schema, kept in step with the
// registry through the event bus and with executed DDL through
// `refresh_table_meta_data`.
//
// ============================================================================

pub mod handler;
pub mod sharding;

pub use handler::{DisabledStateChangedHandler, RuleChangedHandler};
pub use sharding::{SchemaSnapshot, ShardingSchema};
