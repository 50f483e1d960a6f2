// ============================================================================
// Rules
// ============================================================================
//
// Sharding rule with its master/slave and encryption sub-rules, built from a
// serde configuration that travels through the config center.
//
// ============================================================================

pub mod config;
pub mod encrypt;
pub mod inline;
pub mod master_slave;
pub mod sharding;

pub use config::{
    EncryptColumnRuleConfiguration, EncryptRuleConfiguration, EncryptTableRuleConfiguration,
    MasterSlaveRuleConfiguration, ShardingRuleConfiguration, TableRuleConfiguration,
};
pub use encrypt::EncryptRule;
pub use master_slave::MasterSlaveRule;
pub use sharding::{DataNode, ShardingRule, TableRule};
