use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sharding rule configuration, as stored in the config center
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingRuleConfiguration {
    #[serde(default)]
    pub tables: Vec<TableRuleConfiguration>,

    #[serde(default)]
    pub master_slave_rules: Vec<MasterSlaveRuleConfiguration>,

    #[serde(default)]
    pub encrypt_rule: Option<EncryptRuleConfiguration>,

    /// Data source holding every table without a table rule
    #[serde(default)]
    pub default_data_source_name: Option<String>,
}

impl ShardingRuleConfiguration {
    pub fn table(mut self, logic_table: &str, actual_data_nodes: &str) -> Self {
        self.tables.push(TableRuleConfiguration {
            logic_table: logic_table.to_string(),
            actual_data_nodes: Some(actual_data_nodes.to_string()),
        });
        self
    }

    pub fn master_slave(mut self, name: &str, master: &str, slaves: &[&str]) -> Self {
        self.master_slave_rules.push(MasterSlaveRuleConfiguration {
            name: name.to_string(),
            master_data_source_name: master.to_string(),
            slave_data_source_names: slaves.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn encrypt_rule(mut self, encrypt_rule: EncryptRuleConfiguration) -> Self {
        self.encrypt_rule = Some(encrypt_rule);
        self
    }

    pub fn default_data_source_name(mut self, name: &str) -> Self {
        self.default_data_source_name = Some(name.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRuleConfiguration {
    pub logic_table: String,

    /// Inline expression, e.g. `ds_${0..1}.t_order_${0..1}`.
    /// Absent means one node per data source named after the logic table.
    #[serde(default)]
    pub actual_data_nodes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterSlaveRuleConfiguration {
    pub name: String,
    pub master_data_source_name: String,
    pub slave_data_source_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptRuleConfiguration {
    #[serde(default)]
    pub tables: HashMap<String, EncryptTableRuleConfiguration>,
}

impl EncryptRuleConfiguration {
    pub fn column(
        mut self,
        table: &str,
        logic_column: &str,
        column: EncryptColumnRuleConfiguration,
    ) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .columns
            .insert(logic_column.to_string(), column);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptTableRuleConfiguration {
    /// Logic column name -> storage columns
    #[serde(default)]
    pub columns: HashMap<String, EncryptColumnRuleConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptColumnRuleConfiguration {
    pub cipher_column: String,

    #[serde(default)]
    pub plain_column: Option<String>,

    #[serde(default)]
    pub assisted_query_column: Option<String>,
}

impl EncryptColumnRuleConfiguration {
    pub fn new(cipher_column: &str) -> Self {
        Self {
            cipher_column: cipher_column.to_string(),
            plain_column: None,
            assisted_query_column: None,
        }
    }

    pub fn plain_column(mut self, column: &str) -> Self {
        self.plain_column = Some(column.to_string());
        self
    }

    pub fn assisted_query_column(mut self, column: &str) -> Self {
        self.assisted_query_column = Some(column.to_string());
        self
    }
}
