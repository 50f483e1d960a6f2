use super::config::ShardingRuleConfiguration;
use super::encrypt::EncryptRule;
use super::inline;
use super::master_slave::MasterSlaveRule;
use crate::core::{ProxyError, Result};
use std::collections::BTreeSet;
use std::fmt;

/// One physical table on one data source
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataNode {
    pub data_source_name: String,
    pub table_name: String,
}

impl DataNode {
    /// Parses `data_source.table`
    pub fn parse(node: &str) -> Result<Self> {
        let node = node.trim();
        match node.split_once('.') {
            Some((ds, table)) if !ds.is_empty() && !table.is_empty() && !table.contains('.') => {
                Ok(Self {
                    data_source_name: ds.to_string(),
                    table_name: table.to_string(),
                })
            }
            _ => Err(ProxyError::Rule(format!(
                "Invalid data node '{}', expected 'data_source.table'",
                node
            ))),
        }
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.data_source_name, self.table_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRule {
    logic_table: String,
    actual_data_nodes: Vec<DataNode>,
}

impl TableRule {
    pub fn logic_table(&self) -> &str {
        &self.logic_table
    }

    pub fn actual_data_nodes(&self) -> &[DataNode] {
        &self.actual_data_nodes
    }

    pub fn contains_actual_table(&self, actual_table: &str) -> bool {
        self.actual_data_nodes
            .iter()
            .any(|node| node.table_name.eq_ignore_ascii_case(actual_table))
    }
}

/// Active routing rule of one logical schema
///
/// Built in one piece from a configuration and the schema's data source
/// names; only the master/slave disabled sets change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardingRule {
    config: ShardingRuleConfiguration,
    data_source_names: BTreeSet<String>,
    table_rules: Vec<TableRule>,
    master_slave_rules: Vec<MasterSlaveRule>,
    encrypt_rule: EncryptRule,
}

impl ShardingRule {
    pub fn new<I, S>(config: ShardingRuleConfiguration, data_source_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let data_source_names: BTreeSet<String> =
            data_source_names.into_iter().map(Into::into).collect();
        if data_source_names.is_empty() {
            return Err(ProxyError::Rule("Sharding rule requires at least one data source".into()));
        }

        let master_slave_rules = config
            .master_slave_rules
            .iter()
            .map(MasterSlaveRule::new)
            .collect::<Result<Vec<_>>>()?;
        for rule in &master_slave_rules {
            let members = std::iter::once(rule.master_data_source_name())
                .chain(rule.slave_data_source_names().iter().map(String::as_str));
            for member in members {
                if !data_source_names.contains(member) {
                    return Err(ProxyError::DataSourceNotFound(member.to_string()));
                }
            }
        }

        let logic_data_sources = logic_data_source_names(&data_source_names, &master_slave_rules);

        if let Some(default) = config.default_data_source_name.as_deref() {
            if !logic_data_sources.contains(default) {
                return Err(ProxyError::DataSourceNotFound(default.to_string()));
            }
        }

        let mut table_rules: Vec<TableRule> = Vec::with_capacity(config.tables.len());
        for table in &config.tables {
            let logic_table = table.logic_table.trim().to_lowercase();
            if logic_table.is_empty() {
                return Err(ProxyError::Rule("Logic table name cannot be empty".into()));
            }
            if table_rules.iter().any(|r| r.logic_table == logic_table) {
                return Err(ProxyError::Rule(format!("Duplicate table rule for '{}'", logic_table)));
            }

            let actual_data_nodes = match table.actual_data_nodes.as_deref() {
                Some(expression) => inline::expand(expression)?
                    .iter()
                    .map(|node| DataNode::parse(node))
                    .collect::<Result<Vec<_>>>()?,
                None => logic_data_sources
                    .iter()
                    .map(|ds| DataNode {
                        data_source_name: ds.clone(),
                        table_name: logic_table.clone(),
                    })
                    .collect(),
            };
            if actual_data_nodes.is_empty() {
                return Err(ProxyError::Rule(format!(
                    "Table rule '{}' has no data nodes",
                    logic_table
                )));
            }
            if let Some(node) = actual_data_nodes
                .iter()
                .find(|node| !logic_data_sources.contains(&node.data_source_name))
            {
                return Err(ProxyError::DataSourceNotFound(node.data_source_name.clone()));
            }

            table_rules.push(TableRule {
                logic_table,
                actual_data_nodes,
            });
        }

        let encrypt_rule = EncryptRule::new(config.encrypt_rule.as_ref());

        Ok(Self {
            config,
            data_source_names,
            table_rules,
            master_slave_rules,
            encrypt_rule,
        })
    }

    pub fn config(&self) -> &ShardingRuleConfiguration {
        &self.config
    }

    /// Physical data source names this rule was built against
    pub fn data_source_names(&self) -> &BTreeSet<String> {
        &self.data_source_names
    }

    pub fn table_rules(&self) -> &[TableRule] {
        &self.table_rules
    }

    pub fn find_table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.table_rules
            .iter()
            .find(|rule| rule.logic_table.eq_ignore_ascii_case(logic_table))
    }

    pub fn find_logic_table_by_actual_table(&self, actual_table: &str) -> Option<&str> {
        self.table_rules
            .iter()
            .find(|rule| rule.contains_actual_table(actual_table))
            .map(|rule| rule.logic_table())
    }

    pub fn master_slave_rules(&self) -> &[MasterSlaveRule] {
        &self.master_slave_rules
    }

    pub fn encrypt_rule(&self) -> &EncryptRule {
        &self.encrypt_rule
    }

    pub fn default_data_source_name(&self) -> Option<&str> {
        self.config.default_data_source_name.as_deref()
    }

    /// Resolves a master/slave logical name to its master; other names pass through
    pub fn physical_data_source_name<'a>(&'a self, data_source_name: &'a str) -> &'a str {
        self.master_slave_rules
            .iter()
            .find(|rule| rule.name() == data_source_name)
            .map(|rule| rule.master_data_source_name())
            .unwrap_or(data_source_name)
    }

    /// Toggles `data_source_name` in every master/slave sub-rule
    pub fn update_disabled_data_source_names(&mut self, data_source_name: &str, disabled: bool) {
        for rule in &mut self.master_slave_rules {
            rule.update_disabled_data_source_names(data_source_name, disabled);
        }
    }
}

/// Physical data sources outside any master/slave group plus the group names
fn logic_data_source_names(
    data_source_names: &BTreeSet<String>,
    master_slave_rules: &[MasterSlaveRule],
) -> BTreeSet<String> {
    let mut result: BTreeSet<String> = data_source_names
        .iter()
        .filter(|ds| !master_slave_rules.iter().any(|rule| rule.contains_data_source(ds)))
        .cloned()
        .collect();
    result.extend(master_slave_rules.iter().map(|rule| rule.name().to_string()));
    result
}
