use super::encrypt::EncryptTableMetaDataDecorator;
use super::table::{TableMetaData, TableMetas};
use crate::config::ProxyProperties;
use crate::core::{ProxyError, Result};
use crate::rule::{ShardingRule, TableRule};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Access to the catalogs of the physical databases
#[async_trait]
pub trait PhysicalSchemaProvider: Send + Sync {
    /// Tables present in one physical data source
    async fn table_names(&self, data_source_name: &str) -> Result<Vec<String>>;

    /// Metadata of one physical table, `None` when it does not exist
    async fn load_table(
        &self,
        data_source_name: &str,
        table_name: &str,
    ) -> Result<Option<TableMetaData>>;
}

/// Produces logical table metadata for a rule
#[async_trait]
pub trait TableMetaDataInitializer: Send + Sync {
    async fn load(&self, table_name: &str, rule: &ShardingRule) -> Result<TableMetaData>;

    async fn load_all(&self, rule: &ShardingRule) -> Result<TableMetas>;
}

/// Post-processes loaded metadata for a derived rule
pub trait TableMetaDataDecorator: Send + Sync {
    fn name(&self) -> &str;

    fn decorate(
        &self,
        table_name: &str,
        table: TableMetaData,
        rule: &ShardingRule,
    ) -> TableMetaData;
}

/// Loads logic tables through their actual data nodes
///
/// A configured logic table is read from its first data node; unconfigured
/// tables are looked up on the default data source, or on every data source
/// outside a slave group when no default is configured.
pub struct ShardingTableMetaDataLoader {
    provider: Arc<dyn PhysicalSchemaProvider>,
    max_connections_size_per_query: usize,
    check_table_metadata_enabled: bool,
}

impl ShardingTableMetaDataLoader {
    pub fn new(provider: Arc<dyn PhysicalSchemaProvider>, properties: &ProxyProperties) -> Self {
        Self {
            provider,
            max_connections_size_per_query: properties.max_connections_size_per_query.max(1),
            check_table_metadata_enabled: properties.check_table_metadata_enabled,
        }
    }

    async fn load_sharding_table(
        &self,
        table_rule: &TableRule,
        rule: &ShardingRule,
    ) -> Result<TableMetaData> {
        let logic_table = table_rule.logic_table();
        let Some((first, others)) = table_rule.actual_data_nodes().split_first() else {
            return Err(ProxyError::MetaDataLoad(
                logic_table.to_string(),
                "no actual data nodes".into(),
            ));
        };

        let expected = self
            .load_actual_table(logic_table, &first.data_source_name, &first.table_name, rule)
            .await?;
        if self.check_table_metadata_enabled {
            for node in others {
                let actual = self
                    .load_actual_table(logic_table, &node.data_source_name, &node.table_name, rule)
                    .await?;
                if actual != expected {
                    return Err(ProxyError::MetaDataLoad(
                        logic_table.to_string(),
                        format!("actual table '{}' differs from '{}'", node, first),
                    ));
                }
            }
        }
        Ok(expected)
    }

    /// Loads one actual table with its index names reduced to logic names
    async fn load_actual_table(
        &self,
        logic_table: &str,
        data_source_name: &str,
        actual_table: &str,
        rule: &ShardingRule,
    ) -> Result<TableMetaData> {
        let data_source_name = rule.physical_data_source_name(data_source_name);
        let table = self
            .provider
            .load_table(data_source_name, actual_table)
            .await?
            .ok_or_else(|| {
                ProxyError::MetaDataLoad(
                    logic_table.to_string(),
                    format!("actual table '{}.{}' does not exist", data_source_name, actual_table),
                )
            })?;

        let indexes: Vec<String> = table
            .indexes()
            .iter()
            .map(|index| logic_index_name(index, actual_table).to_string())
            .collect();
        Ok(TableMetaData::new(table.columns().to_vec(), indexes))
    }

    async fn load_single_table(
        &self,
        table_name: &str,
        rule: &ShardingRule,
    ) -> Result<TableMetaData> {
        for data_source_name in single_table_data_sources(rule) {
            if let Some(table) = self.provider.load_table(&data_source_name, table_name).await? {
                debug!("Loaded table '{}' from data source '{}'", table_name, data_source_name);
                return Ok(table);
            }
        }
        Err(ProxyError::TableNotFound(table_name.to_string()))
    }

    /// Physical tables not covered by any table rule
    async fn single_table_names(&self, rule: &ShardingRule) -> Result<BTreeSet<String>> {
        let mut result = BTreeSet::new();
        for data_source_name in single_table_data_sources(rule) {
            for table in self.provider.table_names(&data_source_name).await? {
                if rule.find_table_rule(&table).is_none()
                    && rule.find_logic_table_by_actual_table(&table).is_none()
                {
                    result.insert(table);
                }
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl TableMetaDataInitializer for ShardingTableMetaDataLoader {
    async fn load(&self, table_name: &str, rule: &ShardingRule) -> Result<TableMetaData> {
        match rule.find_table_rule(table_name) {
            Some(table_rule) => self.load_sharding_table(table_rule, rule).await,
            None => self.load_single_table(table_name, rule).await,
        }
    }

    async fn load_all(&self, rule: &ShardingRule) -> Result<TableMetas> {
        let mut table_names: Vec<String> = rule
            .table_rules()
            .iter()
            .map(|table_rule| table_rule.logic_table().to_string())
            .collect();
        table_names.extend(self.single_table_names(rule).await?);

        let tables: Vec<(String, TableMetaData)> = stream::iter(table_names)
            .map(|table_name| async move {
                let table = self.load(&table_name, rule).await?;
                Ok::<_, ProxyError>((table_name, table))
            })
            .buffered(self.max_connections_size_per_query)
            .try_collect()
            .await?;

        Ok(tables.into_iter().collect())
    }
}

/// Data sources holding unsharded tables
fn single_table_data_sources(rule: &ShardingRule) -> Vec<String> {
    if let Some(default) = rule.default_data_source_name() {
        return vec![rule.physical_data_source_name(default).to_string()];
    }
    let slaves: BTreeSet<&str> = rule
        .master_slave_rules()
        .iter()
        .flat_map(|ms| ms.slave_data_source_names().iter().map(String::as_str))
        .collect();
    rule.data_source_names()
        .iter()
        .filter(|ds| !slaves.contains(ds.as_str()))
        .cloned()
        .collect()
}

/// `idx_order_t_order_0` on actual table `t_order_0` is `idx_order` logically
fn logic_index_name<'a>(index_name: &'a str, actual_table: &str) -> &'a str {
    index_name
        .strip_suffix(actual_table)
        .and_then(|rest| rest.strip_suffix('_'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(index_name)
}

/// Loader plus the decorators the current rule calls for
///
/// Built against one rule snapshot, so a full load and every later
/// single-table reload interpret metadata the same way.
pub struct TableMetaDataInitializerEntry {
    rule: Arc<ShardingRule>,
    loader: Box<dyn TableMetaDataInitializer>,
    decorators: Vec<Box<dyn TableMetaDataDecorator>>,
}

impl TableMetaDataInitializerEntry {
    pub fn new(
        rule: Arc<ShardingRule>,
        provider: Arc<dyn PhysicalSchemaProvider>,
        properties: &ProxyProperties,
    ) -> Self {
        let mut decorators: Vec<Box<dyn TableMetaDataDecorator>> = Vec::new();
        if !rule.encrypt_rule().encrypt_table_names().is_empty() {
            decorators.push(Box::new(EncryptTableMetaDataDecorator));
        }
        Self::with_parts(
            rule,
            Box::new(ShardingTableMetaDataLoader::new(provider, properties)),
            decorators,
        )
    }

    pub fn with_parts(
        rule: Arc<ShardingRule>,
        loader: Box<dyn TableMetaDataInitializer>,
        decorators: Vec<Box<dyn TableMetaDataDecorator>>,
    ) -> Self {
        Self {
            rule,
            loader,
            decorators,
        }
    }

    pub fn decorator_names(&self) -> Vec<&str> {
        self.decorators.iter().map(|d| d.name()).collect()
    }

    pub async fn init(&self, table_name: &str) -> Result<TableMetaData> {
        let table = self.loader.load(table_name, &self.rule).await?;
        Ok(self.decorate(table_name, table))
    }

    pub async fn init_all(&self) -> Result<TableMetas> {
        let tables = self.loader.load_all(&self.rule).await?;
        Ok(tables
            .iter()
            .map(|(name, table)| (name.to_string(), self.decorate(name, table.clone())))
            .collect())
    }

    fn decorate(&self, table_name: &str, table: TableMetaData) -> TableMetaData {
        self.decorators
            .iter()
            .fold(table, |table, decorator| decorator.decorate(table_name, table, &self.rule))
    }
}
