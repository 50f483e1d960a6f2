use crate::config::{DataSourceParameter, ProxyProperties};
use crate::core::{ProxyError, Result};
use crate::event::{DisabledStateChangedEvent, ShardingRuleChangedEvent};
use crate::metadata::{
    DataSourceMetas, PhysicalSchemaProvider, ShardingSphereMetaData, TableMetaData,
    TableMetaDataInitializerEntry,
};
use crate::parser::{DropIndexContext, SqlStatementContext};
use crate::rule::{ShardingRule, ShardingRuleConfiguration};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{Instrument, Level, event, info_span};

/// Rule and metadata that change together under one lock
struct SchemaState {
    rule: Arc<ShardingRule>,
    meta_data: ShardingSphereMetaData,
}

/// Consistent view of a schema at one instant
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    pub rule: Arc<ShardingRule>,
    pub meta_data: ShardingSphereMetaData,
}

/// Live logical schema
///
/// Owns the active sharding rule and the table metadata of one logical
/// schema. Registry driven changes (rule replacement, disabled data sources)
/// and DDL driven metadata patches are applied under a single write lock;
/// readers receive snapshots, which never change after they are handed out.
pub struct ShardingSchema {
    name: String,
    data_sources: HashMap<String, DataSourceParameter>,
    provider: Arc<dyn PhysicalSchemaProvider>,
    properties: ProxyProperties,
    state: RwLock<SchemaState>,
}

impl ShardingSchema {
    /// Builds the initial rule and loads metadata of every table
    pub async fn new(
        name: &str,
        data_sources: HashMap<String, DataSourceParameter>,
        rule_configuration: ShardingRuleConfiguration,
        provider: Arc<dyn PhysicalSchemaProvider>,
        properties: ProxyProperties,
    ) -> Result<Self> {
        properties.validate().map_err(ProxyError::Config)?;
        for (data_source_name, parameter) in &data_sources {
            parameter.validate().map_err(|e| {
                ProxyError::Config(format!("Data source '{}': {}", data_source_name, e))
            })?;
        }

        log_rule_configuration(name, &rule_configuration);
        let rule = Arc::new(ShardingRule::new(rule_configuration, data_sources.keys().cloned())?);
        let data_source_metas = DataSourceMetas::new(&data_sources)?;

        let entry = TableMetaDataInitializerEntry::new(
            Arc::clone(&rule),
            Arc::clone(&provider),
            &properties,
        );
        let tables = entry
            .init_all()
            .instrument(info_span!("schema.metadata.load", schema = %name))
            .await?;
        info!(
            "Schema '{}' loaded {} tables over {} data sources",
            name,
            tables.len(),
            data_sources.len()
        );

        Ok(Self {
            name: name.to_string(),
            data_sources,
            provider,
            properties,
            state: RwLock::new(SchemaState {
                rule,
                meta_data: ShardingSphereMetaData::new(data_source_metas, tables),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.data_sources.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn data_source(&self, data_source_name: &str) -> Option<&DataSourceParameter> {
        self.data_sources.get(data_source_name)
    }

    pub async fn sharding_rule(&self) -> Arc<ShardingRule> {
        Arc::clone(&self.state.read().await.rule)
    }

    pub async fn meta_data(&self) -> ShardingSphereMetaData {
        self.state.read().await.meta_data.clone()
    }

    /// Rule and metadata taken under the same read lock
    pub async fn snapshot(&self) -> SchemaSnapshot {
        let state = self.state.read().await;
        SchemaSnapshot {
            rule: Arc::clone(&state.rule),
            meta_data: state.meta_data.clone(),
        }
    }

    pub async fn table_meta(&self, table_name: &str) -> Option<TableMetaData> {
        let state = self.state.read().await;
        let key = table_key(&state.rule, table_name);
        state.meta_data.tables().get(&key).cloned()
    }

    pub async fn table_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .meta_data
            .tables()
            .all_table_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Replaces the active rule when the event addresses this schema
    ///
    /// Returns `Ok(false)` for other schemas. A configuration that does not
    /// build leaves the current rule active.
    pub async fn renew_rule(&self, event: &ShardingRuleChangedEvent) -> Result<bool> {
        if event.sharding_schema_name != self.name {
            return Ok(false);
        }

        log_rule_configuration(&self.name, &event.sharding_rule_configuration);
        let rule = ShardingRule::new(
            event.sharding_rule_configuration.clone(),
            self.data_sources.keys().cloned(),
        )
        .inspect_err(|e| warn!("Rejected rule change of schema '{}': {}", self.name, e))?;

        let mut state = self.state.write().await;
        state.rule = Arc::new(rule);
        event!(Level::INFO, schema = %self.name, "sharding rule renewed");
        Ok(true)
    }

    /// Toggles a data source in every master/slave sub-rule of this schema
    ///
    /// Returns false when the event addresses another schema.
    pub async fn renew_disabled_state(&self, event: &DisabledStateChangedEvent) -> bool {
        let sharding_schema = &event.sharding_schema;
        if sharding_schema.schema_name != self.name {
            return false;
        }

        let mut state = self.state.write().await;
        // Snapshots already handed out keep the previous rule
        Arc::make_mut(&mut state.rule)
            .update_disabled_data_source_names(&sharding_schema.data_source_name, event.disabled);
        event!(
            Level::INFO,
            schema = %self.name,
            data_source = %sharding_schema.data_source_name,
            disabled = event.disabled,
            "data source state renewed"
        );
        true
    }

    /// Applies the metadata effect of an executed DDL statement
    ///
    /// Table reloads go through the same decorated loader as the initial
    /// load. A failed reload is returned and leaves metadata as it was.
    pub async fn refresh_table_meta_data(
        &self,
        context: Option<&SqlStatementContext>,
    ) -> Result<()> {
        let Some(context) = context else {
            return Ok(());
        };
        if matches!(context, SqlStatementContext::Other) {
            return Ok(());
        }

        let span = info_span!(
            "schema.metadata.refresh",
            schema = %self.name,
            statement = context.kind()
        );
        async move {
            let mut state = self.state.write().await;
            match context {
                SqlStatementContext::CreateTable(create) => {
                    self.reload_table(&mut state, &create.table_name).await?;
                }
                SqlStatementContext::AlterTable(alter) => {
                    self.reload_table(&mut state, &alter.table_name).await?;
                }
                SqlStatementContext::DropTable(drop) => {
                    for table_name in &drop.table_names {
                        let key = table_key(&state.rule, table_name);
                        if state.meta_data.tables_mut().remove(&key).is_none() {
                            debug!("Dropped table '{}' had no metadata", table_name);
                        }
                    }
                }
                SqlStatementContext::CreateIndex(create) => {
                    let Some(index_name) = create.index_name.as_deref() else {
                        return Ok(());
                    };
                    let key = table_key(&state.rule, &create.table_name);
                    match state.meta_data.tables_mut().get_mut(&key) {
                        Some(table) => {
                            table.add_index(index_name);
                        }
                        None => debug!(
                            "Index '{}' created on table '{}' without metadata",
                            index_name, create.table_name
                        ),
                    }
                }
                SqlStatementContext::DropIndex(drop) => drop_indexes(&mut state, drop),
                SqlStatementContext::Other => {}
            }
            event!(Level::DEBUG, "table metadata refreshed");
            Ok::<(), ProxyError>(())
        }
        .instrument(span)
        .await
    }

    async fn reload_table(&self, state: &mut SchemaState, table_name: &str) -> Result<()> {
        let entry = TableMetaDataInitializerEntry::new(
            Arc::clone(&state.rule),
            Arc::clone(&self.provider),
            &self.properties,
        );
        let table = entry
            .init(table_name)
            .await
            .inspect_err(|e| {
                event!(
                    Level::ERROR,
                    error = %e,
                    table = %table_name,
                    "table metadata reload failed"
                )
            })?;

        let key = table_key(&state.rule, table_name);
        state.meta_data.tables_mut().put(key, table);
        Ok(())
    }
}

/// Metadata key of a table: the logic name when a table rule covers it
fn table_key(rule: &ShardingRule, table_name: &str) -> String {
    rule.find_table_rule(table_name)
        .map(|table_rule| table_rule.logic_table().to_string())
        .unwrap_or_else(|| table_name.to_string())
}

fn drop_indexes(state: &mut SchemaState, drop: &DropIndexContext) {
    let tables = state.meta_data.tables_mut();

    if let Some(table_name) = drop.table_name.as_deref() {
        let key = table_key(&state.rule, table_name);
        if let Some(table) = tables.get_mut(&key) {
            for index_name in &drop.index_names {
                table.remove_index(index_name);
            }
        }
        return;
    }

    // Unqualified index names: the owning table is whichever declares them
    for index_name in &drop.index_names {
        let Some(owner) = tables.find_table_name_by_index(index_name).map(str::to_string) else {
            debug!("Dropped index '{}' is not declared by any table", index_name);
            continue;
        };
        if let Some(table) = tables.get_mut(&owner) {
            table.remove_index(index_name);
        }
    }
}

fn log_rule_configuration(schema_name: &str, configuration: &ShardingRuleConfiguration) {
    match serde_json::to_string_pretty(configuration) {
        Ok(json) => info!("Sharding rule configuration of schema '{}':\n{}", schema_name, json),
        Err(e) => warn!("Cannot render rule configuration of schema '{}': {}", schema_name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::OrchestrationShardingSchema;
    use crate::metadata::{ColumnMetaData, InMemorySchemaProvider};

    fn table(index: &str) -> TableMetaData {
        TableMetaData::new(vec![ColumnMetaData::new("id", "int").primary_key()], [index])
    }

    fn data_sources() -> HashMap<String, DataSourceParameter> {
        ["master", "slave_0"]
            .into_iter()
            .map(|ds| {
                (
                    ds.to_string(),
                    DataSourceParameter::new(&format!("mysql://127.0.0.1/{}", ds), "root", ""),
                )
            })
            .collect()
    }

    async fn schema() -> ShardingSchema {
        let provider = InMemorySchemaProvider::new();
        provider.put_table("master", "t_order", table("idx_order")).unwrap();
        provider.put_table("master", "t_user", table("idx_user")).unwrap();

        let config = ShardingRuleConfiguration::default()
            .master_slave("ms_ds", "master", &["slave_0"])
            .table("t_order", "ms_ds.t_order")
            .default_data_source_name("ms_ds");
        ShardingSchema::new(
            "sharding_db",
            data_sources(),
            config,
            Arc::new(provider),
            ProxyProperties::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_initial_load() {
        let schema = schema().await;

        assert_eq!(schema.table_names().await, vec!["t_order", "t_user"]);
        assert!(schema.table_meta("T_ORDER").await.unwrap().contains_index("idx_order"));
        assert_eq!(schema.data_source_names(), vec!["master", "slave_0"]);
        assert_eq!(
            schema.meta_data().await.data_sources().all_data_source_names(),
            vec!["master", "slave_0"]
        );
    }

    #[tokio::test]
    async fn test_invalid_rule_change_keeps_current_rule() {
        let schema = schema().await;
        let before = schema.sharding_rule().await;

        let event = ShardingRuleChangedEvent {
            sharding_schema_name: "sharding_db".into(),
            sharding_rule_configuration: ShardingRuleConfiguration::default()
                .table("t_order", "ds_9.t_order"),
        };
        assert!(schema.renew_rule(&event).await.is_err());
        assert_eq!(*schema.sharding_rule().await, *before);
    }

    #[tokio::test]
    async fn test_disabled_state_is_copy_on_write() {
        let schema = schema().await;
        let snapshot = schema.snapshot().await;

        let event = DisabledStateChangedEvent {
            sharding_schema: OrchestrationShardingSchema::new("sharding_db", "slave_0"),
            disabled: true,
        };
        assert!(schema.renew_disabled_state(&event).await);

        let rule = schema.sharding_rule().await;
        assert!(rule.master_slave_rules()[0].available_slave_data_source_names().is_empty());
        assert!(snapshot.rule.master_slave_rules()[0].disabled_data_source_names().is_empty());
    }

    #[tokio::test]
    async fn test_other_statements_are_ignored() {
        let schema = schema().await;
        let before = schema.meta_data().await;

        schema.refresh_table_meta_data(None).await.unwrap();
        schema.refresh_table_meta_data(Some(&SqlStatementContext::Other)).await.unwrap();
        let create_index = SqlStatementContext::create_index("t_missing", Some("idx"));
        schema.refresh_table_meta_data(Some(&create_index)).await.unwrap();

        assert_eq!(schema.meta_data().await, before);
    }

    #[tokio::test]
    async fn test_drop_index_on_named_table() {
        let schema = schema().await;

        let drop_index = SqlStatementContext::drop_index(Some("t_user"), &["idx_user", "idx_none"]);
        schema.refresh_table_meta_data(Some(&drop_index)).await.unwrap();

        assert!(schema.table_meta("t_user").await.unwrap().indexes().is_empty());
        assert!(schema.table_meta("t_order").await.unwrap().contains_index("idx_order"));
    }
}
