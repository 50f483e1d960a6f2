use super::loader::PhysicalSchemaProvider;
use super::table::TableMetaData;
use crate::core::{ProxyError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Physical catalogs kept in memory
///
/// Stands in for live database connections. A data source can be marked
/// unreachable to exercise load failures.
#[derive(Default)]
pub struct InMemorySchemaProvider {
    data_sources: RwLock<BTreeMap<String, BTreeMap<String, TableMetaData>>>,
    unreachable: RwLock<HashSet<String>>,
    loads: AtomicUsize,
}

impl InMemorySchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_data_source(&self, data_source_name: &str) -> Result<()> {
        self.data_sources
            .write()?
            .entry(data_source_name.to_string())
            .or_default();
        Ok(())
    }

    /// Creates or replaces a physical table
    pub fn put_table(
        &self,
        data_source_name: &str,
        table_name: &str,
        table: TableMetaData,
    ) -> Result<()> {
        self.data_sources
            .write()?
            .entry(data_source_name.to_string())
            .or_default()
            .insert(table_name.to_string(), table);
        Ok(())
    }

    pub fn drop_table(&self, data_source_name: &str, table_name: &str) -> Result<bool> {
        Ok(self
            .data_sources
            .write()?
            .get_mut(data_source_name)
            .is_some_and(|tables| tables.remove(table_name).is_some()))
    }

    pub fn set_unreachable(&self, data_source_name: &str, unreachable: bool) -> Result<()> {
        let mut set = self.unreachable.write()?;
        if unreachable {
            set.insert(data_source_name.to_string());
        } else {
            set.remove(data_source_name);
        }
        Ok(())
    }

    /// Number of `load_table` calls served so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn check_reachable(&self, data_source_name: &str, target: &str) -> Result<()> {
        if self.unreachable.read()?.contains(data_source_name) {
            return Err(ProxyError::MetaDataLoad(
                target.to_string(),
                format!("data source '{}' is unreachable", data_source_name),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PhysicalSchemaProvider for InMemorySchemaProvider {
    async fn table_names(&self, data_source_name: &str) -> Result<Vec<String>> {
        self.check_reachable(data_source_name, data_source_name)?;
        let data_sources = self.data_sources.read()?;
        let tables = data_sources
            .get(data_source_name)
            .ok_or_else(|| ProxyError::DataSourceNotFound(data_source_name.to_string()))?;
        Ok(tables.keys().cloned().collect())
    }

    async fn load_table(
        &self,
        data_source_name: &str,
        table_name: &str,
    ) -> Result<Option<TableMetaData>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.check_reachable(data_source_name, table_name)?;
        let data_sources = self.data_sources.read()?;
        let tables = data_sources
            .get(data_source_name)
            .ok_or_else(|| ProxyError::DataSourceNotFound(data_source_name.to_string()))?;
        Ok(tables.get(table_name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tables_and_failures() {
        let provider = InMemorySchemaProvider::new();
        provider.add_data_source("ds_1").unwrap();
        provider.put_table("ds_0", "t_order", TableMetaData::default()).unwrap();

        assert_eq!(provider.table_names("ds_0").await.unwrap(), vec!["t_order"]);
        assert!(provider.table_names("ds_1").await.unwrap().is_empty());
        assert!(provider.load_table("ds_0", "t_order").await.unwrap().is_some());
        assert!(provider.load_table("ds_0", "t_user").await.unwrap().is_none());
        assert!(matches!(
            provider.load_table("ds_9", "t_order").await,
            Err(ProxyError::DataSourceNotFound(_))
        ));

        provider.set_unreachable("ds_0", true).unwrap();
        assert!(matches!(
            provider.load_table("ds_0", "t_order").await,
            Err(ProxyError::MetaDataLoad(_, _))
        ));
        provider.set_unreachable("ds_0", false).unwrap();

        assert!(provider.drop_table("ds_0", "t_order").unwrap());
        assert!(!provider.drop_table("ds_0", "t_order").unwrap());
        assert_eq!(provider.load_count(), 4);
    }
}
