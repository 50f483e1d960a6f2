use crate::config::{DataSourceParameter, DataSourceUrl};
use crate::core::{ProxyError, Result};
use std::collections::{BTreeMap, HashMap};

/// Where a physical data source lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceMetaData {
    pub host: String,
    pub port: Option<u16>,
    pub catalog: String,
}

impl From<DataSourceUrl> for DataSourceMetaData {
    fn from(url: DataSourceUrl) -> Self {
        Self {
            host: url.host,
            port: url.port,
            catalog: url.catalog,
        }
    }
}

/// Physical topology of one logical schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceMetas {
    data_sources: BTreeMap<String, DataSourceMetaData>,
}

impl DataSourceMetas {
    pub fn new(data_sources: &HashMap<String, DataSourceParameter>) -> Result<Self> {
        let data_sources = data_sources
            .iter()
            .map(|(name, parameter)| {
                DataSourceParameter::parse_url(&parameter.url)
                    .map(|url| (name.clone(), DataSourceMetaData::from(url)))
                    .map_err(|e| ProxyError::Config(format!("Data source '{}': {}", name, e)))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self { data_sources })
    }

    pub fn get(&self, data_source_name: &str) -> Option<&DataSourceMetaData> {
        self.data_sources.get(data_source_name)
    }

    pub fn all_data_source_names(&self) -> Vec<&str> {
        self.data_sources.keys().map(String::as_str).collect()
    }

    /// Name of the first data source living on the same host, port and catalog
    pub fn find_by_location(&self, host: &str, port: Option<u16>, catalog: &str) -> Option<&str> {
        self.data_sources
            .iter()
            .find(|(_, meta)| meta.host == host && meta.port == port && meta.catalog == catalog)
            .map(|(name, _)| name.as_str())
    }
}
