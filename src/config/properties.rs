use serde::{Deserialize, Serialize};

/// Proxy-wide properties consumed by the metadata loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyProperties {
    /// Upper bound of physical connections a single metadata load may hold
    #[serde(default = "default_max_connections_size_per_query")]
    pub max_connections_size_per_query: usize,

    /// Verify that every actual table of a logic table has identical metadata
    #[serde(default)]
    pub check_table_metadata_enabled: bool,
}

fn default_max_connections_size_per_query() -> usize {
    1
}

impl ProxyProperties {
    pub fn max_connections_size_per_query(mut self, max: usize) -> Self {
        self.max_connections_size_per_query = max;
        self
    }

    pub fn check_table_metadata_enabled(mut self, enabled: bool) -> Self {
        self.check_table_metadata_enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections_size_per_query == 0 {
            return Err("max_connections_size_per_query must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for ProxyProperties {
    fn default() -> Self {
        Self {
            max_connections_size_per_query: default_max_connections_size_per_query(),
            check_table_metadata_enabled: false,
        }
    }
}
