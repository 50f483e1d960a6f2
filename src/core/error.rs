use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Registry '{0}' is not available")]
    RegistryUnavailable(String),

    #[error("Operation on '{0}' timed out after {1} ms")]
    Timeout(String, u64),

    #[error("Failed to load metadata of table '{0}': {1}")]
    MetaDataLoad(String, String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Data source '{0}' not found")]
    DataSourceNotFound(String),

    #[error("Rule error: {0}")]
    Rule(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ProxyError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
