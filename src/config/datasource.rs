use serde::{Deserialize, Serialize};

/// Physical data source parameters
///
/// Similar to a JDBC/DSN descriptor: one per physical database behind the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceParameter {
    /// Connection url, `scheme://host[:port]/catalog[?options]`
    pub url: String,

    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,

    #[serde(default = "default_min_pool_size")]
    pub min_pool_size: usize,
}

fn default_connection_timeout_ms() -> u64 {
    30_000
}

fn default_max_pool_size() -> usize {
    50
}

fn default_min_pool_size() -> usize {
    1
}

/// Host, port and catalog extracted from a data source url
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceUrl {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub catalog: String,
}

impl DataSourceParameter {
    pub fn new(url: &str, username: &str, password: &str) -> Self {
        Self {
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            connection_timeout_ms: default_connection_timeout_ms(),
            max_pool_size: default_max_pool_size(),
            min_pool_size: default_min_pool_size(),
        }
    }

    /// Set maximum pool size
    pub fn max_pool_size(mut self, max: usize) -> Self {
        self.max_pool_size = max;
        self
    }

    /// Set minimum pool size
    pub fn min_pool_size(mut self, min: usize) -> Self {
        self.min_pool_size = min;
        self
    }

    /// Set connection timeout
    pub fn connection_timeout_ms(mut self, timeout: u64) -> Self {
        self.connection_timeout_ms = timeout;
        self
    }

    /// Parse the url
    ///
    /// Format: `scheme://host[:port]/catalog[?options]`, an optional
    /// `jdbc:` prefix is accepted.
    ///
    /// # Examples
    ///
    /// ```
    /// use shardproxy::config::DataSourceParameter;
    ///
    /// let url = DataSourceParameter::parse_url("mysql://127.0.0.1/demo_ds_0").unwrap();
    /// assert_eq!(url.port, Some(3306));
    /// assert_eq!(url.catalog, "demo_ds_0");
    /// ```
    pub fn parse_url(url: &str) -> Result<DataSourceUrl, String> {
        let url = url.strip_prefix("jdbc:").unwrap_or(url);

        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(format!("Invalid data source url '{}': missing scheme", url));
        };
        if scheme.is_empty() {
            return Err(format!("Invalid data source url '{}': empty scheme", url));
        }

        let rest = rest.split('?').next().unwrap_or_default();
        let Some((host_port, catalog)) = rest.split_once('/') else {
            return Err(format!("Invalid data source url '{}': missing catalog", url));
        };

        let (host, port) = match host_port.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("Invalid port '{}' in data source url", port))?;
                (host, Some(port))
            }
            None => (host_port, default_port(scheme)),
        };

        if host.is_empty() {
            return Err(format!("Invalid data source url '{}': empty host", url));
        }

        Ok(DataSourceUrl {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            catalog: catalog.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() {
            return Err("Username cannot be empty".to_string());
        }

        if self.max_pool_size == 0 {
            return Err("max_pool_size must be > 0".to_string());
        }

        if self.min_pool_size > self.max_pool_size {
            return Err("min_pool_size cannot exceed max_pool_size".to_string());
        }

        Self::parse_url(&self.url).map(|_| ())
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "mysql" | "mariadb" => Some(3306),
        "postgresql" | "postgres" => Some(5432),
        "sqlserver" => Some(1433),
        "oracle" => Some(1521),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        let url = DataSourceParameter::parse_url(
            "jdbc:postgresql://db.example.com:6432/orders?sslmode=disable",
        )
        .unwrap();

        assert_eq!(url.scheme, "postgresql");
        assert_eq!(url.host, "db.example.com");
        assert_eq!(url.port, Some(6432));
        assert_eq!(url.catalog, "orders");
    }

    #[test]
    fn test_parse_url_default_port() {
        let url = DataSourceParameter::parse_url("mysql://localhost/ds_0").unwrap();
        assert_eq!(url.port, Some(3306));

        let url = DataSourceParameter::parse_url("h2://mem/ds_0").unwrap();
        assert_eq!(url.port, None);
    }

    #[test]
    fn test_invalid_url() {
        assert!(DataSourceParameter::parse_url("localhost/ds_0").is_err());
        assert!(DataSourceParameter::parse_url("mysql://localhost").is_err());
        assert!(DataSourceParameter::parse_url("mysql://localhost:abc/ds").is_err());
        assert!(DataSourceParameter::parse_url("mysql://:3306/ds").is_err());
    }

    #[test]
    fn test_validate() {
        let valid = DataSourceParameter::new("mysql://localhost/ds_0", "root", "");
        assert!(valid.validate().is_ok());

        let invalid_pool = DataSourceParameter::new("mysql://localhost/ds_0", "root", "")
            .min_pool_size(10)
            .max_pool_size(5);
        assert!(invalid_pool.validate().is_err());

        let invalid_user = DataSourceParameter::new("mysql://localhost/ds_0", "", "");
        assert!(invalid_user.validate().is_err());
    }
}
