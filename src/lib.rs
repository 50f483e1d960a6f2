//! Sharding proxy core: registry coordinated live schemas
//!
//! A [`ShardingSchema`] holds the active sharding rule and table metadata of
//! one logical schema. [`Orchestration`] connects it to a registry so rule
//! changes and data source state published by any instance reach every
//! instance, and executed DDL patches metadata in place.
//!
//! # Examples
//!
//! ```
//! use shardproxy::config::{DataSourceParameter, ProxyProperties};
//! use shardproxy::metadata::{ColumnMetaData, InMemorySchemaProvider, TableMetaData};
//! use shardproxy::parser::DdlParser;
//! use shardproxy::rule::ShardingRuleConfiguration;
//! use shardproxy::ShardingSchema;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! runtime.block_on(async {
//!     let provider = Arc::new(InMemorySchemaProvider::new());
//!     provider.put_table(
//!         "ds_0",
//!         "orders",
//!         TableMetaData::new(vec![ColumnMetaData::new("id", "bigint").primary_key()], ["idx_id"]),
//!     )?;
//!
//!     let data_sources = HashMap::from([(
//!         "ds_0".to_string(),
//!         DataSourceParameter::new("mysql://127.0.0.1/ds_0", "root", ""),
//!     )]);
//!     let schema = ShardingSchema::new(
//!         "sharding_db",
//!         data_sources,
//!         ShardingRuleConfiguration::default(),
//!         provider,
//!         ProxyProperties::default(),
//!     )
//!     .await?;
//!
//!     let ddl = DdlParser::new().parse_one("CREATE INDEX idx_date ON orders (created_at)")?;
//!     schema.refresh_table_meta_data(Some(&ddl)).await?;
//!     assert!(schema.table_meta("orders").await.unwrap().contains_index("idx_date"));
//!     Ok::<(), shardproxy::ProxyError>(())
//! })?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// ShardProxy Library
// ============================================================================

pub mod config;
pub mod core;
pub mod event;
pub mod facade;
pub mod metadata;
pub mod parser;
pub mod registry;
pub mod rule;
pub mod schema;
pub mod state;

// Re-export main types for convenience
pub use core::{ProxyError, Result};
pub use facade::Orchestration;
pub use registry::{RegistryRepository, RegistryRepositoryFactory};
pub use schema::ShardingSchema;
