// ============================================================================
// Schema Metadata
// ============================================================================
//
// Logical table shapes and physical data source topology of one schema,
// with the loaders that build them from the physical databases.
//
// ============================================================================

pub mod datasource;
pub mod encrypt;
pub mod loader;
pub mod memory;
pub mod table;

pub use datasource::{DataSourceMetaData, DataSourceMetas};
pub use encrypt::EncryptTableMetaDataDecorator;
pub use loader::{
    PhysicalSchemaProvider, ShardingTableMetaDataLoader, TableMetaDataDecorator,
    TableMetaDataInitializer, TableMetaDataInitializerEntry,
};
pub use memory::InMemorySchemaProvider;
pub use table::{ColumnMetaData, TableMetaData, TableMetas};

/// Physical topology paired with logical table shapes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingSphereMetaData {
    data_sources: DataSourceMetas,
    tables: TableMetas,
}

impl ShardingSphereMetaData {
    pub fn new(data_sources: DataSourceMetas, tables: TableMetas) -> Self {
        Self { data_sources, tables }
    }

    pub fn data_sources(&self) -> &DataSourceMetas {
        &self.data_sources
    }

    pub fn tables(&self) -> &TableMetas {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut TableMetas {
        &mut self.tables
    }
}
