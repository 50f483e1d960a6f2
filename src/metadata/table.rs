use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetaData {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    pub nullable: bool,
}

impl ColumnMetaData {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            nullable: true,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Shape of one logical table as seen by query planning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetaData {
    columns: Vec<ColumnMetaData>,
    indexes: BTreeSet<String>,
}

impl TableMetaData {
    pub fn new<I, S>(columns: Vec<ColumnMetaData>, indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns,
            indexes: indexes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnMetaData] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetaData> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn set_columns(&mut self, columns: Vec<ColumnMetaData>) {
        self.columns = columns;
    }

    pub fn indexes(&self) -> &BTreeSet<String> {
        &self.indexes
    }

    pub fn contains_index(&self, index_name: &str) -> bool {
        self.indexes.contains(index_name)
    }

    /// Returns false when the index was already present
    pub fn add_index(&mut self, index_name: impl Into<String>) -> bool {
        self.indexes.insert(index_name.into())
    }

    pub fn remove_index(&mut self, index_name: &str) -> bool {
        self.indexes.remove(index_name)
    }
}

/// Logical table name -> table metadata
///
/// Clones share the underlying map until one of them is mutated, so handing
/// a snapshot to a reader costs one reference count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMetas {
    tables: Arc<BTreeMap<String, TableMetaData>>,
}

impl TableMetas {
    pub fn new(tables: BTreeMap<String, TableMetaData>) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    pub fn get(&self, table_name: &str) -> Option<&TableMetaData> {
        self.tables.get(table_name)
    }

    pub fn get_mut(&mut self, table_name: &str) -> Option<&mut TableMetaData> {
        if !self.tables.contains_key(table_name) {
            return None;
        }
        Arc::make_mut(&mut self.tables).get_mut(table_name)
    }

    /// Inserts or overwrites
    pub fn put(&mut self, table_name: impl Into<String>, table: TableMetaData) {
        Arc::make_mut(&mut self.tables).insert(table_name.into(), table);
    }

    pub fn remove(&mut self, table_name: &str) -> Option<TableMetaData> {
        if !self.tables.contains_key(table_name) {
            return None;
        }
        Arc::make_mut(&mut self.tables).remove(table_name)
    }

    pub fn contains_table(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }

    pub fn contains_index(&self, table_name: &str, index_name: &str) -> bool {
        self.get(table_name)
            .is_some_and(|table| table.contains_index(index_name))
    }

    pub fn all_table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// First table, in name order, declaring `index_name`
    pub fn find_table_name_by_index(&self, index_name: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|(_, table)| table.contains_index(index_name))
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableMetaData)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }
}

impl FromIterator<(String, TableMetaData)> for TableMetas {
    fn from_iter<T: IntoIterator<Item = (String, TableMetaData)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> TableMetaData {
        TableMetaData::new(
            vec![
                ColumnMetaData::new("order_id", "bigint").primary_key(),
                ColumnMetaData::new("user_id", "int"),
            ],
            ["idx_user"],
        )
    }

    #[test]
    fn test_index_set_semantics() {
        let mut table = orders();
        assert!(table.add_index("idx_date"));
        assert!(!table.add_index("idx_date"));
        assert_eq!(table.indexes().len(), 2);
        assert!(table.remove_index("idx_date"));
        assert!(!table.remove_index("idx_date"));
    }

    #[test]
    fn test_column_lookup() {
        let table = orders();
        assert!(table.column("ORDER_ID").unwrap().primary_key);
        assert!(!table.column("order_id").unwrap().nullable);
        assert_eq!(table.column_names(), vec!["order_id", "user_id"]);
    }

    #[test]
    fn test_find_table_name_by_index() {
        let mut metas = TableMetas::default();
        metas.put("t_order", orders());
        metas.put("t_user", TableMetaData::default());

        assert_eq!(metas.find_table_name_by_index("idx_user"), Some("t_order"));
        assert_eq!(metas.find_table_name_by_index("missing"), None);
        assert!(metas.contains_index("t_order", "idx_user"));
    }

    #[test]
    fn test_snapshots_are_isolated() {
        let mut metas = TableMetas::default();
        metas.put("t_order", orders());
        let snapshot = metas.clone();

        metas.get_mut("t_order").unwrap().add_index("idx_date");
        metas.remove("t_missing");
        metas.put("t_user", TableMetaData::default());

        assert!(!snapshot.contains_index("t_order", "idx_date"));
        assert_eq!(snapshot.all_table_names(), vec!["t_order"]);
        assert_eq!(metas.all_table_names(), vec!["t_order", "t_user"]);
    }
}
