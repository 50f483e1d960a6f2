/// Parsed DDL statement, reduced to the names that affect schema metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlStatementContext {
    CreateTable(CreateTableContext),
    AlterTable(AlterTableContext),
    DropTable(DropTableContext),
    CreateIndex(CreateIndexContext),
    DropIndex(DropIndexContext),
    /// Anything that leaves metadata alone
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableContext {
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTableContext {
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTableContext {
    pub table_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexContext {
    pub table_name: String,
    /// `None` for anonymous indexes
    pub index_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndexContext {
    /// Owning table when the dialect names it
    pub table_name: Option<String>,
    pub index_names: Vec<String>,
}

impl SqlStatementContext {
    pub fn create_table(table_name: &str) -> Self {
        Self::CreateTable(CreateTableContext {
            table_name: table_name.to_string(),
        })
    }

    pub fn alter_table(table_name: &str) -> Self {
        Self::AlterTable(AlterTableContext {
            table_name: table_name.to_string(),
        })
    }

    pub fn drop_table(table_names: &[&str]) -> Self {
        Self::DropTable(DropTableContext {
            table_names: table_names.iter().map(|t| t.to_string()).collect(),
        })
    }

    pub fn create_index(table_name: &str, index_name: Option<&str>) -> Self {
        Self::CreateIndex(CreateIndexContext {
            table_name: table_name.to_string(),
            index_name: index_name.map(str::to_string),
        })
    }

    pub fn drop_index(table_name: Option<&str>, index_names: &[&str]) -> Self {
        Self::DropIndex(DropIndexContext {
            table_name: table_name.map(str::to_string),
            index_names: index_names.iter().map(|i| i.to_string()).collect(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "CREATE TABLE",
            Self::AlterTable(_) => "ALTER TABLE",
            Self::DropTable(_) => "DROP TABLE",
            Self::CreateIndex(_) => "CREATE INDEX",
            Self::DropIndex(_) => "DROP INDEX",
            Self::Other => "OTHER",
        }
    }
}
