// ============================================================================
// src/parser/adapter.rs - DDL contexts from sqlparser statements
// ============================================================================

use super::context::*;
use crate::core::{ProxyError, Result};
use sqlparser::ast as sql_ast;
use sqlparser::dialect::{Dialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

pub struct DdlParser {
    dialect: Box<dyn Dialect + Send + Sync>,
}

impl DdlParser {
    pub fn new() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    pub fn with_dialect(dialect: Box<dyn Dialect + Send + Sync>) -> Self {
        Self { dialect }
    }

    pub fn parse(&self, sql: &str) -> Result<Vec<SqlStatementContext>> {
        let statements = Parser::parse_sql(self.dialect.as_ref(), sql)
            .map_err(|e| ProxyError::Parse(e.to_string()))?;

        statements.iter().map(convert_statement).collect()
    }

    /// Parses exactly one statement
    pub fn parse_one(&self, sql: &str) -> Result<SqlStatementContext> {
        let mut contexts = self.parse(sql)?;
        if contexts.len() != 1 {
            return Err(ProxyError::Parse(format!(
                "Expected one statement, got {}",
                contexts.len()
            )));
        }
        Ok(contexts.remove(0))
    }
}

impl Default for DdlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_statement(stmt: &sql_ast::Statement) -> Result<SqlStatementContext> {
    match stmt {
        sql_ast::Statement::CreateTable(create) => {
            Ok(SqlStatementContext::CreateTable(CreateTableContext {
                table_name: extract_name(&create.name)?,
            }))
        }
        sql_ast::Statement::AlterTable { name, .. } => {
            Ok(SqlStatementContext::AlterTable(AlterTableContext {
                table_name: extract_name(name)?,
            }))
        }
        sql_ast::Statement::CreateIndex(ci) => {
            Ok(SqlStatementContext::CreateIndex(CreateIndexContext {
                table_name: extract_name(&ci.table_name)?,
                index_name: ci.name.as_ref().map(extract_name).transpose()?,
            }))
        }
        sql_ast::Statement::Drop {
            object_type,
            names,
            table,
            ..
        } => match object_type {
            sql_ast::ObjectType::Table => Ok(SqlStatementContext::DropTable(DropTableContext {
                table_names: extract_names(names)?,
            })),
            // `DROP INDEX ix ON t` (MySQL) names the owning table
            sql_ast::ObjectType::Index => Ok(SqlStatementContext::DropIndex(DropIndexContext {
                table_name: table.as_ref().map(extract_name).transpose()?,
                index_names: extract_names(names)?,
            })),
            _ => Ok(SqlStatementContext::Other),
        },
        _ => Ok(SqlStatementContext::Other),
    }
}

fn extract_names(names: &[sql_ast::ObjectName]) -> Result<Vec<String>> {
    names.iter().map(extract_name).collect()
}

/// Last part of a possibly schema-qualified name, without quotes
fn extract_name(name: &sql_ast::ObjectName) -> Result<String> {
    name.0
        .last()
        .map(|ident| {
            ident
                .to_string()
                .trim_matches(|c| c == '"' || c == '`')
                .to_string()
        })
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ProxyError::Parse("Invalid object name".into()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::MySqlDialect;

    #[test]
    fn test_parse_table_statements() {
        let parser = DdlParser::new();

        assert_eq!(
            parser
                .parse_one("CREATE TABLE products (id INT PRIMARY KEY, name VARCHAR(64))")
                .unwrap(),
            SqlStatementContext::create_table("products")
        );
        assert_eq!(
            parser.parse_one("ALTER TABLE public.orders ADD COLUMN note TEXT").unwrap(),
            SqlStatementContext::alter_table("orders")
        );
        assert_eq!(
            parser.parse_one("DROP TABLE IF EXISTS users, \"Items\"").unwrap(),
            SqlStatementContext::drop_table(&["users", "Items"])
        );
    }

    #[test]
    fn test_parse_index_statements() {
        let parser = DdlParser::new();

        assert_eq!(
            parser.parse_one("CREATE INDEX idx_date ON orders (created_at)").unwrap(),
            SqlStatementContext::create_index("orders", Some("idx_date"))
        );
        assert_eq!(
            parser.parse_one("CREATE INDEX ON orders (created_at)").unwrap(),
            SqlStatementContext::create_index("orders", None)
        );
        assert_eq!(
            parser.parse_one("DROP INDEX idx_a, idx_b").unwrap(),
            SqlStatementContext::drop_index(None, &["idx_a", "idx_b"])
        );
    }

    #[test]
    fn test_drop_index_keeps_owning_table() {
        let parser = DdlParser::with_dialect(Box::new(MySqlDialect {}));

        assert_eq!(
            parser.parse_one("DROP INDEX ix_a ON t2").unwrap(),
            SqlStatementContext::drop_index(Some("t2"), &["ix_a"])
        );
        assert_eq!(
            parser.parse_one("DROP INDEX ix_a ON shop.`t_order`").unwrap(),
            SqlStatementContext::drop_index(Some("t_order"), &["ix_a"])
        );
    }

    #[test]
    fn test_non_ddl_is_other() {
        let parser = DdlParser::new();
        let contexts = parser
            .parse("SELECT 1; INSERT INTO orders VALUES (1); DROP VIEW v")
            .unwrap();

        assert_eq!(contexts, vec![SqlStatementContext::Other; 3]);
    }

    #[test]
    fn test_parse_error() {
        let parser = DdlParser::new();
        assert!(matches!(parser.parse("CREATE TABLE"), Err(ProxyError::Parse(_))));
        assert!(parser.parse_one("SELECT 1; SELECT 2").is_err());
    }
}
