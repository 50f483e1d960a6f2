pub mod adapter;
pub mod context;

pub use adapter::DdlParser;
pub use context::{
    AlterTableContext, CreateIndexContext, CreateTableContext, DropIndexContext, DropTableContext,
    SqlStatementContext,
};
