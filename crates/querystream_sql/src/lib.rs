//! SQL backed sources for `querystream`.
//!
//! Filters applied to a table query are translated into a parameterized
//! WHERE clause and executed by the database. Everything else runs locally
//! over the returned rows.

pub mod builder;
pub mod config;
pub mod connection;
pub mod database;
pub mod dialect;
pub mod node;
pub mod parameters;
pub mod query;
pub mod record;
pub mod testutil;
pub mod translate;

pub use config::SqlOptions;
pub use connection::{Command, Connection, DriverInfo, ParameterStyle, RowReader};
pub use database::{DatabaseContext, collect_records};
pub use dialect::{AnsiDialect, Dialect, GenericDialect, MssqlDialect, MysqlDialect};
pub use node::{QueryNode, find_root, merged_filter};
pub use parameters::{
    BoundParameter, NamedBinder, NumberedBinder, ParameterBinder, PositionalBinder,
};
pub use query::{PreparedCommand, SqlQuery};
pub use record::{Column, Record, TableSchema};
pub use translate::translate_expr;
