use std::sync::Arc;

use querystream::{DataType, ScalarValue};
use querystream_sql::testutil::MemoryConnection;
use querystream_sql::{AnsiDialect, DatabaseContext, ParameterStyle, SqlOptions, TableSchema};

pub fn orders_table() -> TableSchema {
    TableSchema::new("orders")
        .with_schema("shop")
        .with_column("id", DataType::Int64)
        .with_column("customer_id", DataType::Int64)
        .with_column("total", DataType::Float64)
}

pub fn orders_rows() -> Vec<Vec<ScalarValue>> {
    vec![
        vec![1.into(), 10.into(), 25.0.into()],
        vec![2.into(), 11.into(), 120.5.into()],
        vec![3.into(), 10.into(), 310.0.into()],
        vec![4.into(), 12.into(), 99.0.into()],
    ]
}

/// Context over a postgres flavored in-memory connection serving orders.
pub fn orders_db() -> (DatabaseContext, MemoryConnection) {
    logutil::init_test();
    let conn =
        MemoryConnection::new(AnsiDialect, ParameterStyle::Numbered).with_rows(orders_rows());
    let db = DatabaseContext::new(Arc::new(conn.clone()), SqlOptions::default());
    (db, conn)
}
