use std::sync::Arc;

use futures::TryStreamExt;
use querystream::{Query, Result};
use tokio_util::sync::CancellationToken;

use crate::config::SqlOptions;
use crate::connection::Connection;
use crate::query::SqlQuery;
use crate::record::{Record, TableSchema, record_from_value};

/// Entry point for building table queries against a connection.
#[derive(Debug, Clone)]
pub struct DatabaseContext {
    connection: Arc<dyn Connection>,
    options: SqlOptions,
}

impl DatabaseContext {
    pub fn new(connection: Arc<dyn Connection>, options: SqlOptions) -> Self {
        DatabaseContext {
            connection,
            options,
        }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn options(&self) -> &SqlOptions {
        &self.options
    }

    /// Query every row of `table`. Rows are produced as structs keyed by
    /// column name.
    pub fn query(&self, table: TableSchema) -> Query {
        Query::new(SqlQuery::new(
            self.connection.clone(),
            table,
            self.options.clone(),
        ))
    }

    pub fn query_as<R: Record>(&self) -> Query {
        self.query(R::table())
    }
}

/// Enumerate `query` to completion, mapping every row into a record.
pub async fn collect_records<R: Record>(query: &Query) -> Result<Vec<R>> {
    query
        .stream(&CancellationToken::new())
        .and_then(|value| futures::future::ready(record_from_value(value)))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use querystream::expr::{col, lit};
    use querystream::{DataType, QueryError, ScalarValue, StructValue};

    use super::*;
    use crate::testutil::MemoryConnection;

    #[derive(Debug, PartialEq)]
    struct Item {
        sku: String,
        qty: i64,
    }

    impl Record for Item {
        fn table() -> TableSchema {
            TableSchema::new("items")
                .with_schema("inventory")
                .with_column("sku", DataType::Utf8)
                .with_column("qty", DataType::Int64)
        }

        fn from_row(row: StructValue) -> Result<Self> {
            let sku = row
                .get("sku")
                .ok_or_else(|| QueryError::Evaluation("missing sku".to_string()))?
                .try_as_str()?
                .to_string();
            let qty = row
                .get("qty")
                .ok_or_else(|| QueryError::Evaluation("missing qty".to_string()))?
                .try_as_i64()?;
            Ok(Item { sku, qty })
        }
    }

    #[tokio::test]
    async fn query_as_records() {
        let conn = MemoryConnection::default().with_rows(vec![
            vec!["a-1".into(), 4.into()],
            vec!["b-2".into(), 0.into()],
        ]);
        let db = DatabaseContext::new(Arc::new(conn.clone()), SqlOptions::default());

        let q = db.query_as::<Item>().filter(col("qty").gt_eq(lit(0)));
        let items: Vec<Item> = collect_records(&q).await.unwrap();

        assert_eq!(
            vec![
                Item {
                    sku: "a-1".to_string(),
                    qty: 4
                },
                Item {
                    sku: "b-2".to_string(),
                    qty: 0
                },
            ],
            items
        );
        assert_eq!(
            "SELECT sku, qty FROM inventory.items WHERE (qty >= ?)",
            conn.executed()[0].text
        );
    }

    #[tokio::test]
    async fn options_timeout_applied() {
        let conn = MemoryConnection::default();
        let options = SqlOptions::default().with_command_timeout(Duration::from_secs(2));
        let db = DatabaseContext::new(Arc::new(conn.clone()), options);

        db.query(TableSchema::new("t")).collect().await.unwrap();
        assert_eq!(Some(Duration::from_secs(2)), conn.executed()[0].timeout);
    }

    #[tokio::test]
    async fn record_mapping_error() {
        let conn =
            MemoryConnection::default().with_rows(vec![vec![ScalarValue::Null, 1.into()]]);
        let db = DatabaseContext::new(Arc::new(conn), SqlOptions::default());
        collect_records::<Item>(&db.query_as::<Item>())
            .await
            .unwrap_err();
    }
}
