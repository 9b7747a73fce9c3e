//! Table descriptions and mapping of rows into typed records.

use querystream::{DataType, QueryError, Result, ScalarValue, StructValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
}

/// The table a query reads from, along with the columns to select.
///
/// Column order is the order values are expected in each row returned by
/// the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        TableSchema {
            schema: None,
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_column(mut self, name: impl Into<String>, datatype: DataType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            datatype,
        });
        self
    }

    /// Schema (if any) and table name, for quoting.
    pub fn path(&self) -> Vec<&str> {
        self.schema
            .iter()
            .map(|s| s.as_str())
            .chain(std::iter::once(self.name.as_str()))
            .collect()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// A type that can be read from a table.
pub trait Record: Sized {
    fn table() -> TableSchema;

    fn from_row(row: StructValue) -> Result<Self>;
}

/// Map a single element read through a table query into a record.
pub fn record_from_value<R: Record>(value: ScalarValue) -> Result<R> {
    match value {
        ScalarValue::Struct(row) => R::from_row(row),
        other => Err(QueryError::Evaluation(format!(
            "Expected a row to map into a record, got {}",
            other.datatype()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    impl Record for User {
        fn table() -> TableSchema {
            TableSchema::new("users")
                .with_column("id", DataType::Int64)
                .with_column("name", DataType::Utf8)
        }

        fn from_row(mut row: StructValue) -> Result<Self> {
            let id = row.take("id").unwrap_or(ScalarValue::Null).try_as_i64()?;
            let name = match row.take("name") {
                Some(ScalarValue::Utf8(name)) => name,
                other => {
                    return Err(QueryError::Evaluation(format!(
                        "invalid name: {other:?}"
                    )));
                }
            };
            Ok(User { id, name })
        }
    }

    #[test]
    fn table_path() {
        assert_eq!(vec!["users"], User::table().path());
        assert_eq!(
            vec!["dbo", "users"],
            User::table().with_schema("dbo").path()
        );
        assert_eq!(
            vec!["id", "name"],
            User::table().column_names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn map_row_to_record() {
        let row = StructValue::new().with_field("id", 3).with_field("name", "ada");
        let user: User = record_from_value(row.into()).unwrap();
        assert_eq!(
            User {
                id: 3,
                name: "ada".to_string()
            },
            user
        );
    }

    #[test]
    fn non_row_value_errors() {
        record_from_value::<User>(ScalarValue::Int64(1)).unwrap_err();
    }

    #[test]
    fn schema_from_json() {
        let schema: TableSchema = serde_json::from_str(
            r#"{"schema": null, "name": "t", "columns": [{"name": "a", "datatype": "Int64"}]}"#,
        )
        .unwrap();
        assert_eq!(TableSchema::new("t").with_column("a", DataType::Int64), schema);
    }
}
