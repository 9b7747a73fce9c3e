use crate::dialect::Dialect;
use crate::record::TableSchema;

/// Assembles command text clause by clause.
#[derive(Debug)]
pub struct SqlTextBuilder<'a> {
    dialect: &'a dyn Dialect,
    buf: String,
}

impl<'a> SqlTextBuilder<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        SqlTextBuilder {
            dialect,
            buf: String::new(),
        }
    }

    /// Select the given columns, or `*` if there are none.
    pub fn append_select<'c>(&mut self, columns: impl IntoIterator<Item = &'c str>) -> &mut Self {
        let columns: Vec<_> = columns
            .into_iter()
            .map(|col| self.dialect.quote_identifier(col))
            .collect();
        self.buf.push_str("SELECT ");
        if columns.is_empty() {
            self.buf.push('*');
        } else {
            self.buf.push_str(&columns.join(", "));
        }
        self
    }

    pub fn append_from(&mut self, table: &TableSchema) -> &mut Self {
        self.buf.push_str(" FROM ");
        self.buf.push_str(&self.dialect.quote_path(&table.path()));
        self
    }

    /// Append a WHERE clause for an already translated predicate.
    pub fn append_where(&mut self, predicate: &str) -> &mut Self {
        self.buf.push_str(" WHERE ");
        self.buf.push_str(predicate);
        self
    }

    pub fn finish(self) -> String {
        self.buf
    }
}
