//! Table queries executed by a database, with filters pushed into the
//! command text.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt, ready};
use querystream::expr::Expr;
use querystream::stream::{SendableRowStream, cancellable};
use querystream::{
    PushDown, PushDownOp, QueryError, Result, RowSource, ScalarValue, StructValue,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::builder::SqlTextBuilder;
use crate::config::SqlOptions;
use crate::connection::{Connection, RowReader};
use crate::node::{QueryNode, find_root, merged_filter};
use crate::parameters::BoundParameter;
use crate::record::TableSchema;
use crate::translate::translate_expr;

/// Command text and parameters for a query, ready to be issued.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCommand {
    pub text: String,
    pub parameters: Vec<BoundParameter>,
}

/// Source reading rows from a table.
///
/// Filters are accumulated onto the query node chain and rendered into a
/// single WHERE clause. Projections and joins run locally over the rows.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    node: Arc<QueryNode>,
    options: SqlOptions,
}

impl SqlQuery {
    pub fn new(connection: Arc<dyn Connection>, table: TableSchema, options: SqlOptions) -> Self {
        SqlQuery {
            node: QueryNode::source(connection, table),
            options,
        }
    }

    pub fn node(&self) -> &Arc<QueryNode> {
        &self.node
    }

    /// New query with `predicate` appended to the filter chain.
    pub fn filter(&self, predicate: Expr) -> SqlQuery {
        SqlQuery {
            node: QueryNode::filter(self.node.clone(), predicate),
            options: self.options.clone(),
        }
    }

    /// Render the command for this query.
    pub fn prepare(&self) -> Result<PreparedCommand> {
        let root = find_root(&self.node)?;
        let dialect = root.connection.dialect();

        let mut binder = root.connection.driver_info().create_parameters();
        let predicate = match merged_filter(&self.node) {
            Some(expr) => Some(translate_expr(&expr, dialect, binder.as_mut())?),
            None => None,
        };

        let mut builder = SqlTextBuilder::new(dialect);
        builder
            .append_select(root.table.column_names())
            .append_from(&root.table);
        if let Some(predicate) = &predicate {
            builder.append_where(predicate);
        }

        Ok(PreparedCommand {
            text: builder.finish(),
            parameters: binder.into_parameters(),
        })
    }

    fn execute(
        &self,
        cancel: &CancellationToken,
    ) -> Result<BoxFuture<'static, Result<RowReader>>> {
        let root = find_root(&self.node)?;
        let prepared = self.prepare()?;
        debug!(
            text = %prepared.text,
            parameters = prepared.parameters.len(),
            "executing command"
        );

        let mut command = root.connection.create_command()?;
        command.set_text(&prepared.text);
        command.set_timeout(self.options.command_timeout);
        for param in prepared.parameters {
            command.add_parameter(param);
        }

        Ok(command.execute_reader(cancel))
    }
}

impl RowSource for SqlQuery {
    fn open(&self, cancel: &CancellationToken) -> SendableRowStream {
        let columns: Arc<[String]> = match find_root(&self.node) {
            Ok(root) => root.table.column_names().map(String::from).collect(),
            Err(_) => Arc::from([]),
        };
        let stream = SqlStream {
            state: SqlStreamState::Idle,
            query: self.clone(),
            columns,
            cancel: cancel.clone(),
        };
        cancellable(stream.boxed(), cancel)
    }

    fn supports_push_down(&self, kind: PushDown) -> bool {
        kind == PushDown::Filter
    }

    fn push_down(&self, op: PushDownOp) -> Result<Arc<dyn RowSource>> {
        match op {
            PushDownOp::Filter { predicate } => Ok(Arc::new(self.filter(predicate))),
            other => Err(QueryError::UnsupportedPushDown(other.kind().as_str())),
        }
    }
}

enum SqlStreamState {
    Idle,
    Executing {
        fut: BoxFuture<'static, Result<RowReader>>,
    },
    Reading {
        reader: RowReader,
    },
    Done,
    Error,
}

struct SqlStream {
    state: SqlStreamState,
    query: SqlQuery,
    columns: Arc<[String]>,
    cancel: CancellationToken,
}

impl SqlStream {
    fn row_to_value(&self, row: Vec<ScalarValue>) -> Result<ScalarValue> {
        if row.len() != self.columns.len() {
            return Err(QueryError::Internal(format!(
                "expected {} values per row, driver returned {}",
                self.columns.len(),
                row.len()
            )));
        }
        let fields: StructValue = self.columns.iter().cloned().zip(row).collect();
        Ok(ScalarValue::Struct(fields))
    }
}

impl Stream for SqlStream {
    type Item = Result<ScalarValue>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match &mut self.state {
                SqlStreamState::Idle => match self.query.execute(&self.cancel) {
                    Ok(fut) => self.state = SqlStreamState::Executing { fut },
                    Err(e) => {
                        self.state = SqlStreamState::Error;
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                SqlStreamState::Executing { fut } => match ready!(fut.poll_unpin(cx)) {
                    Ok(reader) => self.state = SqlStreamState::Reading { reader },
                    Err(e) => {
                        self.state = SqlStreamState::Error;
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                SqlStreamState::Reading { reader } => match ready!(reader.poll_next_unpin(cx)) {
                    Some(Ok(row)) => {
                        let result = self.row_to_value(row);
                        if result.is_err() {
                            self.state = SqlStreamState::Error;
                        }
                        return Poll::Ready(Some(result));
                    }
                    Some(Err(e)) => {
                        self.state = SqlStreamState::Error;
                        return Poll::Ready(Some(Err(e)));
                    }
                    None => {
                        self.state = SqlStreamState::Done;
                        return Poll::Ready(None);
                    }
                },
                SqlStreamState::Done | SqlStreamState::Error => return Poll::Ready(None),
            }
        }
    }
}
