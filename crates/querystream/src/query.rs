use std::fmt;
use std::sync::Arc;

use futures::stream;
use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{QueryError, Result};
use crate::expr::Expr;
use crate::local::{LocalFilter, LocalInnerJoin, LocalProjector};
use crate::stream::{SendableRowStream, cancellable};
use crate::value::ScalarValue;

/// Operators a source may be able to execute natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushDown {
    Filter,
    Project,
    InnerJoin,
}

impl PushDown {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Project => "project",
            Self::InnerJoin => "inner join",
        }
    }
}

impl fmt::Display for PushDown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An operator handed to a source that advertised support for it.
#[derive(Debug, Clone)]
pub enum PushDownOp {
    Filter {
        predicate: Expr,
    },
    Project {
        projection: Expr,
    },
    InnerJoin {
        inner: Query,
        when: Expr,
        then: Expr,
    },
}

impl PushDownOp {
    pub fn kind(&self) -> PushDown {
        match self {
            Self::Filter { .. } => PushDown::Filter,
            Self::Project { .. } => PushDown::Project,
            Self::InnerJoin { .. } => PushDown::InnerJoin,
        }
    }
}

/// Something that can produce a fresh stream of elements on demand.
///
/// Sources are immutable descriptions; every call to `open` starts an
/// independent enumeration with its own state.
pub trait RowSource: fmt::Debug + Sync + Send {
    /// Start a new enumeration.
    ///
    /// The returned stream must end (not error) once `cancel` is triggered.
    fn open(&self, cancel: &CancellationToken) -> SendableRowStream;

    /// Whether this source can absorb `kind` into its own query.
    fn supports_push_down(&self, _kind: PushDown) -> bool {
        false
    }

    /// Produce a new source with `op` applied natively.
    ///
    /// Only called when `supports_push_down` returned true for the op's
    /// kind.
    fn push_down(&self, op: PushDownOp) -> Result<Arc<dyn RowSource>> {
        Err(QueryError::UnsupportedPushDown(op.kind().as_str()))
    }
}

/// A composable, unmaterialized query.
///
/// Cheap to clone. Composing operators never enumerates anything, work only
/// happens when a stream is opened.
#[derive(Debug, Clone)]
pub struct Query {
    source: Arc<dyn RowSource>,
}

impl Query {
    pub fn new(source: impl RowSource + 'static) -> Self {
        Query {
            source: Arc::new(source),
        }
    }

    pub fn from_source(source: Arc<dyn RowSource>) -> Self {
        Query { source }
    }

    /// Query over a fixed set of in-memory values.
    pub fn from_values<V>(values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<ScalarValue>,
    {
        Query::new(MemorySource::new(values))
    }

    pub fn source(&self) -> &Arc<dyn RowSource> {
        &self.source
    }

    /// Keep only the elements for which `predicate` evaluates to true.
    ///
    /// The predicate takes a single argument, the element.
    pub fn filter(&self, predicate: Expr) -> Query {
        if self.source.supports_push_down(PushDown::Filter) {
            debug!(%predicate, "pushing down filter");
            return self.push_down_or_local(PushDownOp::Filter { predicate });
        }
        debug!(%predicate, "applying filter locally");
        Query::new(LocalFilter::new(self.clone(), predicate))
    }

    /// Map every element through `projection`.
    pub fn project(&self, projection: Expr) -> Query {
        if self.source.supports_push_down(PushDown::Project) {
            debug!(%projection, "pushing down projection");
            return self.push_down_or_local(PushDownOp::Project { projection });
        }
        debug!(%projection, "applying projection locally");
        Query::new(LocalProjector::new(self.clone(), projection))
    }

    /// Inner join this query (outer) with `inner`.
    ///
    /// `when` and `then` take two arguments, the outer element (0) and the
    /// inner element (1). Every match produces `then(outer, inner)`.
    pub fn inner_join(&self, inner: &Query, when: Expr, then: Expr) -> Query {
        if self.source.supports_push_down(PushDown::InnerJoin) {
            debug!(%when, %then, "pushing down inner join");
            return self.push_down_or_local(PushDownOp::InnerJoin {
                inner: inner.clone(),
                when,
                then,
            });
        }
        debug!(%when, %then, "applying inner join locally");
        Query::new(LocalInnerJoin::new(self.clone(), inner.clone(), when, then))
    }

    fn push_down_or_local(&self, op: PushDownOp) -> Query {
        match self.source.push_down(op.clone()) {
            Ok(source) => Query { source },
            Err(e) => {
                // Source advertised support but refused, fall back.
                debug!(%e, kind = %op.kind(), "push down refused, applying locally");
                match op {
                    PushDownOp::Filter { predicate } => {
                        Query::new(LocalFilter::new(self.clone(), predicate))
                    }
                    PushDownOp::Project { projection } => {
                        Query::new(LocalProjector::new(self.clone(), projection))
                    }
                    PushDownOp::InnerJoin { inner, when, then } => {
                        Query::new(LocalInnerJoin::new(self.clone(), inner, when, then))
                    }
                }
            }
        }
    }

    /// Open a new enumeration of this query.
    pub fn stream(&self, cancel: &CancellationToken) -> SendableRowStream {
        self.source.open(cancel)
    }

    /// Enumerate the query to completion.
    pub async fn collect(&self) -> Result<Vec<ScalarValue>> {
        self.stream(&CancellationToken::new()).try_collect().await
    }
}

/// Source over values held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    values: Arc<[ScalarValue]>,
}

impl MemorySource {
    pub fn new<V>(values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<ScalarValue>,
    {
        MemorySource {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl RowSource for MemorySource {
    fn open(&self, cancel: &CancellationToken) -> SendableRowStream {
        let values = self.values.clone();
        let rows = stream::iter((0..values.len()).map(move |idx| Ok(values[idx].clone())));
        cancellable(rows.boxed(), cancel)
    }
}
