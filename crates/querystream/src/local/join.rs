use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::errors::Result;
use crate::expr::Expr;
use crate::expr::compiled::{CompiledExpr, LazyExpr};
use crate::query::{Query, RowSource};
use crate::stream::{SendableRowStream, cancellable};
use crate::value::ScalarValue;

/// Nested loop inner join.
///
/// For every outer row the inner query is enumerated again from the start,
/// and `then(outer, inner)` is produced for every inner row where
/// `when(outer, inner)` holds. All matches for one outer row are produced (in
/// inner order) before moving to the next outer row.
#[derive(Debug)]
pub struct LocalInnerJoin {
    outer: Query,
    inner: Query,
    when: Arc<LazyExpr>,
    then: Arc<LazyExpr>,
}

impl LocalInnerJoin {
    pub fn new(outer: Query, inner: Query, when: Expr, then: Expr) -> Self {
        LocalInnerJoin {
            outer,
            inner,
            when: Arc::new(LazyExpr::new(when, 2)),
            then: Arc::new(LazyExpr::new(then, 2)),
        }
    }
}

impl RowSource for LocalInnerJoin {
    fn open(&self, cancel: &CancellationToken) -> SendableRowStream {
        JoinStream {
            state: JoinState::Idle,
            outer: self.outer.clone(),
            inner: self.inner.clone(),
            when: self.when.clone(),
            then: self.then.clone(),
            cancel: cancel.clone(),
        }
        .boxed()
    }
}

struct JoinExprs {
    when: Arc<CompiledExpr>,
    then: Arc<CompiledExpr>,
}

enum JoinState {
    /// Nothing opened yet.
    Idle,
    /// Waiting on the next outer row.
    Initial {
        outer: SendableRowStream,
        exprs: JoinExprs,
    },
    /// Walking the inner rows for a single outer row.
    Scanning {
        outer: SendableRowStream,
        outer_row: ScalarValue,
        inner: SendableRowStream,
        exprs: JoinExprs,
    },
    Done,
    Error,
}

struct JoinStream {
    state: JoinState,
    outer: Query,
    inner: Query,
    when: Arc<LazyExpr>,
    then: Arc<LazyExpr>,
    cancel: CancellationToken,
}

impl JoinStream {
    fn compile(&self) -> Result<JoinExprs> {
        Ok(JoinExprs {
            when: self.when.get()?,
            then: self.then.get()?,
        })
    }
}

impl Stream for JoinStream {
    type Item = Result<ScalarValue>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.cancel.is_cancelled() {
                if matches!(
                    this.state,
                    JoinState::Initial { .. } | JoinState::Scanning { .. }
                ) {
                    trace!("join cancelled, releasing outer and inner streams");
                }
                this.state = JoinState::Done;
                return Poll::Ready(None);
            }

            // Every arm either puts a state back or leaves Done/Error in
            // place, dropping whatever streams it held.
            match mem::replace(&mut this.state, JoinState::Error) {
                JoinState::Idle => match this.compile() {
                    Ok(exprs) => {
                        let outer = cancellable(this.outer.stream(&this.cancel), &this.cancel);
                        this.state = JoinState::Initial { outer, exprs };
                    }
                    Err(e) => return Poll::Ready(Some(Err(e))),
                },
                JoinState::Initial { mut outer, exprs } => match outer.poll_next_unpin(cx) {
                    Poll::Pending => {
                        this.state = JoinState::Initial { outer, exprs };
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(Ok(outer_row))) => {
                        trace!(%outer_row, "join scanning inner for outer row");
                        let inner = cancellable(this.inner.stream(&this.cancel), &this.cancel);
                        this.state = JoinState::Scanning {
                            outer,
                            outer_row,
                            inner,
                            exprs,
                        };
                    }
                    Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                    Poll::Ready(None) => {
                        trace!("join outer exhausted");
                        this.state = JoinState::Done;
                        return Poll::Ready(None);
                    }
                },
                JoinState::Scanning {
                    outer,
                    outer_row,
                    mut inner,
                    exprs,
                } => match inner.poll_next_unpin(cx) {
                    Poll::Pending => {
                        this.state = JoinState::Scanning {
                            outer,
                            outer_row,
                            inner,
                            exprs,
                        };
                        return Poll::Pending;
                    }
                    Poll::Ready(Some(Ok(inner_row))) => {
                        let args = [&outer_row, &inner_row];
                        let matched = match exprs.when.eval_predicate(&args) {
                            Ok(matched) => matched,
                            Err(e) => return Poll::Ready(Some(Err(e))),
                        };
                        let output = if matched {
                            match exprs.then.eval(&args) {
                                Ok(output) => Some(output),
                                Err(e) => return Poll::Ready(Some(Err(e))),
                            }
                        } else {
                            None
                        };

                        this.state = JoinState::Scanning {
                            outer,
                            outer_row,
                            inner,
                            exprs,
                        };
                        if let Some(output) = output {
                            return Poll::Ready(Some(Ok(output)));
                        }
                    }
                    Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                    Poll::Ready(None) => {
                        trace!("join inner exhausted, advancing outer");
                        this.state = JoinState::Initial { outer, exprs };
                    }
                },
                JoinState::Done => {
                    this.state = JoinState::Done;
                    return Poll::Ready(None);
                }
                JoinState::Error => return Poll::Ready(None),
            }
        }
    }
}
