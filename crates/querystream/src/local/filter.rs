use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt, ready};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::errors::Result;
use crate::expr::Expr;
use crate::expr::compiled::{CompiledExpr, LazyExpr};
use crate::query::{Query, RowSource};
use crate::stream::{SendableRowStream, cancellable};
use crate::value::ScalarValue;

/// Filter applied to rows pulled from another query.
#[derive(Debug)]
pub struct LocalFilter {
    input: Query,
    predicate: Arc<LazyExpr>,
}

impl LocalFilter {
    pub fn new(input: Query, predicate: Expr) -> Self {
        LocalFilter {
            input,
            predicate: Arc::new(LazyExpr::new(predicate, 1)),
        }
    }

    pub fn predicate(&self) -> &Expr {
        self.predicate.expr()
    }
}

impl RowSource for LocalFilter {
    fn open(&self, cancel: &CancellationToken) -> SendableRowStream {
        FilterStream {
            state: FilterState::Idle,
            input: self.input.clone(),
            predicate: self.predicate.clone(),
            cancel: cancel.clone(),
        }
        .boxed()
    }
}

enum FilterState {
    Idle,
    Open {
        upstream: SendableRowStream,
        predicate: Arc<CompiledExpr>,
    },
    Done,
    Error,
}

struct FilterStream {
    state: FilterState,
    input: Query,
    predicate: Arc<LazyExpr>,
    cancel: CancellationToken,
}

impl Stream for FilterStream {
    type Item = Result<ScalarValue>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.cancel.is_cancelled() {
                if matches!(this.state, FilterState::Open { .. }) {
                    trace!("filter cancelled");
                }
                this.state = FilterState::Done;
                return Poll::Ready(None);
            }

            match &mut this.state {
                FilterState::Idle => match this.predicate.get() {
                    Ok(predicate) => {
                        let upstream = cancellable(this.input.stream(&this.cancel), &this.cancel);
                        this.state = FilterState::Open {
                            upstream,
                            predicate,
                        };
                    }
                    Err(e) => {
                        this.state = FilterState::Error;
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                FilterState::Open {
                    upstream,
                    predicate,
                } => match ready!(upstream.poll_next_unpin(cx)) {
                    Some(Ok(row)) => match predicate.eval_predicate(&[&row]) {
                        Ok(true) => return Poll::Ready(Some(Ok(row))),
                        Ok(false) => continue,
                        Err(e) => {
                            this.state = FilterState::Error;
                            return Poll::Ready(Some(Err(e)));
                        }
                    },
                    Some(Err(e)) => {
                        this.state = FilterState::Error;
                        return Poll::Ready(Some(Err(e)));
                    }
                    None => {
                        this.state = FilterState::Done;
                        return Poll::Ready(None);
                    }
                },
                FilterState::Done | FilterState::Error => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::TryStreamExt;

    use super::*;
    use crate::expr::{lit, var};
    use crate::testutil::{CountingSource, StalledSource};

    #[tokio::test]
    async fn keeps_even_numbers() {
        let counting = CountingSource::new(Query::from_values(0..10i64));
        let q = Query::new(counting.clone()).filter(var(0).rem(lit(2)).eq(lit(0)));

        let out = q.collect().await.unwrap();
        let expected: Vec<ScalarValue> = [0, 2, 4, 6, 8]
            .into_iter()
            .map(ScalarValue::from)
            .collect();
        assert_eq!(expected, out);
        assert_eq!(1, counting.opened());
    }

    #[tokio::test]
    async fn each_enumeration_is_independent() {
        let q = Query::from_values(1..=4i64).filter(var(0).gt(lit(2)));
        let cancel = CancellationToken::new();
        let mut a = q.stream(&cancel);
        let mut b = q.stream(&cancel);

        assert_eq!(ScalarValue::Int64(3), a.next().await.unwrap().unwrap());
        assert_eq!(ScalarValue::Int64(3), b.next().await.unwrap().unwrap());
        assert_eq!(ScalarValue::Int64(4), a.next().await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn evaluation_error_ends_stream() {
        let counting = CountingSource::new(Query::from_values([1, 2, 3]));
        let q = Query::new(counting.clone()).filter(var(0).div(lit(0)).eq(lit(1)));

        let mut s = q.stream(&CancellationToken::new());
        s.next().await.unwrap().unwrap_err();
        assert!(s.next().await.is_none());
        assert_eq!(1, counting.opened());
        assert_eq!(1, counting.dropped());
    }

    #[tokio::test]
    async fn compile_error_is_yielded() {
        let counting = CountingSource::new(Query::from_values([1]));
        let q = Query::new(counting.clone()).filter(var(1).eq(lit(1)));

        let err = q.collect().await.unwrap_err();
        assert!(err.to_string().contains("argument 1"), "{err}");
        assert_eq!(0, counting.opened());
    }

    #[tokio::test]
    async fn cancel_releases_upstream() {
        let counting = CountingSource::new(Query::from_values(1..=10i64));
        let q = Query::new(counting.clone()).filter(var(0).gt(lit(0)));

        let cancel = CancellationToken::new();
        let mut s = q.stream(&cancel);
        s.next().await.unwrap().unwrap();
        cancel.cancel();
        assert!(s.next().await.is_none());
        assert_eq!(counting.opened(), counting.dropped());
    }

    #[tokio::test]
    async fn predicate_compiled_once_across_enumerations() {
        let filter = LocalFilter::new(Query::from_values([1, 2]), var(0).eq(lit(2)));
        assert!(!filter.predicate.is_compiled());

        let cancel = CancellationToken::new();
        let first: Vec<_> = filter.open(&cancel).try_collect().await.unwrap();
        let compiled = filter.predicate.get().unwrap();
        let second: Vec<_> = filter.open(&cancel).try_collect().await.unwrap();

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&compiled, &filter.predicate.get().unwrap()));
    }

    #[tokio::test]
    async fn cancel_wakes_filter_over_stalled_source() {
        let q = Query::new(StalledSource).filter(var(0).gt(lit(0)));

        let cancel = CancellationToken::new();
        let mut s = q.stream(&cancel);
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let next = tokio::time::timeout(Duration::from_millis(500), s.next()).await;
        assert!(matches!(next, Ok(None)));
    }
}
