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

/// Maps each row of another query through a projection.
#[derive(Debug)]
pub struct LocalProjector {
    input: Query,
    projection: Arc<LazyExpr>,
}

impl LocalProjector {
    pub fn new(input: Query, projection: Expr) -> Self {
        LocalProjector {
            input,
            projection: Arc::new(LazyExpr::new(projection, 1)),
        }
    }
}

impl RowSource for LocalProjector {
    fn open(&self, cancel: &CancellationToken) -> SendableRowStream {
        ProjectStream {
            state: ProjectState::Idle,
            input: self.input.clone(),
            projection: self.projection.clone(),
            cancel: cancel.clone(),
        }
        .boxed()
    }
}

enum ProjectState {
    Idle,
    Open {
        upstream: SendableRowStream,
        projection: Arc<CompiledExpr>,
    },
    Done,
    Error,
}

struct ProjectStream {
    state: ProjectState,
    input: Query,
    projection: Arc<LazyExpr>,
    cancel: CancellationToken,
}

impl Stream for ProjectStream {
    type Item = Result<ScalarValue>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.cancel.is_cancelled() {
                if matches!(this.state, ProjectState::Open { .. }) {
                    trace!("projection cancelled");
                }
                this.state = ProjectState::Done;
                return Poll::Ready(None);
            }

            match &mut this.state {
                ProjectState::Idle => match this.projection.get() {
                    Ok(projection) => {
                        let upstream = cancellable(this.input.stream(&this.cancel), &this.cancel);
                        this.state = ProjectState::Open {
                            upstream,
                            projection,
                        };
                    }
                    Err(e) => {
                        this.state = ProjectState::Error;
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                ProjectState::Open {
                    upstream,
                    projection,
                } => {
                    let result = match ready!(upstream.poll_next_unpin(cx)) {
                        Some(Ok(row)) => projection.eval(&[&row]),
                        Some(Err(e)) => Err(e),
                        None => {
                            this.state = ProjectState::Done;
                            return Poll::Ready(None);
                        }
                    };
                    if result.is_err() {
                        this.state = ProjectState::Error;
                    }
                    return Poll::Ready(Some(result));
                }
                ProjectState::Done | ProjectState::Error => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::expr::{col, lit, tuple, var};
    use crate::testutil::{CountingSource, StalledSource};
    use crate::value::StructValue;

    #[tokio::test]
    async fn doubles_each_element() {
        let q = Query::from_values(0..10i64).project(var(0).mul(lit(2)));
        let out = q.collect().await.unwrap();
        let expected: Vec<ScalarValue> = (0..10i64).map(|i| ScalarValue::Int64(i * 2)).collect();
        assert_eq!(expected, out);
    }

    #[tokio::test]
    async fn project_struct_members() {
        let rows = [
            StructValue::new().with_field("id", 1).with_field("name", "a"),
            StructValue::new().with_field("id", 2).with_field("name", "b"),
        ];
        let q = Query::from_values(rows).project(tuple([col("name"), col("id")]));
        let out = q.collect().await.unwrap();
        assert_eq!(
            vec![ScalarValue::from(("a", 1)), ScalarValue::from(("b", 2))],
            out
        );
    }

    #[tokio::test]
    async fn filter_then_project_composes() {
        let q = Query::from_values(1..=6i64)
            .filter(var(0).gt(lit(3)))
            .project(var(0).sub(lit(3)));
        let out = q.collect().await.unwrap();
        assert_eq!(
            vec![
                ScalarValue::Int64(1),
                ScalarValue::Int64(2),
                ScalarValue::Int64(3)
            ],
            out
        );
    }

    #[tokio::test]
    async fn evaluation_error_releases_upstream() {
        let counting = CountingSource::new(Query::from_values([
            ScalarValue::from(1),
            ScalarValue::from("x"),
        ]));
        let q = Query::new(counting.clone()).project(var(0).add(lit(1)));

        let mut s = q.stream(&CancellationToken::new());
        assert_eq!(ScalarValue::Int64(2), s.next().await.unwrap().unwrap());
        s.next().await.unwrap().unwrap_err();
        assert!(s.next().await.is_none());
        assert_eq!(1, counting.dropped());
    }

    #[tokio::test]
    async fn cancel_wakes_projection_over_stalled_source() {
        let q = Query::new(StalledSource).project(var(0).mul(lit(2)));

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
