use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt, ready};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::trace;

use crate::errors::{QueryError, Result};
use crate::value::ScalarValue;

/// A lazily pulled sequence of elements.
///
/// Each poll may suspend on I/O. Dropping the stream releases any resources
/// held by it, including nested upstream streams.
pub type SendableRowStream = BoxStream<'static, Result<ScalarValue>>;

/// Stream yielding a single error.
pub fn error_stream(err: QueryError) -> SendableRowStream {
    stream::iter(std::iter::once(Err(err))).boxed()
}

/// Wrap a stream so that it ends as soon as `cancel` is triggered, even
/// while suspended waiting on the inner stream.
pub fn cancellable(stream: SendableRowStream, cancel: &CancellationToken) -> SendableRowStream {
    Cancellable::new(stream, cancel).boxed()
}

/// Stream adapter observing a cancellation token.
///
/// On cancellation the inner stream is dropped immediately and the adapter
/// reports end of stream. Cancellation is not an error.
pub struct Cancellable<S> {
    inner: Option<S>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<S> Cancellable<S> {
    pub fn new(inner: S, cancel: &CancellationToken) -> Self {
        Cancellable {
            inner: Some(inner),
            cancelled: Box::pin(cancel.clone().cancelled_owned()),
        }
    }
}

impl<S> Stream for Cancellable<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let inner = match this.inner.as_mut() {
            Some(inner) => inner,
            None => return Poll::Ready(None),
        };

        if this.cancelled.as_mut().poll(cx).is_ready() {
            trace!("stream cancelled, releasing upstream");
            this.inner = None;
            return Poll::Ready(None);
        }

        match ready!(inner.poll_next_unpin(cx)) {
            Some(item) => Poll::Ready(Some(item)),
            None => {
                this.inner = None;
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    #[tokio::test]
    async fn passes_through_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let s = stream::iter((0..3).map(|i| Ok(ScalarValue::Int64(i)))).boxed();
        let out: Vec<_> = cancellable(s, &cancel).try_collect().await.unwrap();
        assert_eq!(
            vec![
                ScalarValue::Int64(0),
                ScalarValue::Int64(1),
                ScalarValue::Int64(2)
            ],
            out
        );
    }

    #[tokio::test]
    async fn ends_on_cancel() {
        let cancel = CancellationToken::new();
        let s = stream::iter((0..3).map(|i| Ok(ScalarValue::Int64(i)))).boxed();
        let mut s = cancellable(s, &cancel);

        assert_eq!(ScalarValue::Int64(0), s.next().await.unwrap().unwrap());
        cancel.cancel();
        assert!(s.next().await.is_none());
        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn wakes_pending_stream_on_cancel() {
        let cancel = CancellationToken::new();
        let mut s = cancellable(stream::pending().boxed(), &cancel);

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            canceller.cancel();
        });

        assert!(s.next().await.is_none());
    }

    #[tokio::test]
    async fn error_stream_yields_once() {
        let mut s = error_stream(QueryError::MalformedChain);
        assert!(matches!(s.next().await, Some(Err(QueryError::MalformedChain))));
        assert!(s.next().await.is_none());
    }
}
