//! Helpers for exercising sources in tests.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures::{Stream, StreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::errors::Result;
use crate::query::{Query, RowSource};
use crate::stream::SendableRowStream;
use crate::value::ScalarValue;

/// Wraps a query and counts how many streams were opened and dropped.
///
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct CountingSource {
    input: Query,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    dropped: AtomicUsize,
}

impl CountingSource {
    pub fn new(input: Query) -> Self {
        CountingSource {
            input,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.counters.dropped.load(Ordering::SeqCst)
    }

    /// Number of streams currently alive.
    pub fn live(&self) -> usize {
        self.opened() - self.dropped()
    }
}

impl RowSource for CountingSource {
    fn open(&self, cancel: &CancellationToken) -> SendableRowStream {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        CountingStream {
            inner: self.input.stream(cancel),
            counters: self.counters.clone(),
        }
        .boxed()
    }
}

struct CountingStream {
    inner: SendableRowStream,
    counters: Arc<Counters>,
}

impl Stream for CountingStream {
    type Item = Result<ScalarValue>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for CountingStream {
    fn drop(&mut self) {
        self.counters.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Source whose streams never yield and ignore the cancellation token.
#[derive(Debug, Clone, Copy, Default)]
pub struct StalledSource;

impl RowSource for StalledSource {
    fn open(&self, _cancel: &CancellationToken) -> SendableRowStream {
        stream::pending().boxed()
    }
}
