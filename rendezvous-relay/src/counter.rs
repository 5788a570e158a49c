//! Byte and read counting over an [`AsyncRead`].
//!
//! [`ByteCounter`] sits between the relay pipe and whatever drains it. It
//! never touches the bytes; it only reports each completed read to a
//! [`ReadObserver`]. A session is an observer, so its counters move in the
//! same critical section as its state.

use rendezvous_types::TransferStats;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Receives one call per completed read.
pub trait ReadObserver: Send + Sync {
    /// A read completed with `bytes` bytes (zero at end-of-stream or on error).
    fn observe_read(&self, bytes: usize);
}

impl<T: ReadObserver + ?Sized> ReadObserver for Arc<T> {
    fn observe_read(&self, bytes: usize) {
        (**self).observe_read(bytes)
    }
}

/// Standalone counters for a [`ByteCounter`] not tied to a session.
#[derive(Debug, Default)]
pub struct TransferCounters {
    stats: Mutex<TransferStats>,
}

impl TransferCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent snapshot of both counters.
    pub fn stats(&self) -> TransferStats {
        *self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReadObserver for TransferCounters {
    fn observe_read(&self, bytes: usize) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.reads += 1;
        stats.bytes += bytes as u64;
    }
}

/// Pass-through reader that reports every read to an observer.
#[derive(Debug)]
pub struct ByteCounter<R, O> {
    inner: R,
    observer: O,
}

impl<R, O> ByteCounter<R, O> {
    /// Wrap `inner`, reporting reads to `observer`.
    pub fn new(inner: R, observer: O) -> Self {
        Self { inner, observer }
    }

    /// The observer receiving read reports.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Unwrap into the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R, O> AsyncRead for ByteCounter<R, O>
where
    R: AsyncRead + Unpin,
    O: ReadObserver + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.observer.observe_read(buf.filled().len() - before);
                Poll::Ready(result)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
