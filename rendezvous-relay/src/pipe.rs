//! Bounded, cancellable in-memory pipe carrying a relay's bytes.
//!
//! The writer half is fed by the source; the reader half is a [`Stream`] of
//! chunks that any drain (a discard sink today, a download endpoint later)
//! can consume, usually through [`tokio_util::io::StreamReader`]. Both halves
//! observe the same [`CancellationToken`]: once it fires, a blocked `send`
//! returns [`PipeError::Cancelled`] and the reader yields a `TimedOut` error
//! instead of waiting for more data.

use bytes::Bytes;
use futures_util::Stream;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Pipe errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PipeError {
    /// The pipe's cancellation token fired.
    #[error("relay pipe cancelled")]
    Cancelled,
    /// The reader half was dropped.
    #[error("relay pipe reader closed")]
    Closed,
}

impl From<PipeError> for io::Error {
    fn from(err: PipeError) -> Self {
        let kind = match err {
            PipeError::Cancelled => io::ErrorKind::TimedOut,
            PipeError::Closed => io::ErrorKind::BrokenPipe,
        };
        io::Error::new(kind, err)
    }
}

/// Create a pipe buffering at most `capacity` chunks.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn relay_pipe(capacity: usize, cancel: CancellationToken) -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(capacity);
    let writer = PipeWriter {
        tx,
        cancel: cancel.clone(),
    };
    let reader = PipeReader {
        rx,
        cancel: cancel.clone(),
        cancelled: Box::pin(cancel.cancelled_owned()),
    };
    (writer, reader)
}

/// Write half of a relay pipe. Dropping it signals end-of-stream.
#[derive(Debug)]
pub struct PipeWriter {
    tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
}

impl PipeWriter {
    /// Push one chunk, waiting for buffer space.
    ///
    /// Empty chunks are accepted and skipped.
    pub async fn send(&self, chunk: Bytes) -> Result<(), PipeError> {
        if self.cancel.is_cancelled() {
            return Err(PipeError::Cancelled);
        }
        if chunk.is_empty() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipeError::Cancelled),
            sent = self.tx.send(chunk) => sent.map_err(|_| PipeError::Closed),
        }
    }

    /// Whether the pipe has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Read half of a relay pipe.
pub struct PipeReader {
    rx: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl std::fmt::Debug for PipeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeReader").finish_non_exhaustive()
    }
}

impl Stream for PipeReader {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.is_cancelled() || self.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Some(Err(PipeError::Cancelled.into())));
        }
        self.rx.poll_recv(cx).map(|chunk| chunk.map(Ok))
    }
}
