//! Running one relay: source → pipe → counting drain → sink.
//!
//! [`SourceAttachment`] is what a successful attach hands back. The pump
//! copies the source stream into the pipe; the drain reads the pipe through
//! a [`ByteCounter`] that reports into the session. Both run under the
//! session's deadline. Today the drain discards (no download endpoint);
//! [`SourceAttachment::relay_into`] and [`SourceAttachment::into_parts`] are
//! where a sink plugs in without touching the session state machine.

use crate::clock::Clock;
use crate::counter::ByteCounter;
use crate::error::{RendezvousError, Result};
use crate::manager::RendezvousMetrics;
use crate::pipe::{PipeError, PipeReader, PipeWriter};
use crate::session::Session;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use rendezvous_types::TransferStats;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::io::StreamReader;

/// Read side of a relay: the pipe as an [`AsyncRead`], counted into the
/// session.
///
/// Dropping the drain while its session is still `Streaming` fails the
/// session: nothing is left to consume the pipe.
pub struct RelayDrain {
    reader: ByteCounter<StreamReader<PipeReader, Bytes>, Arc<Session>>,
    clock: Arc<dyn Clock>,
    metrics: Arc<RendezvousMetrics>,
}

impl RelayDrain {
    fn new(
        reader: PipeReader,
        session: Arc<Session>,
        clock: Arc<dyn Clock>,
        metrics: Arc<RendezvousMetrics>,
    ) -> Self {
        Self {
            reader: ByteCounter::new(StreamReader::new(reader), session),
            clock,
            metrics,
        }
    }

    fn session(&self) -> &Arc<Session> {
        self.reader.observer()
    }
}

impl fmt::Debug for RelayDrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayDrain")
            .field("session", &self.session().id())
            .finish_non_exhaustive()
    }
}

impl Drop for RelayDrain {
    fn drop(&mut self) {
        if self.session().fail(self.clock.now(), "relay dropped") {
            RendezvousMetrics::incr(&self.metrics.sessions_failed);
        }
    }
}

impl AsyncRead for RelayDrain {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

/// Why a relay stopped early.
#[derive(Debug)]
enum RelayFailure {
    /// The source stream yielded an error.
    Source(String),
    /// The pipe refused a chunk.
    Pipe(PipeError),
    /// Reading the pipe or writing the sink failed.
    Drain(io::Error),
}

impl fmt::Display for RelayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(e) => write!(f, "source error: {e}"),
            Self::Pipe(e) => write!(f, "{e}"),
            Self::Drain(e) => write!(f, "drain error: {e}"),
        }
    }
}

/// A source attached to a streaming session.
pub struct SourceAttachment {
    session: Arc<Session>,
    writer: PipeWriter,
    drain: RelayDrain,
    clock: Arc<dyn Clock>,
    metrics: Arc<RendezvousMetrics>,
}

impl fmt::Debug for SourceAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceAttachment")
            .field("session", &self.session.id())
            .finish_non_exhaustive()
    }
}

impl SourceAttachment {
    pub(crate) fn new(
        session: Arc<Session>,
        writer: PipeWriter,
        reader: PipeReader,
        clock: Arc<dyn Clock>,
        metrics: Arc<RendezvousMetrics>,
    ) -> Self {
        let drain = RelayDrain::new(reader, session.clone(), clock.clone(), metrics.clone());
        Self {
            session,
            writer,
            drain,
            clock,
            metrics,
        }
    }

    /// The session this source is attached to.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Split into the pipe's write half and its counting drain.
    ///
    /// The caller then owns both ends and the session's terminal transition.
    /// Dropping the drain before that transition fails the session.
    pub fn into_parts(self) -> (PipeWriter, RelayDrain) {
        (self.writer, self.drain)
    }

    /// Relay `source` into the pipe and discard what comes out.
    pub async fn relay<S, E>(self, source: S) -> Result<TransferStats>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: fmt::Display,
    {
        self.relay_into(source, tokio::io::sink()).await
    }

    /// Relay `source` into the pipe and copy what comes out into `sink`.
    ///
    /// Ends with the session `Completed` (source ended cleanly), `Failed`
    /// (source, pipe or sink error), or `Expired` (deadline or sweep).
    pub async fn relay_into<S, E, W>(self, source: S, mut sink: W) -> Result<TransferStats>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: fmt::Display,
        W: AsyncWrite + Unpin,
    {
        let Self {
            session,
            writer,
            mut drain,
            clock,
            metrics,
        } = self;

        let deadline = tokio::time::sleep_until(session.expires_at());
        let transfer = async {
            tokio::try_join!(pump(source, writer), async {
                tokio::io::copy(&mut drain, &mut sink)
                    .await
                    .map_err(RelayFailure::Drain)
            })
        };

        let outcome = tokio::select! {
            result = transfer => Some(result),
            _ = deadline => None,
        };

        let now = clock.now();
        match outcome {
            Some(Ok(_)) => {
                // Expiry may have won the race after the last byte; whoever
                // expired the session already counted it.
                let stats = session.complete(now)?;
                RendezvousMetrics::incr(&metrics.sessions_completed);
                metrics.bytes_relayed.fetch_add(stats.bytes, Ordering::Relaxed);
                Ok(stats)
            }
            Some(Err(_)) if session.cancellation().is_cancelled() => {
                Err(RendezvousError::SessionExpired { id: session.id() })
            }
            Some(Err(failure)) => {
                if session.fail(now, failure.to_string()) {
                    RendezvousMetrics::incr(&metrics.sessions_failed);
                }
                Err(RendezvousError::Relay(failure.to_string()))
            }
            None => {
                if session.expire(now) {
                    RendezvousMetrics::incr(&metrics.sessions_expired);
                }
                Err(RendezvousError::SessionExpired { id: session.id() })
            }
        }
    }
}

/// Copy every chunk of `source` into the pipe, then drop the writer to
/// signal end-of-stream.
async fn pump<S, E>(source: S, writer: PipeWriter) -> std::result::Result<(), RelayFailure>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: fmt::Display,
{
    tokio::pin!(source);
    while let Some(chunk) = source.next().await {
        let chunk = chunk.map_err(|e| RelayFailure::Source(e.to_string()))?;
        writer.send(chunk).await.map_err(RelayFailure::Pipe)?;
    }
    Ok(())
}
