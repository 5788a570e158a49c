//! A single rendezvous session and its state machine.
//!
//! Each session guards its lifecycle state and transfer counters with one
//! mutex, so a snapshot never shows counters from one state next to the
//! state label of another. Every transition takes the lock, checks the
//! current state, and either moves or reports why it cannot.

use crate::counter::ReadObserver;
use crate::error::{RendezvousError, Result};
use rendezvous_types::{HeaderSet, SessionId, SessionState, SessionSummary, TransferStats};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reads between progress trace lines.
const PROGRESS_LOG_EVERY: u64 = 1000;

/// Mutable part of a session.
#[derive(Debug)]
struct SessionRecord {
    state: SessionState,
    stats: TransferStats,
    stream_started_at: Option<Instant>,
    finished_at: Option<Instant>,
    failure: Option<String>,
}

/// One rendezvous unit: a declared transfer waiting for, or carrying, a
/// source stream.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    seq: u64,
    download_headers: HeaderSet,
    upload_headers: HeaderSet,
    created_at: Instant,
    expires_at: Instant,
    /// Fired on expiry; relay pipes of this session listen to it.
    cancel: CancellationToken,
    record: Mutex<SessionRecord>,
}

/// Point-in-time copy of a session, taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: SessionId,
    /// Lifecycle state.
    pub state: SessionState,
    /// Declared sink headers.
    pub download_headers: HeaderSet,
    /// Declared source headers.
    pub upload_headers: HeaderSet,
    /// Counters as of the snapshot.
    pub stats: TransferStats,
    /// Creation instant.
    pub created_at: Instant,
    /// Deadline after which the session expires.
    pub expires_at: Instant,
    /// When the source attached, if it has.
    pub stream_started_at: Option<Instant>,
    /// When a terminal state was reached, if it has been.
    pub finished_at: Option<Instant>,
    /// Cause recorded on failure.
    pub failure: Option<String>,
}

impl From<SessionSnapshot> for SessionSummary {
    fn from(snapshot: SessionSnapshot) -> Self {
        SessionSummary {
            id: snapshot.id,
            state: snapshot.state,
            download_headers: snapshot.download_headers,
            upload_headers: snapshot.upload_headers,
            bytes_transferred: snapshot.stats.bytes,
        }
    }
}

impl Session {
    /// Create a pending session expiring `ttl` after `now`.
    ///
    /// `seq` orders sessions by creation for listings.
    pub fn new(
        id: SessionId,
        seq: u64,
        download_headers: HeaderSet,
        upload_headers: HeaderSet,
        now: Instant,
        ttl: Duration,
    ) -> Self {
        Self {
            id,
            seq,
            download_headers,
            upload_headers,
            created_at: now,
            expires_at: now + ttl,
            cancel: CancellationToken::new(),
            record: Mutex::new(SessionRecord {
                state: SessionState::Pending,
                stats: TransferStats::default(),
                stream_started_at: None,
                finished_at: None,
                failure: None,
            }),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Creation order within the owning manager.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Declared sink headers.
    pub fn download_headers(&self) -> &HeaderSet {
        &self.download_headers
    }

    /// Declared source headers.
    pub fn upload_headers(&self) -> &HeaderSet {
        &self.upload_headers
    }

    /// Creation instant.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Fixed expiry deadline.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Token fired when the session expires.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Current counters.
    pub fn stats(&self) -> TransferStats {
        self.lock().stats
    }

    /// Consistent copy of state, counters and timestamps.
    pub fn snapshot(&self) -> SessionSnapshot {
        let record = self.lock();
        SessionSnapshot {
            id: self.id,
            state: record.state,
            download_headers: self.download_headers.clone(),
            upload_headers: self.upload_headers.clone(),
            stats: record.stats,
            created_at: self.created_at,
            expires_at: self.expires_at,
            stream_started_at: record.stream_started_at,
            finished_at: record.finished_at,
            failure: record.failure.clone(),
        }
    }

    /// Wire summary.
    pub fn summary(&self) -> SessionSummary {
        self.snapshot().into()
    }

    /// `Pending → Streaming`.
    ///
    /// A pending session whose deadline has passed is expired on the spot
    /// and the attach is refused.
    pub fn begin_streaming(&self, now: Instant) -> Result<()> {
        let mut record = self.lock();
        if record.state == SessionState::Pending && now >= self.expires_at {
            self.expire_locked(&mut record, now);
        }
        if record.state != SessionState::Pending {
            return Err(RendezvousError::SessionNotAttachable {
                id: self.id,
                state: record.state,
            });
        }
        record.state = SessionState::Streaming;
        record.stream_started_at = Some(now);
        tracing::debug!("Session {} streaming", self.id);
        Ok(())
    }

    /// `Streaming → Completed`, returning the frozen counters.
    ///
    /// Fails with `SessionExpired` if expiry won the race, and with
    /// `SessionNotAttachable` if no stream was ever started.
    pub fn complete(&self, now: Instant) -> Result<TransferStats> {
        let mut record = self.lock();
        match record.state {
            SessionState::Streaming => {
                record.state = SessionState::Completed;
                record.finished_at = Some(now);
                tracing::info!(
                    "Session {} completed ({} bytes in {} reads)",
                    self.id,
                    record.stats.bytes,
                    record.stats.reads
                );
                Ok(record.stats)
            }
            SessionState::Expired => Err(RendezvousError::SessionExpired { id: self.id }),
            state => Err(RendezvousError::SessionNotAttachable { id: self.id, state }),
        }
    }

    /// `Streaming → Failed`. Returns whether the transition happened.
    pub fn fail(&self, now: Instant, cause: impl Into<String>) -> bool {
        let mut record = self.lock();
        if record.state != SessionState::Streaming {
            return false;
        }
        let cause = cause.into();
        tracing::warn!("Session {} failed: {}", self.id, cause);
        record.state = SessionState::Failed;
        record.finished_at = Some(now);
        record.failure = Some(cause);
        true
    }

    /// Force a non-terminal session to `Expired`, releasing any relay
    /// blocked on it. Returns whether the transition happened.
    pub fn expire(&self, now: Instant) -> bool {
        let mut record = self.lock();
        self.expire_locked(&mut record, now)
    }

    /// Expire the session if its deadline is at or before `now`.
    pub fn expire_if_due(&self, now: Instant) -> bool {
        if now < self.expires_at {
            return false;
        }
        self.expire(now)
    }

    /// Whether the session is terminal and has been for at least `retention`.
    pub fn is_reapable(&self, now: Instant, retention: Duration) -> bool {
        let record = self.lock();
        match record.finished_at {
            Some(finished) if record.state.is_terminal() => {
                now.saturating_duration_since(finished) >= retention
            }
            _ => false,
        }
    }

    fn expire_locked(&self, record: &mut SessionRecord, now: Instant) -> bool {
        if record.state.is_terminal() {
            return false;
        }
        tracing::info!(
            "Session {} expired while {} ({} bytes transferred)",
            self.id,
            record.state,
            record.stats.bytes
        );
        record.state = SessionState::Expired;
        record.finished_at = Some(now);
        self.cancel.cancel();
        true
    }

    fn lock(&self) -> MutexGuard<'_, SessionRecord> {
        // A panic while holding the lock cannot leave the record half
        // written: every transition assigns plain values.
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReadObserver for Session {
    fn observe_read(&self, bytes: usize) {
        let mut record = self.lock();
        if record.state != SessionState::Streaming {
            return;
        }
        record.stats.reads += 1;
        record.stats.bytes += bytes as u64;
        if record.stats.reads % PROGRESS_LOG_EVERY == 0 {
            tracing::debug!(
                "Session {} progress: reads={} bytes={}",
                self.id,
                record.stats.reads,
                record.stats.bytes
            );
        }
    }
}
