//! Session registry.
//!
//! SessionManager owns every session, hands out relay attachments, and runs
//! the expiry and reaping passes the background sweep calls into.

use crate::clock::{Clock, SystemClock};
use crate::config::SessionsConfig;
use crate::error::{RendezvousError, Result};
use crate::pipe::relay_pipe;
use crate::relay::SourceAttachment;
use crate::session::{Session, SessionSnapshot};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rendezvous_types::{HeaderSet, SessionId, SessionState, SessionSummary};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RendezvousMetrics {
    /// Total sessions created.
    pub sessions_created: AtomicU64,
    /// Total sources attached.
    pub sources_attached: AtomicU64,
    /// Total sessions that completed.
    pub sessions_completed: AtomicU64,
    /// Total sessions that failed.
    pub sessions_failed: AtomicU64,
    /// Total sessions that expired.
    pub sessions_expired: AtomicU64,
    /// Total terminal sessions removed from the registry.
    pub sessions_reaped: AtomicU64,
    /// Total bytes relayed by completed sessions.
    pub bytes_relayed: AtomicU64,
}

impl RendezvousMetrics {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Concurrency-safe registry of rendezvous sessions.
pub struct SessionManager {
    sessions: DashMap<SessionId, Arc<Session>>,
    ttl: Duration,
    pipe_capacity: usize,
    clock: Arc<dyn Clock>,
    next_seq: AtomicU64,
    metrics: Arc<RendezvousMetrics>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("pipe_capacity", &self.pipe_capacity)
            .field("clock", &self.clock)
            .field("sessions_count", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager reading time from the system clock.
    pub fn new(config: &SessionsConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager with an explicit clock.
    pub fn with_clock(config: &SessionsConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: config.ttl(),
            pipe_capacity: config.pipe_capacity.max(1),
            clock,
            next_seq: AtomicU64::new(0),
            metrics: Arc::new(RendezvousMetrics::default()),
        }
    }

    /// Default TTL applied to new sessions.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Access to the operational metrics.
    pub fn metrics(&self) -> &RendezvousMetrics {
        &self.metrics
    }

    /// Number of sessions currently in the registry.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Register a new pending session.
    ///
    /// Its deadline is `now + ttl`; the background sweep, lazy checks on
    /// access, and the relay's own deadline all enforce it.
    pub fn create_session(
        &self,
        download_headers: HeaderSet,
        upload_headers: HeaderSet,
    ) -> Arc<Session> {
        let now = self.clock.now();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let vacant = loop {
            if let Entry::Vacant(vacant) = self.sessions.entry(SessionId::new()) {
                break vacant;
            }
        };
        let session = Arc::new(Session::new(
            *vacant.key(),
            seq,
            download_headers,
            upload_headers,
            now,
            self.ttl,
        ));
        vacant.insert(session.clone());

        RendezvousMetrics::incr(&self.metrics.sessions_created);
        tracing::info!(
            "Session {} created (ttl: {}ms, total: {})",
            session.id(),
            self.ttl.as_millis(),
            self.sessions.len()
        );
        session
    }

    /// Look up a live session handle.
    pub fn session(&self, id: &SessionId) -> Result<Arc<Session>> {
        self.session_at(id, self.clock.now())
    }

    /// Read-only snapshot of one session.
    pub fn get_session(&self, id: &SessionId) -> Result<SessionSnapshot> {
        self.session(id).map(|session| session.snapshot())
    }

    /// Attach a source: `Pending → Streaming` plus a fresh relay pipe.
    pub fn attach_source(&self, id: &SessionId) -> Result<SourceAttachment> {
        let now = self.clock.now();
        let session = self.session_at(id, now)?;
        session.begin_streaming(now)?;

        let (writer, reader) = relay_pipe(self.pipe_capacity, session.cancellation().clone());
        RendezvousMetrics::incr(&self.metrics.sources_attached);
        tracing::info!("Session {} source attached", session.id());

        Ok(SourceAttachment::new(
            session,
            writer,
            reader,
            self.clock.clone(),
            self.metrics.clone(),
        ))
    }

    /// Summaries of every registered session, terminal ones included, in
    /// creation order.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by_key(|session| session.seq());

        sessions
            .into_iter()
            .map(|session| {
                self.expire_session_if_due(&session);
                session.summary()
            })
            .collect()
    }

    /// Count sessions currently in `state`, expiring overdue ones first.
    pub fn count_in_state(&self, state: SessionState) -> usize {
        let now = self.clock.now();
        self.sessions
            .iter()
            .filter(|entry| {
                let session = entry.value();
                self.expire_session_at(session, now);
                session.state() == state
            })
            .count()
    }

    /// Expire every non-terminal session whose deadline has passed.
    ///
    /// Returns the number of sessions expired by this pass.
    pub fn expire_due(&self) -> usize {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        sessions
            .iter()
            .filter(|session| self.expire_session_if_due(session))
            .count()
    }

    /// Remove sessions that have been terminal for at least `retention`.
    ///
    /// Returns the number of sessions removed.
    pub fn reap_terminal(&self, retention: Duration) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|id, session| {
            let reap = session.is_reapable(now, retention);
            if reap {
                tracing::debug!("Session {} reaped in state {}", id, session.state());
            }
            !reap
        });
        let reaped = before.saturating_sub(self.sessions.len());
        self.metrics
            .sessions_reaped
            .fetch_add(reaped as u64, Ordering::Relaxed);
        reaped
    }

    fn session_at(&self, id: &SessionId, now: Instant) -> Result<Arc<Session>> {
        let session = self
            .sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RendezvousError::not_found(id))?;
        self.expire_session_at(&session, now);
        Ok(session)
    }

    fn expire_session_if_due(&self, session: &Session) -> bool {
        self.expire_session_at(session, self.clock.now())
    }

    fn expire_session_at(&self, session: &Session, now: Instant) -> bool {
        let expired = session.expire_if_due(now);
        if expired {
            RendezvousMetrics::incr(&self.metrics.sessions_expired);
        }
        expired
    }
}
