//! Session lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a stream session.
///
/// ```text
/// Pending ──attach──► Streaming ──end──► Completed
///    │                    │
///    │                    └──error──► Failed
///    └────────ttl─────────┴──────────► Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Registered, waiting for a source to attach.
    Pending,
    /// A source is attached and bytes are flowing.
    Streaming,
    /// The source closed cleanly before the TTL.
    Completed,
    /// The TTL elapsed before the session finished.
    Expired,
    /// The relay hit an I/O error.
    Failed,
}

impl SessionState {
    /// Whether no further transitions are possible from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Expired | Self::Failed)
    }

    /// Wire name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
