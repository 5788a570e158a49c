//! Error types for rendezvous-relay.

use rendezvous_types::{SessionId, SessionState};

/// Main error type for rendezvous operations.
///
/// Every variant maps onto one wire error kind, see [`RendezvousError::name`].
#[derive(Debug, thiserror::Error)]
pub enum RendezvousError {
    /// Malformed or oversized request payload.
    #[error("{0}")]
    InvalidBody(String),

    /// Lookup or attach against an unknown id.
    #[error("the specified session id does not exist: {id}")]
    SessionNotFound {
        /// The id as supplied by the caller.
        id: String,
    },

    /// Attach attempted on a session that is not pending.
    #[error("session {id} cannot accept a source while {state}")]
    SessionNotAttachable {
        /// The session.
        id: SessionId,
        /// The state the session was in.
        state: SessionState,
    },

    /// Relay forcibly terminated by the session TTL.
    #[error("session {id} expired before the transfer finished")]
    SessionExpired {
        /// The session.
        id: SessionId,
    },

    /// No endpoint for the requested method and path.
    #[error("no endpoint exists for {method} {path}")]
    BadRoute {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// Relay I/O failure unrelated to expiry.
    #[error("relay failed: {0}")]
    Relay(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RendezvousError {
    /// Wire name of this error kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidBody(_) => "InvalidBodyError",
            Self::SessionNotFound { .. } => "SessionNotFoundError",
            Self::SessionNotAttachable { .. } => "SessionNotAttachableError",
            Self::SessionExpired { .. } => "SessionExpiredError",
            Self::BadRoute { .. } => "BadRouteError",
            Self::Relay(_) | Self::Config(_) | Self::Io(_) => "InternalError",
        }
    }

    /// Shorthand for an unknown session id.
    pub fn not_found(id: impl ToString) -> Self {
        Self::SessionNotFound { id: id.to_string() }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: std::path::PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid {
        /// Dotted field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Result type alias for rendezvous operations.
pub type Result<T> = std::result::Result<T, RendezvousError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        let id = SessionId::new();
        assert_eq!(RendezvousError::InvalidBody("x".into()).name(), "InvalidBodyError");
        assert_eq!(RendezvousError::not_found("nope").name(), "SessionNotFoundError");
        assert_eq!(
            RendezvousError::SessionNotAttachable {
                id,
                state: SessionState::Completed
            }
            .name(),
            "SessionNotAttachableError"
        );
        assert_eq!(
            RendezvousError::SessionExpired { id }.name(),
            "SessionExpiredError"
        );
        assert_eq!(RendezvousError::Relay("eof".into()).name(), "InternalError");
        assert_eq!(
            RendezvousError::Io(std::io::Error::other("boom")).name(),
            "InternalError"
        );
    }

    #[test]
    fn not_attachable_message_names_state() {
        let id = SessionId::new();
        let err = RendezvousError::SessionNotAttachable {
            id,
            state: SessionState::Streaming,
        };
        assert_eq!(
            err.to_string(),
            format!("session {id} cannot accept a source while streaming")
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RendezvousError>();
    }
}
