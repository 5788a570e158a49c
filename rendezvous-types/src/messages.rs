//! JSON bodies exchanged over the HTTP surface.

use crate::{HeaderSet, SessionId, SessionState};
use serde::{Deserialize, Serialize};

/// Body of `POST /stream`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStreamRequest {
    /// Headers declared for the eventual sink.
    #[serde(default)]
    pub download_headers: HeaderSet,
    /// Headers declared for the source's response.
    #[serde(default)]
    pub upload_headers: HeaderSet,
}

/// Reply to `POST /stream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStreamResponse {
    /// Identifier of the newly created session.
    pub stream: SessionId,
}

/// One entry of `GET /stream`, also returned by `GET /stream/:id/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Declared sink headers.
    pub download_headers: HeaderSet,
    /// Declared source headers.
    pub upload_headers: HeaderSet,
    /// Bytes relayed so far.
    pub bytes_transferred: u64,
}

/// Read and byte counts for one relay, the reply to `PUT /stream/:id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Number of read operations drained from the relay pipe.
    pub reads: u64,
    /// Number of bytes drained from the relay pipe.
    pub bytes: u64,
}

/// Error reply body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error kind, e.g. `SessionNotFoundError`.
    pub name: String,
    /// Human readable description.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults_missing_sets() {
        let req: CreateStreamRequest = serde_json::from_str("{}").unwrap();
        assert!(req.download_headers.is_empty());
        assert!(req.upload_headers.is_empty());
    }

    #[test]
    fn create_request_reads_both_sets() {
        let req: CreateStreamRequest =
            serde_json::from_str(r#"{"download_headers":{"a":"1"},"upload_headers":{"b":"2"}}"#)
                .unwrap();
        assert_eq!(req.download_headers.get("a"), Some("1"));
        assert_eq!(req.upload_headers.get("b"), Some("2"));
    }

    #[test]
    fn create_response_shape() {
        let id = SessionId::new();
        let json = serde_json::to_string(&CreateStreamResponse { stream: id }).unwrap();
        assert_eq!(json, format!(r#"{{"stream":"{id}"}}"#));
    }

    #[test]
    fn summary_shape() {
        let id = SessionId::new();
        let summary = SessionSummary {
            id,
            state: SessionState::Streaming,
            download_headers: HeaderSet::new(),
            upload_headers: [("b", "2")].into_iter().collect(),
            bytes_transferred: 42,
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["id"], id.to_string());
        assert_eq!(value["state"], "streaming");
        assert_eq!(value["download_headers"], serde_json::json!({}));
        assert_eq!(value["upload_headers"]["b"], "2");
        assert_eq!(value["bytes_transferred"], 42);
    }

    #[test]
    fn transfer_stats_shape() {
        let json = serde_json::to_string(&TransferStats { reads: 2, bytes: 5 }).unwrap();
        assert_eq!(json, r#"{"reads":2,"bytes":5}"#);
    }
}
