//! Liveness endpoints.

use crate::server::RendezvousServer;
use axum::{Extension, Json};
use rendezvous_types::SessionState;
use serde::Serialize;
use std::sync::Arc;

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Sessions currently in the registry.
    pub sessions: usize,
    /// Sessions currently streaming.
    pub streaming: usize,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// `GET /ping`
pub async fn ping_handler() -> &'static str {
    "pong"
}

/// Health check handler.
pub async fn health_handler(
    Extension(server): Extension<Arc<RendezvousServer>>,
) -> Json<HealthStatus> {
    let manager = server.manager();
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: manager.len(),
        streaming: manager.count_in_state(SessionState::Streaming),
        uptime_seconds: server.uptime().as_secs(),
    })
}
