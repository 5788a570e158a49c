//! Prometheus metrics endpoint.

use crate::server::RendezvousServer;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use rendezvous_types::SessionState;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(
    Extension(server): Extension<Arc<RendezvousServer>>,
) -> impl IntoResponse {
    let manager = server.manager();
    let m = manager.metrics();

    // Gauges: current registry contents
    let sessions = manager.len();
    let pending = manager.count_in_state(SessionState::Pending);
    let streaming = manager.count_in_state(SessionState::Streaming);

    // Counters: monotonic since startup
    let created = m.sessions_created.load(Ordering::Relaxed);
    let attached = m.sources_attached.load(Ordering::Relaxed);
    let completed = m.sessions_completed.load(Ordering::Relaxed);
    let failed = m.sessions_failed.load(Ordering::Relaxed);
    let expired = m.sessions_expired.load(Ordering::Relaxed);
    let reaped = m.sessions_reaped.load(Ordering::Relaxed);
    let bytes = m.bytes_relayed.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP rendezvous_sessions Sessions currently in the registry
# TYPE rendezvous_sessions gauge
rendezvous_sessions {sessions}

# HELP rendezvous_sessions_pending Sessions waiting for a source
# TYPE rendezvous_sessions_pending gauge
rendezvous_sessions_pending {pending}

# HELP rendezvous_sessions_streaming Sessions with a source attached
# TYPE rendezvous_sessions_streaming gauge
rendezvous_sessions_streaming {streaming}

# HELP rendezvous_info Server information
# TYPE rendezvous_info gauge
rendezvous_info{{version="{version}"}} 1

# HELP rendezvous_sessions_created_total Total sessions created
# TYPE rendezvous_sessions_created_total counter
rendezvous_sessions_created_total {created}

# HELP rendezvous_sources_attached_total Total sources attached
# TYPE rendezvous_sources_attached_total counter
rendezvous_sources_attached_total {attached}

# HELP rendezvous_sessions_completed_total Total sessions completed
# TYPE rendezvous_sessions_completed_total counter
rendezvous_sessions_completed_total {completed}

# HELP rendezvous_sessions_failed_total Total sessions failed
# TYPE rendezvous_sessions_failed_total counter
rendezvous_sessions_failed_total {failed}

# HELP rendezvous_sessions_expired_total Total sessions expired
# TYPE rendezvous_sessions_expired_total counter
rendezvous_sessions_expired_total {expired}

# HELP rendezvous_sessions_reaped_total Total terminal sessions reaped
# TYPE rendezvous_sessions_reaped_total counter
rendezvous_sessions_reaped_total {reaped}

# HELP rendezvous_bytes_relayed_total Total bytes relayed by completed sessions
# TYPE rendezvous_bytes_relayed_total counter
rendezvous_bytes_relayed_total {bytes}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::to_bytes;
    use rendezvous_types::HeaderSet;

    #[tokio::test]
    async fn reports_registry_and_counters() {
        let server = Arc::new(RendezvousServer::new(Config::default()));
        server
            .manager()
            .create_session(HeaderSet::new(), HeaderSet::new());
        server
            .manager()
            .create_session(HeaderSet::new(), HeaderSet::new());

        let response = metrics_handler(Extension(server)).await.into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("rendezvous_sessions 2\n"));
        assert!(text.contains("rendezvous_sessions_pending 2\n"));
        assert!(text.contains("rendezvous_sessions_created_total 2\n"));
        assert!(text.contains("# TYPE rendezvous_bytes_relayed_total counter"));
    }
}
