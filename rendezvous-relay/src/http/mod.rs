//! HTTP surface for rendezvous-relay.
//!
//! Provides the stream endpoints plus ping, health and metrics.

mod error;
pub mod health;
mod metrics;
mod stream;

use crate::error::RendezvousError;
use crate::server::RendezvousServer;
use axum::http::{Method, Uri};
use axum::routing::{get, put};
use axum::{Extension, Router};
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(server: Arc<RendezvousServer>) -> Router {
    let mut router = Router::new()
        .route("/ping", get(health::ping_handler).fallback(bad_route_handler))
        .route("/health", get(health::health_handler).fallback(bad_route_handler))
        .route(
            "/stream",
            get(stream::list_handler)
                .post(stream::create_handler)
                .fallback(bad_route_handler),
        )
        .route(
            "/stream/:id",
            put(stream::source_handler).fallback(bad_route_handler),
        )
        .route(
            "/stream/:id/status",
            get(stream::status_handler).fallback(bad_route_handler),
        );

    if server.config().http.metrics_enabled {
        router = router.route(
            "/metrics",
            get(metrics::metrics_handler).fallback(bad_route_handler),
        );
    }

    router.fallback(bad_route_handler).layer(Extension(server))
}

/// Anything without a matching method and path.
async fn bad_route_handler(method: Method, uri: Uri) -> RendezvousError {
    tracing::debug!("No route for {} {}", method, uri.path());
    RendezvousError::BadRoute {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use rendezvous_types::{
        CreateStreamResponse, ErrorBody, SessionId, SessionState, SessionSummary, TransferStats,
    };
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn test_server() -> Arc<RendezvousServer> {
        Arc::new(RendezvousServer::new(Config::default()))
    }

    fn server_with_ttl(ttl_ms: u64) -> Arc<RendezvousServer> {
        let mut config = Config::default();
        config.sessions.ttl_ms = ttl_ms;
        Arc::new(RendezvousServer::new(config))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn body_req(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(body.into())
            .unwrap()
    }

    async fn create(app: &Router, body: &str) -> SessionId {
        let (status, _, body) = send(app, body_req("POST", "/stream", body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        let created: CreateStreamResponse = serde_json::from_slice(&body).unwrap();
        created.stream
    }

    fn error_body(body: &[u8]) -> ErrorBody {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        let app = build_router(test_server());
        let (status, headers, body) = send(&app, get_req("/ping")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"pong");
        assert!(headers[CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = build_router(test_server());
        let (status, _, _) = send(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_can_be_disabled() {
        let app = build_router(test_server());
        let (status, _, _) = send(&app, get_req("/metrics")).await;
        assert_eq!(status, StatusCode::OK);

        let mut config = Config::default();
        config.http.metrics_enabled = false;
        let app = build_router(Arc::new(RendezvousServer::new(config)));
        let (status, _, _) = send(&app, get_req("/metrics")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_then_put_hello_completes() {
        let server = test_server();
        let app = build_router(server.clone());

        let id = create(&app, r#"{"download_headers":{},"upload_headers":{}}"#).await;
        assert_eq!(
            server.manager().get_session(&id).unwrap().state,
            SessionState::Pending
        );

        let (status, headers, body) =
            send(&app, body_req("PUT", &format!("/stream/{id}"), "hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], "application/json");

        let stats: TransferStats = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats.bytes, 5);
        assert!(stats.reads >= 1);

        let snapshot = server.manager().get_session(&id).unwrap();
        assert_eq!(snapshot.state, SessionState::Completed);
        assert_eq!(snapshot.stats.bytes, 5);
    }

    #[tokio::test]
    async fn list_reports_headers_and_counters() {
        let app = build_router(test_server());
        let id = create(
            &app,
            r#"{"download_headers":{"a":"1"},"upload_headers":{"b":"2"}}"#,
        )
        .await;

        let (status, headers, body) = send(&app, get_req("/stream")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], "application/json");

        let listed: Vec<SessionSummary> = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].state, SessionState::Pending);
        assert_eq!(listed[0].download_headers.get("a"), Some("1"));
        assert_eq!(listed[0].upload_headers.get("b"), Some("2"));
        assert_eq!(listed[0].bytes_transferred, 0);
    }

    #[tokio::test]
    async fn status_returns_one_session() {
        let app = build_router(test_server());
        let id = create(&app, "{}").await;

        let (status, _, body) = send(&app, get_req(&format!("/stream/{id}/status"))).await;
        assert_eq!(status, StatusCode::OK);
        let summary: SessionSummary = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.id, id);

        let (status, _, body) =
            send(&app, get_req(&format!("/stream/{}/status", SessionId::new()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_body(&body).name, "SessionNotFoundError");
    }

    #[tokio::test]
    async fn put_unknown_stream_is_not_found() {
        let app = build_router(test_server());
        let (status, headers, body) =
            send(&app, body_req("PUT", "/stream/does-not-exist", "hello")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(error_body(&body).name, "SessionNotFoundError");
    }

    #[tokio::test]
    async fn second_put_is_not_attachable() {
        let app = build_router(test_server());
        let id = create(&app, "{}").await;

        let (status, _, _) = send(&app, body_req("PUT", &format!("/stream/{id}"), "a")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = send(&app, body_req("PUT", &format!("/stream/{id}"), "b")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_body(&body).name, "SessionNotAttachableError");
    }

    #[tokio::test]
    async fn expired_session_refuses_attach() {
        let app = build_router(server_with_ttl(10));
        let id = create(&app, "{}").await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        let (status, _, body) = tokio::time::timeout(
            Duration::from_secs(2),
            send(&app, body_req("PUT", &format!("/stream/{id}"), "late")),
        )
        .await
        .expect("attach must not hang");
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_body(&body).name, "SessionNotAttachableError");

        let (_, _, body) = send(&app, get_req("/stream")).await;
        let listed: Vec<SessionSummary> = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed[0].state, SessionState::Expired);
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_body() {
        let app = build_router(test_server());
        let (status, headers, body) = send(&app, body_req("POST", "/stream", "{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        let err = error_body(&body);
        assert_eq!(err.name, "InvalidBodyError");
        assert!(err.message.starts_with("Invalid JSON"));
    }

    #[tokio::test]
    async fn oversized_create_body_is_invalid_body() {
        let mut config = Config::default();
        config.http.max_create_body = 64;
        let app = build_router(Arc::new(RendezvousServer::new(config)));

        let padding = "x".repeat(128);
        let body = format!(r#"{{"download_headers":{{"a":"{padding}"}}}}"#);
        let (status, _, body) = send(&app, body_req("POST", "/stream", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_body(&body).name, "InvalidBodyError");
    }

    #[tokio::test]
    async fn empty_create_body_makes_empty_session() {
        let server = test_server();
        let app = build_router(server.clone());
        let id = create(&app, "").await;

        let snapshot = server.manager().get_session(&id).unwrap();
        assert!(snapshot.download_headers.is_empty());
        assert!(snapshot.upload_headers.is_empty());
    }

    #[tokio::test]
    async fn invalid_header_names_are_rejected() {
        let app = build_router(test_server());
        let (status, _, body) = send(
            &app,
            body_req("POST", "/stream", r#"{"upload_headers":{"bad header":"x"}}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err = error_body(&body);
        assert_eq!(err.name, "InvalidBodyError");
        assert_eq!(err.message, "Not a valid HTTP header name: bad header");
    }

    #[tokio::test]
    async fn upload_headers_are_set_on_source_response() {
        let app = build_router(test_server());
        let id = create(&app, r#"{"upload_headers":{"x-transfer":"done"}}"#).await;

        let (status, headers, _) =
            send(&app, body_req("PUT", &format!("/stream/{id}"), "payload")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["x-transfer"], "done");
    }

    #[tokio::test]
    async fn unknown_route_is_bad_route() {
        let app = build_router(test_server());

        let (status, _, body) = send(&app, get_req("/nowhere")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_body(&body).name, "BadRouteError");

        let (status, _, body) = send(&app, body_req("DELETE", "/stream", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_body(&body).name, "BadRouteError");
    }
}
