//! `/stream` endpoints: create, list, status, and source upload.

use crate::error::{RendezvousError, Result};
use crate::server::RendezvousServer;
use axum::body::Body;
use axum::extract::Path;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use rendezvous_types::{
    CreateStreamRequest, CreateStreamResponse, HeaderSet, SessionId, SessionSummary,
};
use std::sync::Arc;

/// `GET /stream`
pub async fn list_handler(
    Extension(server): Extension<Arc<RendezvousServer>>,
) -> Json<Vec<SessionSummary>> {
    Json(server.manager().list_sessions())
}

/// `POST /stream`
pub async fn create_handler(
    Extension(server): Extension<Arc<RendezvousServer>>,
    body: Body,
) -> Result<Json<CreateStreamResponse>> {
    let limit = server.config().http.max_create_body;
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| RendezvousError::InvalidBody(format!("Invalid body: {e}")))?;

    let request = parse_create_request(&bytes)?;
    let session = server
        .manager()
        .create_session(request.download_headers, request.upload_headers);

    Ok(Json(CreateStreamResponse {
        stream: session.id(),
    }))
}

/// `GET /stream/:id/status`
pub async fn status_handler(
    Extension(server): Extension<Arc<RendezvousServer>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>> {
    let id = parse_id(&id)?;
    let snapshot = server.manager().get_session(&id)?;
    Ok(Json(snapshot.into()))
}

/// `PUT /stream/:id`
///
/// The request body is the source. Replies with the transfer counters once
/// the body ends, with the session's declared upload headers attached.
pub async fn source_handler(
    Extension(server): Extension<Arc<RendezvousServer>>,
    Path(id): Path<String>,
    body: Body,
) -> Result<Response> {
    let id = parse_id(&id)?;
    let attachment = server.manager().attach_source(&id)?;
    let upload_headers = attachment.session().upload_headers().clone();

    let stats = attachment.relay(body.into_data_stream()).await?;

    let mut response = Json(stats).into_response();
    for (name, value) in upload_headers.iter() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => tracing::warn!("Session {} skipping upload header {}", id, name),
        }
    }
    Ok(response)
}

/// Unparseable ids cannot name a session, so they are reported as unknown.
fn parse_id(raw: &str) -> Result<SessionId> {
    raw.parse().map_err(|_| RendezvousError::not_found(raw))
}

/// Decode and validate a `POST /stream` body. An empty body means no
/// declared headers.
fn parse_create_request(bytes: &[u8]) -> Result<CreateStreamRequest> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateStreamRequest::default());
    }

    let request: CreateStreamRequest = serde_json::from_slice(bytes)
        .map_err(|e| RendezvousError::InvalidBody(format!("Invalid JSON: {e}")))?;

    validate_headers(&request.download_headers)?;
    validate_headers(&request.upload_headers)?;
    Ok(request)
}

fn validate_headers(headers: &HeaderSet) -> Result<()> {
    for (name, value) in headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(RendezvousError::InvalidBody(format!(
                "Not a valid HTTP header name: {name}"
            )));
        }
        if HeaderValue::from_str(value).is_err() {
            return Err(RendezvousError::InvalidBody(format!(
                "Not a valid HTTP header value: \"{value}\""
            )));
        }
    }
    Ok(())
}
