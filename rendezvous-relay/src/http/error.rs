//! Mapping of rendezvous errors onto HTTP responses.

use crate::error::RendezvousError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rendezvous_types::ErrorBody;

impl RendezvousError {
    /// HTTP status for this error kind.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound { .. } | Self::BadRoute { .. } => StatusCode::NOT_FOUND,
            Self::SessionNotAttachable { .. } => StatusCode::CONFLICT,
            Self::SessionExpired { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Relay(_) | Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RendezvousError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorBody {
            name: self.name().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
