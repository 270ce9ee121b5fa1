//! Error types for the relay.
//!
//! Only publish-side and static-file errors ever become HTTP responses.
//! Observer write failures are logged and swallowed where they occur.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::protocol::PublishAck;
use crate::state::ObserverId;

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Publish body was not a parseable envelope
    #[error("Invalid JSON: {0}")]
    InvalidInput(#[from] serde_json::Error),

    #[error("Write to observer {id} failed: {reason}")]
    TransportWriteFailure { id: ObserverId, reason: &'static str },

    #[error("No free port in {first}..={last}")]
    PortUnavailable { first: u16, last: u16 },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path escapes public root: {0}")]
    PathTraversal(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput(e) => {
                tracing::debug!("Rejected publish: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    Json(PublishAck::rejected("Invalid JSON")),
                )
                    .into_response()
            }
            Self::PathTraversal(path) => {
                tracing::warn!(path, "Blocked path traversal attempt");
                (StatusCode::FORBIDDEN, "Forbidden").into_response()
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
            other => {
                tracing::error!("Internal relay error: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
