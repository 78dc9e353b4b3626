//! Proxy error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

use periscope_core::{CodecError, RewriteError};

/// Errors surfaced while serving a proxied request.
///
/// Only target validation and upstream transport failures fail a request;
/// anything that goes wrong inside the rewriting passes degrades locally
/// and never reaches this type.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The `u` query parameter is absent.
    #[error("missing target URL parameter")]
    MissingTarget,

    /// The `u` query parameter does not decode to an absolute URL.
    #[error("invalid target URL: {0}")]
    InvalidTarget(#[from] CodecError),

    /// The client request body could not be read.
    #[error("unreadable request body: {0}")]
    Body(#[from] axum::Error),

    /// The outbound fetch failed (DNS, connect, TLS, timeout).
    #[error("upstream fetch failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The fetched document could not be rewritten.
    #[error("rewrite failed: {0}")]
    Rewrite(#[from] RewriteError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ProxyError::MissingTarget => (StatusCode::BAD_REQUEST, "Missing URL"),
            ProxyError::InvalidTarget(_) => (StatusCode::BAD_REQUEST, "Invalid URL"),
            ProxyError::Body(_) => (StatusCode::BAD_REQUEST, "Invalid request body"),
            ProxyError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Upstream fetch failed"),
            ProxyError::Rewrite(_) => (StatusCode::BAD_GATEWAY, "Rewrite failed"),
        };

        warn!(error = %self, "request failed");

        (status, message).into_response()
    }
}

/// Result type for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;
