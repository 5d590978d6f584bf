//! Gateway error taxonomy and its JSON response mapping.
//!
//! # Mapping
//! ```text
//! InvalidInput        → 400 {"error"}
//! UpstreamUnreachable → 502 {"error"}
//! UpstreamStatus(s)   → s   {"error", "status"}
//! Unauthorized        → 401 {"error"}
//! RedirectLoop        → 502 {"error"}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to clients of the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or malformed `url` parameter or feed address.
    #[error("{0}")]
    InvalidInput(String),

    /// Network failure or timeout talking to the origin.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Origin answered with a non-success status.
    #[error("Upstream responded with status {}", .0.as_u16())]
    UpstreamStatus(StatusCode),

    /// Missing or wrong bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Redirect chain longer than the allowed hop count.
    #[error("Too many redirects (limit {0})")]
    RedirectLoop(usize),
}

impl GatewayError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamStatus(status) => *status,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::RedirectLoop(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidInput(_) => "invalid_input",
            GatewayError::UpstreamUnreachable(_) => "upstream_unreachable",
            GatewayError::UpstreamStatus(_) => "upstream_status",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::RedirectLoop(_) => "redirect_loop",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::UpstreamUnreachable(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::UpstreamStatus(upstream) => json!({
                "error": self.to_string(),
                "status": upstream.as_u16(),
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
