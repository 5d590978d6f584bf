use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::http::server::AppState;

/// Check `Authorization: Bearer <token>` against the configured secret.
///
/// With no secret configured every request passes.
pub fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), GatewayError> {
    let Some(secret) = secret else {
        return Ok(());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if token == secret => Ok(()),
        _ => Err(GatewayError::Unauthorized),
    }
}

/// Auth gate for routes that require the bearer token when one is configured.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match authorize(request.headers(), state.config.auth_token()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(path = %request.uri().path(), "Rejected request without valid bearer token");
            e.into_response()
        }
    }
}
