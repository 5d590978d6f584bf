//! Route handlers.
//!
//! | Route | Auth |
//! |---|---|
//! | `GET /api/rss?url=` | when configured |
//! | `POST /api/subscribe` | when configured |
//! | `GET /api/image?url=` | open |
//! | `GET /api/rsshub/instances` | open |
//! | `GET /health`, `GET /` | open |

use axum::{
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;

use crate::error::{GatewayError, GatewayResult};
use crate::http::query::extract_url_param;
use crate::http::server::AppState;
use crate::mirrors::MirrorBackend;
use crate::observability::metrics;

const SERVICE_NAME: &str = "feed-gateway";

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub time: String,
}

#[derive(Serialize)]
pub struct InstancesResponse {
    pub instances: Vec<MirrorBackend>,
    pub active: MirrorBackend,
    pub default: MirrorBackend,
}

fn required_url(query: Option<&str>) -> GatewayResult<String> {
    query
        .and_then(extract_url_param)
        .ok_or_else(|| GatewayError::InvalidInput("Missing url parameter".into()))
}

/// Record metrics for a finished request and turn errors into JSON responses.
fn finish(route: &'static str, start: Instant, result: GatewayResult<Response>) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            if matches!(
                e,
                GatewayError::UpstreamUnreachable(_)
                    | GatewayError::UpstreamStatus(_)
                    | GatewayError::RedirectLoop(_)
            ) {
                metrics::record_upstream_error(e.kind());
            }
            e.into_response()
        }
    };
    metrics::record_request(route, response.status().as_u16(), start);
    response
}

pub async fn get_feed(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let start = Instant::now();
    finish("rss", start, proxy_feed(&state, query.as_deref()).await)
}

async fn proxy_feed(state: &AppState, query: Option<&str>) -> GatewayResult<Response> {
    let address = required_url(query).inspect_err(|_| {
        tracing::warn!("Feed request without url parameter");
    })?;

    let target = state.mirrors.resolve_address(&address).inspect_err(|e| {
        tracing::warn!(url = %address, error = %e, "Rejected feed address");
    })?;

    let feed = state.feeds.fetch(&target).await.inspect_err(|e| {
        tracing::error!(url = %target, error = %e, "Feed fetch failed");
    })?;

    let body = state.rewriter.rewrite(&feed.body, &feed.url);
    tracing::info!(
        url = %target,
        final_url = %feed.url,
        status = %feed.status,
        bytes = body.len(),
        "Feed served"
    );

    Ok(([(header::CONTENT_TYPE, feed.content_type)], body).into_response())
}

pub async fn get_image(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let start = Instant::now();
    finish("image", start, proxy_image(&state, query.as_deref()).await)
}

async fn proxy_image(state: &AppState, query: Option<&str>) -> GatewayResult<Response> {
    let url = required_url(query).inspect_err(|_| {
        tracing::warn!("Image request without url parameter");
    })?;

    let image = state.images.open(&url).await.inspect_err(|e| {
        tracing::error!(url = %url, error = %e, "Image fetch failed");
    })?;

    tracing::debug!(url = %url, final_url = %image.url, hops = image.hops, "Streaming image");
    Ok(image.into_response())
}

pub async fn get_instances(State(state): State<AppState>) -> Json<InstancesResponse> {
    Json(InstancesResponse {
        instances: state.mirrors.candidates().to_vec(),
        active: state.mirrors.active().as_ref().clone(),
        default: state.mirrors.default_backend().clone(),
    })
}

pub async fn subscribe() -> Json<serde_json::Value> {
    Json(json!({ "success": true }))
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        service: SERVICE_NAME,
        time: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
