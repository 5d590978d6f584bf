//! Image Streamer.
//!
//! # Responsibilities
//! - Fetch an image with spoofed browser headers and a resolved Referer
//! - Follow redirects manually in a bounded loop (at most 5 hops)
//! - Stream the final body to the client without buffering it
//!
//! # Design Decisions
//! - Transport-level redirect following is disabled; every hop re-resolves the Referer
//! - Relative `Location` values are resolved against the URL that produced them
//! - Non-2xx final answers are reported as `UpstreamStatus`

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::feed::fetcher::DESKTOP_USER_AGENT;
use crate::image::referer::resolve_referer;
use crate::mirrors::resolver::is_http_url;
use crate::observability::metrics;

/// Maximum number of redirects followed for one image.
pub const MAX_REDIRECTS: usize = 5;

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";
const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A successful upstream image response, body not yet read.
#[derive(Debug)]
pub struct UpstreamImage {
    pub url: Url,
    pub hops: usize,
    response: reqwest::Response,
}

impl UpstreamImage {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }
}

impl IntoResponse for UpstreamImage {
    fn into_response(self) -> Response {
        let status = self.response.status();
        let upstream_headers = self.response.headers();

        let content_type = upstream_headers
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
        let content_length = upstream_headers.get(header::CONTENT_LENGTH).cloned();

        let mut response = Response::new(Body::from_stream(self.response.bytes_stream()));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, content_type);
        if let Some(length) = content_length {
            headers.insert(header::CONTENT_LENGTH, length);
        }
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(IMAGE_CACHE_CONTROL),
        );
        response
    }
}

#[derive(Debug, Clone)]
pub struct ImageStreamer {
    client: reqwest::Client,
    max_redirects: usize,
}

impl ImageStreamer {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(DESKTOP_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            max_redirects: MAX_REDIRECTS,
        })
    }

    /// Open `url`, following up to `MAX_REDIRECTS` redirects.
    pub async fn open(&self, url: &str) -> GatewayResult<UpstreamImage> {
        if !is_http_url(url) {
            return Err(GatewayError::InvalidInput(
                "Image URL must start with http:// or https://".into(),
            ));
        }
        let mut current = Url::parse(url)
            .map_err(|e| GatewayError::InvalidInput(format!("Invalid image URL: {}", e)))?;

        let mut hop = 0;
        loop {
            if hop > self.max_redirects {
                return Err(GatewayError::RedirectLoop(self.max_redirects));
            }

            let referer = resolve_referer(&current);
            tracing::debug!(url = %current, hop, referer = %referer, "Fetching image");

            let response = self
                .client
                .get(current.clone())
                .header(header::ACCEPT, IMAGE_ACCEPT)
                .header(header::REFERER, referer)
                .send()
                .await?;

            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok());
                if let Some(location) = location {
                    let next = current.join(location).map_err(|e| {
                        GatewayError::UpstreamUnreachable(format!(
                            "Invalid redirect location '{}': {}",
                            location, e
                        ))
                    })?;
                    if !matches!(next.scheme(), "http" | "https") {
                        return Err(GatewayError::UpstreamUnreachable(format!(
                            "Redirect to unsupported scheme: {}",
                            next
                        )));
                    }
                    metrics::record_redirect();
                    current = next;
                    hop += 1;
                    continue;
                }
            }

            if !status.is_success() {
                return Err(GatewayError::UpstreamStatus(status));
            }

            return Ok(UpstreamImage {
                url: current,
                hops: hop,
                response,
            });
        }
    }
}
