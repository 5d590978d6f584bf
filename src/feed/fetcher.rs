//! Feed Fetcher.
//!
//! Retrieves a syndication document with browser-like headers and buffers
//! it fully; the rewriter needs the whole document for its regex passes.
//! The body is kept as raw bytes so the upstream `Content-Type` charset
//! still describes what is served.

use axum::body::Bytes;
use axum::http::{header, StatusCode};
use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};

/// Desktop browser User-Agent sent to publishers.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.8";

/// Content type reported when the publisher omits one.
pub const DEFAULT_FEED_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// A fully buffered upstream feed.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    /// Final URL after transport-level redirects.
    pub url: String,
    pub body: Bytes,
    pub content_type: String,
    pub status: StatusCode,
}

#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DESKTOP_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url`; non-2xx answers become `UpstreamStatus`.
    pub async fn fetch(&self, url: &str) -> GatewayResult<FetchedFeed> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, FEED_ACCEPT)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UpstreamStatus(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_FEED_CONTENT_TYPE)
            .to_string();

        let final_url = response.url().to_string();
        let body = response.bytes().await?;

        if final_url != url {
            tracing::debug!(url = %url, final_url = %final_url, "Feed redirected");
        }
        tracing::debug!(url = %final_url, bytes = body.len(), "Feed fetched");

        Ok(FetchedFeed {
            url: final_url,
            body,
            content_type,
            status,
        })
    }
}
