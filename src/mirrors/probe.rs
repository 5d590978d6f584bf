//! Startup mirror selection.
//!
//! # Responsibilities
//! - Probe candidate mirrors in priority order with a short HEAD request
//! - Activate the first candidate answering with a success status
//! - Fall back to the default mirror when every probe fails
//!
//! # Design Decisions
//! - Runs once, off the request path, after the listener is bound
//! - No periodic re-probe: a mirror that dies later stays active

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::mirrors::resolver::{MirrorBackend, MirrorResolver};
use crate::observability::metrics;

const PROBE_USER_AGENT: &str = "feed-gateway-mirror-probe";

pub struct MirrorProbe {
    resolver: Arc<MirrorResolver>,
    client: reqwest::Client,
    timeout: Duration,
}

impl MirrorProbe {
    pub fn new(resolver: Arc<MirrorResolver>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(PROBE_USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Probe client build failed, using defaults");
                reqwest::Client::new()
            });

        Self {
            resolver,
            client,
            timeout,
        }
    }

    /// Probe one mirror. Any non-success answer or timeout counts as down.
    ///
    /// The deadline covers connect, request and response headers.
    pub async fn probe(&self, backend: &MirrorBackend) -> bool {
        let response_future = self.client.head(&backend.url).send();

        match time::timeout(self.timeout, response_future).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(mirror = %backend.url, status = %response.status(), "Mirror probe failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(mirror = %backend.url, error = %e, "Mirror probe failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(mirror = %backend.url, "Mirror probe failed: timeout");
                false
            }
        }
    }

    /// Scan the candidates once and publish the winner.
    pub async fn select_active(&self) -> MirrorBackend {
        tracing::info!(
            candidates = self.resolver.candidates().len(),
            "Mirror selection starting"
        );

        let mut selected = None;
        for candidate in self.resolver.candidates() {
            if self.probe(candidate).await {
                selected = Some(candidate.clone());
                break;
            }
        }

        let selected = selected.unwrap_or_else(|| {
            let fallback = self.resolver.default_backend().clone();
            tracing::warn!(mirror = %fallback.url, "No mirror answered, using default");
            fallback
        });

        metrics::record_active_mirror(&selected.url);
        self.resolver.activate(selected.clone());
        selected
    }

    /// Run the selection in the background.
    pub fn spawn(self) -> JoinHandle<MirrorBackend> {
        tokio::spawn(async move { self.select_active().await })
    }
}
