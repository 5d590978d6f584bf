//! Backend Resolver.
//!
//! # Responsibilities
//! - Hold the ordered candidate mirrors and the fallback default
//! - Publish the active mirror as a single atomically-swapped value
//! - Turn `rsshub://platform/path` addresses into concrete mirror URLs
//!
//! # Design Decisions
//! - The active mirror starts as the default and is replaced by the startup probe
//! - Readers never lock; a request racing the probe may still see the default
//! - Plain http(s) URLs pass through untouched

use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;

use crate::config::MirrorConfig;
use crate::error::{GatewayError, GatewayResult};

/// Scheme prefix for abstract feed addresses.
pub const ABSTRACT_SCHEME: &str = "rsshub://";

/// A single mirror backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MirrorBackend {
    pub url: String,
}

impl MirrorBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Resolves feed addresses against the currently active mirror.
#[derive(Debug)]
pub struct MirrorResolver {
    candidates: Vec<MirrorBackend>,
    default: MirrorBackend,
    active: ArcSwap<MirrorBackend>,
}

impl MirrorResolver {
    /// Create a resolver whose active mirror is the default until probed.
    pub fn new(config: &MirrorConfig) -> Self {
        let default = MirrorBackend::new(config.default.as_str());
        Self {
            candidates: config
                .instances
                .iter()
                .map(|url| MirrorBackend::new(url.as_str()))
                .collect(),
            active: ArcSwap::from_pointee(default.clone()),
            default,
        }
    }

    /// Candidates in probe order.
    pub fn candidates(&self) -> &[MirrorBackend] {
        &self.candidates
    }

    /// The fallback mirror.
    pub fn default_backend(&self) -> &MirrorBackend {
        &self.default
    }

    /// The mirror currently serving abstract addresses.
    pub fn active(&self) -> Arc<MirrorBackend> {
        self.active.load_full()
    }

    /// Publish a new active mirror.
    pub fn activate(&self, backend: MirrorBackend) {
        tracing::info!(mirror = %backend.url, "Active mirror set");
        self.active.store(Arc::new(backend));
    }

    /// Map a feed address to a concrete upstream URL.
    pub fn resolve_address(&self, address: &str) -> GatewayResult<String> {
        let address = address.trim();

        if let Some(path) = strip_abstract_scheme(address) {
            if !path.chars().all(is_allowed_path_char) {
                return Err(GatewayError::InvalidInput(format!(
                    "Invalid characters in feed address: {}",
                    address
                )));
            }
            if path.trim_matches('/').is_empty() {
                return Err(GatewayError::InvalidInput(format!(
                    "Feed address has no route: {}",
                    address
                )));
            }

            let active = self.active();
            let resolved = if path.starts_with('/') {
                format!("{}{}", active.url, path)
            } else {
                format!("{}/{}", active.url, path)
            };
            tracing::debug!(address = %address, resolved = %resolved, "Resolved abstract address");
            return Ok(resolved);
        }

        if is_http_url(address) {
            return Ok(address.to_string());
        }

        Err(GatewayError::InvalidInput(format!(
            "Unsupported feed address: {}",
            address
        )))
    }
}

fn strip_abstract_scheme(address: &str) -> Option<&str> {
    let prefix = address.get(..ABSTRACT_SCHEME.len())?;
    if prefix.eq_ignore_ascii_case(ABSTRACT_SCHEME) {
        Some(&address[ABSTRACT_SCHEME.len()..])
    } else {
        None
    }
}

fn is_allowed_path_char(c: char) -> bool {
    c.is_alphanumeric() || "-._~/?=&%:+@,;!*()'".contains(c)
}

/// True when `raw` starts with `http://` or `https://` (case-insensitive).
pub fn is_http_url(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
