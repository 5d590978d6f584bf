//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("server_url '{0}' must be an absolute http(s) URL")]
    ServerUrl(String),

    #[error("mirror list is empty")]
    NoMirrors,

    #[error("mirror '{0}' must be an absolute http(s) URL")]
    MirrorUrl(String),

    #[error("timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if !is_http_url(&config.server_url) {
        errors.push(ValidationError::ServerUrl(config.server_url.clone()));
    }

    if config.mirrors.instances.is_empty() {
        errors.push(ValidationError::NoMirrors);
    }
    for mirror in config
        .mirrors
        .instances
        .iter()
        .chain(std::iter::once(&config.mirrors.default))
    {
        if !is_http_url(mirror) {
            errors.push(ValidationError::MirrorUrl(mirror.clone()));
        }
    }

    let timeouts = [
        ("mirrors.probe_timeout_secs", config.mirrors.probe_timeout_secs),
        ("timeouts.feed_secs", config.timeouts.feed_secs),
        ("timeouts.image_secs", config.timeouts.image_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
