//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Mirror used when no candidate answers the startup probe.
pub const DEFAULT_MIRROR: &str = "https://rsshub.app";

/// Candidate mirrors, highest priority first.
pub const DEFAULT_MIRROR_CANDIDATES: &[&str] = &[
    "https://rsshub.app",
    "https://rsshub.rssforever.com",
    "https://rsshub.feeded.xyz",
    "https://hub.slarker.me",
    "https://rsshub.liumingye.cn",
    "https://rsshub-instance.zeabur.app",
];

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Public base URL of this service, used to build proxy links.
    pub server_url: String,

    /// Bearer-token settings.
    pub auth: AuthConfig,

    /// Feed mirror backends.
    pub mirrors: MirrorConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            server_url: format!("http://localhost:{}", DEFAULT_PORT),
            auth: AuthConfig::default(),
            mirrors: MirrorConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Configured bearer secret, if any. Blank tokens count as unset.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret expected as `Authorization: Bearer <token>`.
    pub token: Option<String>,
}

/// Mirror backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Candidate mirrors in priority order.
    pub instances: Vec<String>,

    /// Mirror used when every candidate fails its probe.
    pub default: String,

    /// Per-candidate probe timeout in seconds.
    pub probe_timeout_secs: u64,

    /// Run the failover scan when the server starts.
    pub probe_on_startup: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            instances: DEFAULT_MIRROR_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default: DEFAULT_MIRROR.to_string(),
            probe_timeout_secs: 5,
            probe_on_startup: true,
        }
    }
}

/// Timeout configuration for upstream and inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Feed fetch timeout in seconds.
    pub feed_secs: u64,

    /// Image fetch timeout in seconds (per hop).
    pub image_secs: u64,

    /// Inbound request timeout in seconds (until response headers).
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            feed_secs: 30,
            image_secs: 30,
            request_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
