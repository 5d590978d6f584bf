//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, DEFAULT_PORT};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration file without validating it.
pub fn read_config_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply `PORT`, `SERVER_URL`, `AUTH_TOKEN` and `RSSHUB_INSTANCES` overrides.
///
/// `lookup` abstracts the environment so callers can inject values.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let parsed: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            key: "PORT",
            value: port.clone(),
        })?;
        set_port(config, parsed);
    }

    if let Some(server_url) = lookup("SERVER_URL").filter(|s| !s.trim().is_empty()) {
        config.server_url = server_url.trim().trim_end_matches('/').to_string();
    }

    if let Some(token) = lookup("AUTH_TOKEN") {
        config.auth.token = Some(token);
    }

    if let Some(instances) = lookup("RSSHUB_INSTANCES") {
        let parsed: Vec<String> = instances
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .collect();
        if !parsed.is_empty() {
            config.mirrors.instances = parsed;
        }
    }

    Ok(())
}

/// Point the listener at `port`, keeping a default `server_url` in step.
pub fn set_port(config: &mut GatewayConfig, port: u16) {
    config.listener.bind_address = format!("0.0.0.0:{}", port);
    if config.server_url == format!("http://localhost:{}", DEFAULT_PORT) {
        config.server_url = format!("http://localhost:{}", port);
    }
}

/// Load configuration: defaults, then optional TOML file, then environment.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_port_override_moves_default_server_url() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, env(&[("PORT", "8088")])).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8088");
        assert_eq!(config.server_url, "http://localhost:8088");
    }

    #[test]
    fn test_explicit_server_url_wins() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[("PORT", "8088"), ("SERVER_URL", "https://proxy.example/")]),
        )
        .unwrap();
        assert_eq!(config.server_url, "https://proxy.example");
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "PORT", .. }));
    }

    #[test]
    fn test_instances_and_token_override() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("AUTH_TOKEN", "s3cret"),
                ("RSSHUB_INSTANCES", "https://a.example/, https://b.example,,"),
            ]),
        )
        .unwrap();
        assert_eq!(config.auth_token(), Some("s3cret"));
        assert_eq!(
            config.mirrors.instances,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_blank_token_means_open() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, env(&[("AUTH_TOKEN", "  ")])).unwrap();
        assert_eq!(config.auth_token(), None);
    }

    #[test]
    fn test_parse_toml_sections() {
        let config: GatewayConfig = toml::from_str(
            r#"
            server_url = "https://feeds.example"

            [auth]
            token = "abc"

            [mirrors]
            instances = ["https://m1.example"]

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.server_url, "https://feeds.example");
        assert_eq!(config.auth_token(), Some("abc"));
        assert_eq!(config.mirrors.instances, vec!["https://m1.example".to_string()]);
        assert_eq!(config.mirrors.probe_timeout_secs, 5);
        assert_eq!(config.timeouts.feed_secs, 30);
        assert_eq!(
            config.observability.log_format,
            crate::config::schema::LogFormat::Json
        );
    }
}
