//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::duration::parse_duration;
use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_GATEWAY_HOST: &str = "GATEWAY_HOST";
pub const ENV_GATEWAY_PORT: &str = "GATEWAY_PORT";
pub const ENV_GATEWAY_READ_TIMEOUT: &str = "GATEWAY_READ_TIMEOUT";
pub const ENV_GATEWAY_WRITE_TIMEOUT: &str = "GATEWAY_WRITE_TIMEOUT";
pub const ENV_GATEWAY_IDLE_TIMEOUT: &str = "GATEWAY_IDLE_TIMEOUT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply process environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match path {
        Some(path) => parse_file(path)?,
        None => GatewayConfig::default(),
    };
    finish(config, |key| std::env::var(key).ok())
}

/// Parse a TOML config file without overrides or validation.
pub fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply overrides from `lookup` and validate the result.
pub fn finish<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = apply_env_overrides(&mut config, lookup);
    if let Err(mut invalid) = validate_config(&config) {
        errors.append(&mut invalid);
    }

    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Overlay `GATEWAY_*` / `LOG_*` variables onto `config`.
///
/// Unset or empty variables are ignored. Values that fail to parse are
/// reported against the variable name.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Vec<ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
    let mut errors = Vec::new();

    if let Some(host) = get(ENV_GATEWAY_HOST) {
        config.server.host = host;
    }

    if let Some(port) = get(ENV_GATEWAY_PORT) {
        match port.trim().parse::<u16>() {
            Ok(p) => config.server.port = p,
            Err(_) => errors.push(ValidationError::new(
                ENV_GATEWAY_PORT,
                "port must be a valid number between 1 and 65535",
            )),
        }
    }

    let timeouts = [
        (ENV_GATEWAY_READ_TIMEOUT, &mut config.server.read_timeout),
        (ENV_GATEWAY_WRITE_TIMEOUT, &mut config.server.write_timeout),
        (ENV_GATEWAY_IDLE_TIMEOUT, &mut config.server.idle_timeout),
    ];
    for (key, slot) in timeouts {
        if let Some(raw) = get(key) {
            match parse_duration(&raw) {
                Ok(d) => *slot = d,
                Err(msg) => errors.push(ValidationError::new(key, msg)),
            }
        }
    }

    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    if let Some(format) = get(ENV_LOG_FORMAT) {
        config.logging.format = format;
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9000
read_timeout = "2s"

[[gateway.routes]]
path = "/users"
method = "GET"
upstream_url = "http://users.internal:8080"

[[gateway.routes]]
path = "/orders"
method = "POST"
upstream_url = "https://orders.internal/api"
rewrite_path = "/v2/orders"

[cors]
allowed_origins = ["https://app.example.com"]
allowed_methods = ["GET", "POST"]
allowed_headers = ["*"]
max_age = 600
"#
        )
        .unwrap();

        let config = finish(parse_file(file.path()).unwrap(), env(&[])).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.server.read_timeout, Duration::from_secs(2));
        assert_eq!(config.server.write_timeout, Duration::from_secs(10));
        assert_eq!(config.gateway.routes.len(), 2);
        assert_eq!(config.gateway.routes[1].rewrite_path, "/v2/orders");
        assert_eq!(config.cors.max_age, 600);
    }

    #[test]
    fn env_overrides_file_values() {
        let config = finish(
            GatewayConfig::default(),
            env(&[
                (ENV_GATEWAY_HOST, "10.0.0.1"),
                (ENV_GATEWAY_PORT, "7000"),
                (ENV_GATEWAY_IDLE_TIMEOUT, "2m"),
                (ENV_LOG_LEVEL, "debug"),
                (ENV_LOG_FORMAT, ""),
            ]),
        )
        .unwrap();

        assert_eq!(config.bind_address(), "10.0.0.1:7000");
        assert_eq!(config.server.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn bad_env_values_are_reported_by_name() {
        let err = finish(
            GatewayConfig::default(),
            env(&[
                (ENV_GATEWAY_PORT, "http"),
                (ENV_GATEWAY_READ_TIMEOUT, "fast"),
                (ENV_LOG_LEVEL, "chatty"),
            ]),
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(
                    fields,
                    vec![ENV_GATEWAY_PORT, ENV_GATEWAY_READ_TIMEOUT, "logging.level"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn example_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/gateway.example.toml");
        let config = finish(parse_file(&path).unwrap(), env(&[])).unwrap();
        assert_eq!(config.gateway.routes.len(), 2);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server]\nport = \"eighty\"\n").unwrap();
        assert!(matches!(
            parse_file(file.path()).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
