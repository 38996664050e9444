//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Reject malformed or duplicate routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::routing::entry::RouteEntry;
use crate::routing::HEALTH_PATH;
use crate::security::cors::CorsPolicy;

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "warning", "error", "fatal", "panic"];
const LOG_FORMATS: &[&str] = &["json", "text", "console"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation error for {field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `gateway.routes[2].upstream_url`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_server(config, &mut errors);
    validate_routes(config, &mut errors);
    validate_cors(config, &mut errors);
    validate_upstream(config, &mut errors);
    validate_logging(config, &mut errors);
    validate_observability(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_server(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let server = &config.server;

    if server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "host is required"));
    }
    if server.port == 0 {
        errors.push(ValidationError::new(
            "server.port",
            "port must be a valid number between 1 and 65535",
        ));
    }

    require_positive("server.read_timeout", server.read_timeout, errors);
    require_positive("server.write_timeout", server.write_timeout, errors);
    require_positive("server.idle_timeout", server.idle_timeout, errors);
}

fn validate_routes(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();

    for (i, route) in config.gateway.routes.iter().enumerate() {
        let field = format!("gateway.routes[{}]", i);

        if route.path == HEALTH_PATH {
            errors.push(ValidationError::new(
                format!("{}.path", field),
                format!("{} is reserved for the health endpoint", HEALTH_PATH),
            ));
            continue;
        }

        match RouteEntry::from_config(route) {
            Ok(entry) => {
                if !seen.insert((entry.path().to_string(), entry.method().clone())) {
                    errors.push(ValidationError::new(
                        field,
                        format!("duplicate route {} {}", entry.method(), entry.path()),
                    ));
                }
            }
            Err(e) => errors.push(ValidationError::new(
                format!("{}.{}", field, e.field()),
                e.to_string(),
            )),
        }
    }
}

fn validate_cors(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    if let Err(e) = CorsPolicy::from_config(&config.cors) {
        errors.push(ValidationError::new(
            "cors",
            format!("allowed methods/headers cannot be sent as a header: {}", e),
        ));
    }
}

fn validate_upstream(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let upstream = &config.upstream;

    require_positive("upstream.connect_timeout", upstream.connect_timeout, errors);
    require_positive("upstream.keep_alive", upstream.keep_alive, errors);
    require_positive("upstream.tls_handshake_timeout", upstream.tls_handshake_timeout, errors);
    require_positive("upstream.idle_conn_timeout", upstream.idle_conn_timeout, errors);
}

fn validate_logging(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "logging.level",
            format!("log level must be one of: {}", LOG_LEVELS.join(", ")),
        ));
    }

    let format = config.logging.format.to_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(ValidationError::new(
            "logging.format",
            format!("log format must be one of: {}", LOG_FORMATS.join(", ")),
        ));
    }
}

fn validate_observability(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }
}

fn require_positive(field: &str, value: Duration, errors: &mut Vec<ValidationError>) {
    if value.is_zero() {
        errors.push(ValidationError::new(field, "timeout must be positive"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn route(path: &str, method: &str, upstream: &str) -> RouteConfig {
        RouteConfig {
            path: path.into(),
            method: method.into(),
            upstream_url: upstream.into(),
            rewrite_path: String::new(),
        }
    }

    fn fields(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.server.host = String::new();
        config.server.port = 0;
        config.server.read_timeout = Duration::ZERO;
        config.logging.level = "loud".into();
        config.logging.format = "xml".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                "server.host",
                "server.port",
                "server.read_timeout",
                "logging.level",
                "logging.format"
            ]
        );
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = GatewayConfig::default();
        config.logging.level = "WARNING".into();
        config.logging.format = "Console".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_duplicate_route() {
        let mut config = GatewayConfig::default();
        config.gateway.routes = vec![
            route("/users", "GET", "http://users:8080"),
            route("/users", "POST", "http://users:8080"),
            route("/users", "get", "http://other:8080"),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "gateway.routes[2]");
        assert!(errors[0].message.contains("duplicate route GET /users"));
    }

    #[test]
    fn rejects_malformed_upstream() {
        let mut config = GatewayConfig::default();
        config.gateway.routes = vec![
            route("/a", "GET", "not a url"),
            route("/b", "GET", "ftp://files.internal"),
            route("/c", "GET", "/relative/only"),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                "gateway.routes[0].upstream_url",
                "gateway.routes[1].upstream_url",
                "gateway.routes[2].upstream_url"
            ]
        );
    }

    #[test]
    fn rejects_reserved_and_relative_paths() {
        let mut config = GatewayConfig::default();
        let mut rewritten = route("/ok", "GET", "http://svc");
        rewritten.rewrite_path = "no-slash".into();
        config.gateway.routes = vec![
            route("/healthz", "GET", "http://svc"),
            route("users", "GET", "http://svc"),
            rewritten,
            route("/m", "BAD METHOD", "http://svc"),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                "gateway.routes[0].path",
                "gateway.routes[1].path",
                "gateway.routes[2].rewrite_path",
                "gateway.routes[3].method"
            ]
        );
    }

    #[test]
    fn rejects_rewrite_that_is_not_a_uri_path() {
        let mut config = GatewayConfig::default();
        let mut spaced = route("/x", "GET", "http://svc");
        spaced.rewrite_path = "/a b".into();
        config.gateway.routes = vec![spaced];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["gateway.routes[0].rewrite_path"]);
    }

    #[test]
    fn rejects_unrenderable_cors_lists() {
        let mut config = GatewayConfig::default();
        config.cors.allowed_methods = vec!["GET\r\n".into()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["cors"]);
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["observability.metrics_address"]);
    }
}
