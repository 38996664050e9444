//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::duration;

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound listener settings.
    pub server: ServerConfig,

    /// Route table definition.
    pub gateway: RoutesConfig,

    /// Cross-origin policy shared by every route.
    pub cors: CorsConfig,

    /// Outbound connection tuning.
    pub upstream: UpstreamConfig,

    /// Log level and output format.
    pub logging: LoggingConfig,

    /// Metrics exporter settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// The `host:port` string the listener binds to.
    pub fn bind_address(&self) -> String {
        self.server.bind_address()
    }
}

/// Inbound server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port to bind.
    pub port: u16,

    /// Bound on reading request headers and body.
    #[serde(with = "duration")]
    pub read_timeout: Duration,

    /// Bound on producing a response.
    #[serde(with = "duration")]
    pub write_timeout: Duration,

    /// How long a keep-alive connection may sit without a request.
    #[serde(with = "duration")]
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// `host:port`, with IPv6 literals bracketed.
    pub fn bind_address(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}

/// Container for the ordered route list (`[[gateway.routes]]`).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutesConfig {
    pub routes: Vec<RouteConfig>,
}

/// One path/method binding to an upstream.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// Exact request path.
    pub path: String,

    /// The single HTTP method this route accepts.
    pub method: String,

    /// Absolute base URL of the target service.
    pub upstream_url: String,

    /// Replacement path for the outbound request. Empty keeps the original.
    #[serde(default)]
    pub rewrite_path: String,
}

/// Cross-origin resource sharing policy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins, or `"*"`.
    pub allowed_origins: Vec<String>,

    /// Sent verbatim in `Access-Control-Allow-Methods` on preflight.
    pub allowed_methods: Vec<String>,

    /// Sent in `Access-Control-Allow-Headers` on preflight, or `["*"]`.
    pub allowed_headers: Vec<String>,

    /// Preflight cache lifetime in seconds (0 omits the header).
    pub max_age: u32,
}

/// Upstream client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// TCP dial timeout.
    #[serde(with = "duration")]
    pub connect_timeout: Duration,

    /// TCP keep-alive interval on upstream sockets.
    #[serde(with = "duration")]
    pub keep_alive: Duration,

    /// TLS handshake timeout for `https` upstreams.
    #[serde(with = "duration")]
    pub tls_handshake_timeout: Duration,

    /// How long an idle pooled connection is kept.
    #[serde(with = "duration")]
    pub idle_conn_timeout: Duration,

    /// Maximum idle pooled connections per upstream host.
    pub max_idle_per_host: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            keep_alive: Duration::from_secs(30),
            tls_handshake_timeout: Duration::from_secs(10),
            idle_conn_timeout: Duration::from_secs(90),
            max_idle_per_host: 32,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error, ...).
    pub level: String,

    /// Output format: json, text or console.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.server.idle_timeout, Duration::from_secs(60));
        assert!(config.gateway.routes.is_empty());
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let server = ServerConfig {
            host: "::1".into(),
            port: 9000,
            ..ServerConfig::default()
        };
        assert_eq!(server.bind_address(), "[::1]:9000");

        let server = ServerConfig {
            host: "localhost".into(),
            ..ServerConfig::default()
        };
        assert_eq!(server.bind_address(), "localhost:8080");
    }
}
