//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order from a validated config
//! - Start the optional metrics exporter
//! - Bind the listener last, so traffic arrives only when everything is ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::net::{AddrParseError, SocketAddr};

use axum::http::header::InvalidHeaderValue;
use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::GatewayServer;
use crate::net::listener::{self, ListenerError};
use crate::observability::metrics;
use crate::routing::RouteError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid route configuration: {0}")]
    Routes(#[from] RouteError),

    #[error("invalid CORS configuration: {0}")]
    Cors(#[from] InvalidHeaderValue),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("invalid metrics address '{addr}': {source}")]
    MetricsAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] BuildError),
}

/// Everything needed to start serving.
pub struct Bootstrap {
    pub server: GatewayServer,
    pub listener: TcpListener,
}

/// Build the gateway from `config` and bind its listener.
pub async fn bootstrap(config: &GatewayConfig) -> Result<Bootstrap, StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|source| StartupError::MetricsAddress {
                addr: config.observability.metrics_address.clone(),
                source,
            })?;
        metrics::install_exporter(addr)?;
    }

    let server = GatewayServer::new(config)?;
    let listener = listener::bind(&config.server).await?;

    Ok(Bootstrap { server, listener })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;
    use crate::lifecycle::ServerState;

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config
    }

    #[tokio::test]
    async fn bootstrap_binds_and_starts_in_starting_state() {
        let Bootstrap { server, listener } = bootstrap(&config()).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
        assert_eq!(server.lifecycle().state(), ServerState::Starting);
    }

    #[tokio::test]
    async fn duplicate_routes_abort_startup() {
        let mut config = config();
        let route = RouteConfig {
            path: "/users".into(),
            method: "GET".into(),
            upstream_url: "http://users:8080".into(),
            rewrite_path: String::new(),
        };
        config.gateway.routes = vec![route.clone(), route];

        let err = bootstrap(&config).await.err().unwrap();
        assert!(matches!(err, StartupError::Routes(RouteError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn bad_metrics_address_aborts_startup() {
        let mut config = config();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "not-an-address".into();

        let err = bootstrap(&config).await.err().unwrap();
        assert!(matches!(err, StartupError::MetricsAddress { .. }));
    }
}
