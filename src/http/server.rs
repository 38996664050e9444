//! HTTP server setup and the accept loop.
//!
//! # Responsibilities
//! - Compile the route table and CORS policy into shared gateway state
//! - Assemble the Axum router: `/healthz`, the pipeline fallback, middleware
//! - Accept connections and serve each on its own task
//! - Drain connections on shutdown, bounded by the grace deadline
//!
//! # Middleware (outermost first)
//! ```text
//! SetRequestId → PropagateRequestId → Trace → RequestBodyTimeout(read)
//! ```

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::RequestBodyTimeoutLayer;
use tower_http::trace::{MakeSpan, TraceLayer};

use crate::config::{GatewayConfig, ServerConfig};
use crate::http::health;
use crate::http::pipeline::{self, Gateway};
use crate::lifecycle::startup::StartupError;
use crate::lifecycle::{Lifecycle, ServerState, ShutdownOutcome, SHUTDOWN_GRACE};
use crate::net::connection::{serve_connection, ConnectionSettings};
use crate::observability::metrics;
use crate::proxy::ProxyDispatcher;
use crate::routing::{RouteTable, HEALTH_PATH};
use crate::security::CorsPolicy;

/// Pause after a failed `accept` (e.g. file descriptor exhaustion).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// The edge gateway server.
pub struct GatewayServer {
    router: Router,
    settings: ConnectionSettings,
    lifecycle: Lifecycle,
    drain_deadline: Duration,
}

impl GatewayServer {
    /// Build the server from a validated configuration.
    ///
    /// Fails on invalid or duplicate routes and on CORS values that are not
    /// legal header values.
    pub fn new(config: &GatewayConfig) -> Result<Self, StartupError> {
        let routes = RouteTable::from_config(&config.gateway.routes)?;
        let cors = CorsPolicy::from_config(&config.cors)?;
        let dispatcher = ProxyDispatcher::new(&config.upstream, config.server.write_timeout);

        for route in routes.iter() {
            tracing::info!(
                method = %route.method(),
                path = %route.path(),
                upstream = %route.upstream(),
                rewrite_path = route.rewrite_path().unwrap_or(""),
                "Route registered"
            );
        }
        tracing::info!(routes = routes.len(), "Route table built");

        let gateway = Arc::new(Gateway::new(routes, cors, dispatcher));

        Ok(Self {
            router: Self::build_router(gateway, &config.server),
            settings: ConnectionSettings {
                read_timeout: config.server.read_timeout,
                idle_timeout: config.server.idle_timeout,
            },
            lifecycle: Lifecycle::new(),
            drain_deadline: SHUTDOWN_GRACE,
        })
    }

    /// Override the drain deadline (defaults to [`SHUTDOWN_GRACE`]).
    pub fn with_drain_deadline(mut self, deadline: Duration) -> Self {
        self.drain_deadline = deadline;
        self
    }

    /// Handle for observing state transitions.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(gateway: Arc<Gateway>, server: &ServerConfig) -> Router {
        Router::new()
            .route(HEALTH_PATH, any(health::healthz))
            .fallback(pipeline::dispatch)
            .with_state(gateway)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
                    .layer(RequestBodyTimeoutLayer::new(server.read_timeout)),
            )
    }

    /// Serve connections from `listener` until `shutdown` fires, then drain.
    ///
    /// Returns how the drain ended. Only a failure to read the listener's
    /// local address is reported as an error.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<ShutdownOutcome> {
        let addr = listener.local_addr()?;
        let (drain_tx, drain_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        self.lifecycle.advance(ServerState::Serving);
        tracing::info!(address = %addr, "Gateway serving");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!(peer_addr = %peer, error = %e, "Failed to set TCP_NODELAY");
                        }
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            self.router.clone(),
                            self.settings,
                            drain_rx.clone(),
                        ));
                        metrics::set_active_connections(connections.len());
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        tracing::warn!(error = %e, "Connection task failed");
                    }
                    metrics::set_active_connections(connections.len());
                }
                _ = shutdown.recv() => break,
            }
        }

        // Stop accepting: the OS refuses new connections from here on.
        drop(listener);
        self.lifecycle.advance(ServerState::Draining);
        tracing::info!(
            open_connections = connections.len(),
            deadline = ?self.drain_deadline,
            "Draining connections"
        );
        drain_tx.send_replace(true);

        let drained = tokio::time::timeout(self.drain_deadline, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        let outcome = match drained {
            Ok(()) => {
                tracing::info!("All connections drained");
                ShutdownOutcome::Graceful
            }
            Err(_) => {
                let open_connections = connections.len();
                tracing::warn!(
                    open_connections,
                    deadline = ?self.drain_deadline,
                    "Drain deadline elapsed, closing remaining connections"
                );
                connections.abort_all();
                while connections.join_next().await.is_some() {}
                ShutdownOutcome::Forced { open_connections }
            }
        };

        metrics::set_active_connections(0);
        self.lifecycle.advance(ServerState::Stopped);
        Ok(outcome)
    }
}

/// Request span carrying the request ID assigned by `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy)]
struct RequestSpan;

impl MakeSpan<Body> for RequestSpan {
    fn make_span(&mut self, request: &Request<Body>) -> tracing::Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            version = ?request.version(),
            request_id = %request_id,
        )
    }
}
