//! Per-connection serving and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Drive one client connection through hyper (HTTP/1.1 or HTTP/2)
//! - Close keep-alive connections that sit idle past the idle timeout
//! - Switch to graceful shutdown when the server starts draining
//!
//! # Design Decisions
//! - Header reads are bounded by hyper's `header_read_timeout`
//! - Idleness is tracked with atomics; the idle timer sleeps until the
//!   computed deadline instead of polling
//! - Graceful shutdown lets the in-flight exchange finish, then closes

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Instant;
use tower::ServiceExt;

/// Relaxed ordering is enough: IDs only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Inbound timeouts applied to every connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub read_timeout: Duration,
    pub idle_timeout: Duration,
}

/// Request activity on one connection.
#[derive(Debug)]
pub struct ConnectionActivity {
    opened: Instant,
    in_flight: AtomicUsize,
    /// Milliseconds since `opened` at the last request start or finish.
    last_active_ms: AtomicU64,
}

impl ConnectionActivity {
    pub fn new() -> Self {
        Self {
            opened: Instant::now(),
            in_flight: AtomicUsize::new(0),
            last_active_ms: AtomicU64::new(0),
        }
    }

    /// Mark a request as started. Dropping the guard marks it finished.
    pub fn begin(self: &Arc<Self>) -> ActivityGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.touch();
        ActivityGuard {
            activity: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// When the connection becomes idle-expired, or `None` while a request is running.
    pub fn idle_deadline(&self, idle_timeout: Duration) -> Option<Instant> {
        if self.in_flight() > 0 {
            return None;
        }
        let last = Duration::from_millis(self.last_active_ms.load(Ordering::SeqCst));
        Some(self.opened + last + idle_timeout)
    }

    fn touch(&self) {
        let elapsed = self.opened.elapsed().as_millis();
        self.last_active_ms
            .store(u64::try_from(elapsed).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    /// Resolve once the connection has had no request for `idle_timeout`.
    pub async fn idle_expired(&self, idle_timeout: Duration) {
        loop {
            let wake = self
                .idle_deadline(idle_timeout)
                .unwrap_or_else(|| Instant::now() + idle_timeout);
            tokio::time::sleep_until(wake).await;

            if let Some(deadline) = self.idle_deadline(idle_timeout) {
                if Instant::now() >= deadline {
                    return;
                }
            }
        }
    }
}

impl Default for ConnectionActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for one in-flight request.
#[derive(Debug)]
pub struct ActivityGuard {
    activity: Arc<ConnectionActivity>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.activity.touch();
        self.activity.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Serve one accepted connection until it closes.
///
/// `drain` flips to `true` when the server stops accepting; the connection
/// then finishes its current exchange and closes.
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    settings: ConnectionSettings,
    mut drain: watch::Receiver<bool>,
) {
    let id = ConnectionId::new();
    let activity = Arc::new(ConnectionActivity::new());
    tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection accepted");

    let service = {
        let activity = Arc::clone(&activity);
        service_fn(move |mut request: Request<Incoming>| {
            let guard = activity.begin();
            let router = router.clone();
            request.extensions_mut().insert(ConnectInfo(peer));
            async move {
                let response = router.oneshot(request).await;
                drop(guard);
                response
            }
        })
    };

    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(settings.read_timeout);

    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let idle = activity.idle_expired(settings.idle_timeout);
    tokio::pin!(idle);

    let mut closing = *drain.borrow();
    if closing {
        conn.as_mut().graceful_shutdown();
    }

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(connection_id = %id, peer_addr = %peer, error = %e, "Connection ended with error");
                }
                break;
            }
            _ = drain.changed(), if !closing => {
                closing = true;
                tracing::debug!(
                    connection_id = %id,
                    in_flight = activity.in_flight(),
                    "Draining connection"
                );
                conn.as_mut().graceful_shutdown();
            }
            _ = &mut idle, if !closing => {
                closing = true;
                tracing::debug!(connection_id = %id, idle_timeout = ?settings.idle_timeout, "Closing idle connection");
                conn.as_mut().graceful_shutdown();
            }
        }
    }

    tracing::trace!(connection_id = %id, "Connection closed");
}
