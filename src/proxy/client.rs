//! Pooled upstream HTTP client.
//!
//! One hyper client is shared by every route; its pool keeps idle
//! connections per upstream scheme and authority.

use std::future::Future;
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::Scheme;
use axum::http::Uri;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use thiserror::Error;
use tower::{BoxError, Service};

use crate::config::UpstreamConfig;

pub type UpstreamClient = Client<HandshakeTimeout<HttpsConnector<HttpConnector>>, Body>;

/// Raised when dialing plus the TLS handshake exceeds its budget.
#[derive(Debug, Error)]
#[error("upstream TLS handshake did not complete within {0:?}")]
pub struct HandshakeTimedOut(pub Duration);

/// Bounds the whole connect future of `https` upstreams.
///
/// The TCP dial is bounded by the inner connector's connect timeout; this
/// wrapper gives the TLS handshake its own allowance on top of that.
#[derive(Debug, Clone)]
pub struct HandshakeTimeout<C> {
    inner: C,
    connect: Duration,
    handshake: Duration,
}

impl<C> HandshakeTimeout<C> {
    pub fn new(inner: C, connect: Duration, handshake: Duration) -> Self {
        Self {
            inner,
            connect,
            handshake,
        }
    }
}

impl<C> Service<Uri> for HandshakeTimeout<C>
where
    C: Service<Uri>,
    C::Future: Send + 'static,
    C::Error: Into<BoxError>,
{
    type Response = C::Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<C::Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let is_tls = uri.scheme() == Some(&Scheme::HTTPS);
        let budget = self.connect + self.handshake;
        let connecting = self.inner.call(uri);

        Box::pin(async move {
            if !is_tls {
                return connecting.await.map_err(Into::into);
            }
            match tokio::time::timeout(budget, connecting).await {
                Ok(result) => result.map_err(Into::into),
                Err(_) => Err(HandshakeTimedOut(budget).into()),
            }
        })
    }
}

/// Build the shared upstream client from the configured tunables.
pub fn build_client(config: &UpstreamConfig) -> UpstreamClient {
    install_crypto_provider();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    http.set_connect_timeout(Some(config.connect_timeout));
    http.set_keepalive(Some(config.keep_alive));

    let https = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http);

    let connector = HandshakeTimeout::new(
        https,
        config.connect_timeout,
        config.tls_handshake_timeout,
    );

    Client::builder(TokioExecutor::new())
        .pool_timer(TokioTimer::new())
        .pool_idle_timeout(config.idle_conn_timeout)
        .pool_max_idle_per_host(config.max_idle_per_host)
        .build(connector)
}

fn install_crypto_provider() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Another component may have installed a provider already; either is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
