//! Per-request control flow.
//!
//! ```text
//! request → route lookup ──NotFound──────────────▶ 404
//!              │
//!              ▼
//!          CORS decision ──OPTIONS───────────────▶ 204 + preflight headers
//!              │
//!              ▼
//!          method filter ──mismatch──────────────▶ 405 + Allow (+ CORS headers)
//!              │
//!              ▼
//!          dispatcher ───────────────────────────▶ upstream response / 502 (+ CORS headers)
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::ORIGIN;
use axum::http::{Request, StatusCode};
use axum::response::Response;

use crate::http::response;
use crate::observability::metrics;
use crate::proxy::ProxyDispatcher;
use crate::routing::{RouteLookup, RouteTable};
use crate::security::CorsPolicy;

/// Read-only state shared by every request task.
#[derive(Debug)]
pub struct Gateway {
    routes: RouteTable,
    cors: CorsPolicy,
    dispatcher: ProxyDispatcher,
}

impl Gateway {
    pub fn new(routes: RouteTable, cors: CorsPolicy, dispatcher: ProxyDispatcher) -> Self {
        Self {
            routes,
            cors,
            dispatcher,
        }
    }
}

/// Fallback handler: everything except `/healthz` lands here.
pub async fn dispatch(State(gateway): State<Arc<Gateway>>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let lookup = gateway.routes.lookup(&path, &method);
    let Some(path_routes) = lookup.path_routes() else {
        tracing::debug!(method = %method, path = %path, "No route matched");
        metrics::record_request(&method, StatusCode::NOT_FOUND, metrics::NO_ROUTE, started);
        return response::not_found();
    };
    let allow = path_routes.allow();

    let decision = gateway
        .cors
        .decide(request.headers().get(ORIGIN), &method, &allow);

    let mut response = if decision.is_preflight() {
        tracing::debug!(
            path = %path,
            origin_allowed = decision.allow_origin.is_some(),
            "Answered CORS preflight"
        );
        response::no_content()
    } else {
        match lookup {
            RouteLookup::Matched { route, .. } => {
                gateway.dispatcher.forward(route, request, client_ip).await
            }
            _ => {
                tracing::debug!(method = %method, path = %path, allow = %allow, "Method not allowed");
                response::method_not_allowed(&allow)
            }
        }
    };

    decision.apply(response.headers_mut());
    metrics::record_request(&method, response.status(), &path, started);
    response
}
