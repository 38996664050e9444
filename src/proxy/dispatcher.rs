//! Forwarding of one request to its route's upstream.
//!
//! # Responsibilities
//! - Build the outbound URI (base path join or rewrite, query merge)
//! - Substitute the upstream `Host`
//! - Stream the upstream response back unchanged
//! - Turn every transport failure into `502 Bad Gateway`, including an
//!   upstream that has not answered within the response timeout
//!
//! # Design Decisions
//! - No retries, no failover: one upstream per route
//! - Bodies are streamed in both directions, never buffered

use std::error::Error as StdError;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::{HeaderValue, Request, Response, Uri, Version};

use crate::config::UpstreamConfig;
use crate::http::response;
use crate::observability::metrics;
use crate::proxy::client::{build_client, UpstreamClient};
use crate::routing::RouteEntry;
use crate::security::headers::{append_forwarded_for, strip_hop_by_hop};

/// Shared forwarder. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ProxyDispatcher {
    client: UpstreamClient,
    response_timeout: Duration,
}

impl ProxyDispatcher {
    /// `response_timeout` bounds the wait for the upstream's response head.
    pub fn new(config: &UpstreamConfig, response_timeout: Duration) -> Self {
        Self {
            client: build_client(config),
            response_timeout,
        }
    }

    /// Forward `request` to `route`'s upstream and relay the answer.
    ///
    /// Never fails: upstream errors are logged and rendered as 502.
    pub async fn forward(
        &self,
        route: &RouteEntry,
        request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Response<Body> {
        let started = Instant::now();
        let (mut parts, body) = request.into_parts();

        let uri = match outbound_uri(route, &parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(
                    upstream = %route.upstream(),
                    path = %parts.uri.path(),
                    error = %e,
                    "Failed to build upstream URI"
                );
                return response::bad_gateway();
            }
        };

        strip_hop_by_hop(&mut parts.headers);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut parts.headers, ip);
        }
        match HeaderValue::from_str(&route.upstream_authority()) {
            Ok(host) => {
                parts.headers.insert(HOST, host);
            }
            Err(_) => return response::bad_gateway(),
        }

        tracing::debug!(
            method = %parts.method,
            upstream_uri = %uri,
            "Forwarding request"
        );

        parts.uri = uri;
        // The pool negotiates HTTP/2 with the upstream itself.
        parts.version = Version::HTTP_11;

        let pending = self.client.request(Request::from_parts(parts, body));
        let outcome = match tokio::time::timeout(self.response_timeout, pending).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    upstream = %route.upstream(),
                    route = %route.path(),
                    timeout = ?self.response_timeout,
                    "Upstream response timed out"
                );
                metrics::record_upstream_error(route.upstream().as_str());
                return response::bad_gateway();
            }
        };

        match outcome {
            Ok(upstream_response) => {
                let (mut parts, body) = upstream_response.into_parts();
                strip_hop_by_hop(&mut parts.headers);

                tracing::debug!(
                    upstream = %route.upstream(),
                    status = %parts.status,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Upstream responded"
                );
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(
                    upstream = %route.upstream(),
                    route = %route.path(),
                    error = %e,
                    cause = %root_cause(&e),
                    "Upstream request failed"
                );
                metrics::record_upstream_error(route.upstream().as_str());
                response::bad_gateway()
            }
        }
    }
}

/// Compute the outbound URI for `inbound` on `route`.
///
/// Without a rewrite the upstream base path and request path are joined
/// with a single slash. With a rewrite the rewrite replaces the whole path.
/// The upstream query, if any, precedes the request query.
pub fn outbound_uri(route: &RouteEntry, inbound: &Uri) -> Result<Uri, axum::http::Error> {
    let upstream = route.upstream();

    let path = match route.rewrite_path() {
        Some(rewrite) => rewrite.to_string(),
        None => join_paths(upstream.path(), inbound.path()),
    };

    let base_query = upstream.query().filter(|q| !q.is_empty());
    let request_query = inbound.query().filter(|q| !q.is_empty());
    let path_and_query = match (base_query, request_query) {
        (Some(a), Some(b)) => format!("{}?{}&{}", path, a, b),
        (Some(q), None) | (None, Some(q)) => format!("{}?{}", path, q),
        (None, None) => path,
    };

    Uri::builder()
        .scheme(upstream.scheme())
        .authority(route.upstream_authority().as_str())
        .path_and_query(path_and_query)
        .build()
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn root_cause<'a>(e: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = e;
    while let Some(next) = current.source() {
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    fn entry(upstream: &str, rewrite: &str) -> RouteEntry {
        RouteEntry::from_config(&RouteConfig {
            path: "/users".into(),
            method: "GET".into(),
            upstream_url: upstream.into(),
            rewrite_path: rewrite.into(),
        })
        .unwrap()
    }

    fn outbound(upstream: &str, rewrite: &str, inbound: &str) -> String {
        outbound_uri(&entry(upstream, rewrite), &inbound.parse().unwrap())
            .unwrap()
            .to_string()
    }

    #[test]
    fn forwards_original_path_to_bare_upstream() {
        assert_eq!(
            outbound("http://users:8080", "", "/users?page=2"),
            "http://users:8080/users?page=2"
        );
    }

    #[test]
    fn joins_upstream_base_path_with_single_slash() {
        assert_eq!(outbound("http://svc/api", "", "/users"), "http://svc/api/users");
        assert_eq!(outbound("http://svc/api/", "", "/users"), "http://svc/api/users");
    }

    #[test]
    fn rewrite_replaces_path_and_keeps_query() {
        assert_eq!(
            outbound("https://svc.internal:8443/api", "/v2/people", "/users?active=true"),
            "https://svc.internal:8443/v2/people?active=true"
        );
    }

    #[test]
    fn upstream_query_comes_first() {
        assert_eq!(
            outbound("http://svc/?token=abc", "", "/users?page=1"),
            "http://svc/users?token=abc&page=1"
        );
        assert_eq!(outbound("http://svc/?token=abc", "", "/users"), "http://svc/users?token=abc");
    }

    #[test]
    fn join_paths_cases() {
        assert_eq!(join_paths("/", "/a"), "/a");
        assert_eq!(join_paths("/base", "a"), "/base/a");
        assert_eq!(join_paths("/base/", "a"), "/base/a");
        assert_eq!(join_paths("/base", "/a"), "/base/a");
    }
}
