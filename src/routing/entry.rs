//! A single immutable path/method → upstream binding.

use axum::http::uri::PathAndQuery;
use axum::http::Method;
use thiserror::Error;
use url::Url;

use crate::config::RouteConfig;

/// Errors raised while compiling routes at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("path '{path}' must start with '/'")]
    InvalidPath { path: String },

    #[error("'{method}' is not a valid HTTP method")]
    InvalidMethod { method: String },

    #[error("upstream url '{url}' is invalid: {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("rewrite path '{path}' must be empty or a '/'-prefixed path without query or fragment")]
    InvalidRewrite { path: String },

    #[error("duplicate route {method} {path}")]
    Duplicate { path: String, method: String },
}

impl RouteError {
    /// Name of the route field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            RouteError::InvalidPath { .. } | RouteError::Duplicate { .. } => "path",
            RouteError::InvalidMethod { .. } => "method",
            RouteError::InvalidUpstream { .. } => "upstream_url",
            RouteError::InvalidRewrite { .. } => "rewrite_path",
        }
    }
}

/// Compiled route. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    path: String,
    method: Method,
    upstream: Url,
    rewrite_path: Option<String>,
}

impl RouteEntry {
    /// Compile a configured route, checking path, method and upstream URL.
    ///
    /// Methods are normalised to upper case so `get` and `GET` are the same key.
    pub fn from_config(route: &RouteConfig) -> Result<Self, RouteError> {
        if !route.path.starts_with('/') {
            return Err(RouteError::InvalidPath {
                path: route.path.clone(),
            });
        }

        let method = Method::from_bytes(route.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| RouteError::InvalidMethod {
                method: route.method.clone(),
            })?;

        let upstream = parse_upstream(&route.upstream_url)?;

        let rewrite_path = match route.rewrite_path.as_str() {
            "" => None,
            p => Some(parse_rewrite(p)?),
        };

        Ok(Self {
            path: route.path.clone(),
            method,
            upstream,
            rewrite_path,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    pub fn rewrite_path(&self) -> Option<&str> {
        self.rewrite_path.as_deref()
    }

    /// `host[:port]` of the upstream, used as the outbound `Host` header.
    pub fn upstream_authority(&self) -> String {
        let host = self.upstream.host_str().unwrap_or_default();
        match self.upstream.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}

fn parse_rewrite(raw: &str) -> Result<String, RouteError> {
    let valid = raw.starts_with('/')
        && !raw.contains(['?', '#'])
        && raw.parse::<PathAndQuery>().is_ok();
    if valid {
        Ok(raw.to_string())
    } else {
        Err(RouteError::InvalidRewrite {
            path: raw.to_string(),
        })
    }
}

fn parse_upstream(raw: &str) -> Result<Url, RouteError> {
    let invalid = |reason: &str| RouteError::InvalidUpstream {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}
