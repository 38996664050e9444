//! Cross-origin policy evaluation.
//!
//! # Rules
//! 1. An origin is allowed when the allowlist holds `*` or the exact origin.
//!    An allowed origin is reflected literally and credentials are allowed.
//! 2. A disallowed origin gets no CORS headers; the request carries on.
//! 3. `OPTIONS` is always answered locally with `204`, whatever the origin.
//! 4. Other requests continue to method filtering and forwarding.
//!
//! Reflecting the request origin together with
//! `Access-Control-Allow-Credentials: true` while the allowlist is `*`
//! lets any site make credentialed requests. This is the established
//! behaviour and is left unchanged.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
};
use axum::http::header::InvalidHeaderValue;
use axum::http::{HeaderMap, HeaderValue, Method};

use crate::config::CorsConfig;

/// Token that matches every origin (or every header, in `allowed_headers`).
pub const WILDCARD: &str = "*";

/// Process-wide CORS policy, read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
    max_age: u32,
}

impl CorsPolicy {
    /// Build the policy, pre-rendering the preflight header values.
    pub fn from_config(config: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        let allow_methods = match config.allowed_methods.as_slice() {
            [] => None,
            methods => Some(HeaderValue::from_str(&methods.join(", "))?),
        };

        let allow_headers = match config.allowed_headers.as_slice() {
            [] => None,
            [only] if only == WILDCARD => Some(HeaderValue::from_static(WILDCARD)),
            headers => Some(HeaderValue::from_str(&headers.join(", "))?),
        };

        Ok(Self {
            allowed_origins: config.allowed_origins.clone(),
            allow_methods,
            allow_headers,
            max_age: config.max_age,
        })
    }

    /// Whether `origin` passes the allowlist.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == WILDCARD || allowed == origin)
    }

    /// Decide the CORS outcome for one request.
    ///
    /// `route_methods` is the `Allow` value of the matched path, used as the
    /// preflight method list when none is configured.
    pub fn decide(
        &self,
        origin: Option<&HeaderValue>,
        method: &Method,
        route_methods: &str,
    ) -> CorsDecision {
        let allow_origin = origin
            .filter(|o| o.to_str().is_ok_and(|o| self.is_origin_allowed(o)))
            .cloned();

        let preflight = (method == Method::OPTIONS).then(|| Preflight {
            allow_methods: self
                .allow_methods
                .clone()
                .or_else(|| HeaderValue::from_str(route_methods).ok()),
            allow_headers: self.allow_headers.clone(),
            max_age: (self.max_age > 0).then(|| HeaderValue::from(self.max_age)),
        });

        CorsDecision {
            allow_credentials: allow_origin.is_some(),
            allow_origin,
            preflight,
        }
    }
}

/// Result of evaluating the CORS policy for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsDecision {
    /// Literal request origin to echo back, when allowed.
    pub allow_origin: Option<HeaderValue>,
    pub allow_credentials: bool,
    /// Present when the request is a preflight and must be answered with 204.
    pub preflight: Option<Preflight>,
}

/// Extra headers on a preflight answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub allow_methods: Option<HeaderValue>,
    pub allow_headers: Option<HeaderValue>,
    pub max_age: Option<HeaderValue>,
}

impl CorsDecision {
    pub fn is_preflight(&self) -> bool {
        self.preflight.is_some()
    }

    /// Write the decided headers, replacing any existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Some(origin) = &self.allow_origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }
        if self.allow_credentials {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }

        if let Some(preflight) = &self.preflight {
            if let Some(methods) = &preflight.allow_methods {
                headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods.clone());
            }
            if let Some(allowed) = &preflight.allow_headers {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allowed.clone());
            }
            if let Some(max_age) = &preflight.max_age {
                headers.insert(ACCESS_CONTROL_MAX_AGE, max_age.clone());
            }
        }
    }
}
