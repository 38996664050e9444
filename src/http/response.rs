//! Responses the gateway produces itself.
//!
//! Everything else is relayed from the upstream untouched.

use axum::http::header::ALLOW;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// `404` for a path with no registered route.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// `405` naming the methods the path accepts.
pub fn method_not_allowed(allow: &str) -> Response {
    let mut response = (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response();
    if let Ok(value) = HeaderValue::from_str(allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

/// `204` answer to a CORS preflight.
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// `502` for any failure talking to the upstream.
pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
}
