//! Liveness endpoint, independent of the route table.

use axum::http::StatusCode;

/// Always `200 OK` with body `OK`. Not subject to CORS or method filtering.
pub async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
