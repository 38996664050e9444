//! Request policy subsystem.
//!
//! # Data Flow
//! ```text
//! Request with a known path
//!     → cors.rs (origin allowlist, preflight answer)
//!     → headers.rs (hop-by-hop stripping, X-Forwarded-For)
//!     → forwarded upstream
//! ```
//!
//! # Design Decisions
//! - One CORS policy for the whole process, shared read-only
//! - CORS rejection is not an error: headers are simply omitted

pub mod cors;
pub mod headers;

pub use cors::{CorsDecision, CorsPolicy};
