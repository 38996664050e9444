//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! client connection
//!     → server.rs (router assembly, middleware, accept loop)
//!     → health.rs (/healthz, bypasses everything below)
//!     → pipeline.rs (route lookup, CORS, method filter, dispatch)
//!     → response.rs (locally produced 404 / 405 / 204 / 502)
//!     → Send to client
//! ```

pub mod health;
pub mod pipeline;
pub mod response;
pub mod server;

pub use pipeline::Gateway;
pub use server::GatewayServer;
