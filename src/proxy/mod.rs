//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Matched RouteEntry + inbound request
//!     → dispatcher.rs (URI rewrite, Host substitution, header hygiene)
//!     → client.rs (pooled hyper client, connect + TLS handshake bounds)
//!     → upstream response streamed back, or 502 on transport failure
//! ```

pub mod client;
pub mod dispatcher;

pub use dispatcher::ProxyDispatcher;
