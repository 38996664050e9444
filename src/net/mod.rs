//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! host:port
//!     → listener.rs (bind, report the attempted address on failure)
//!     → accept loop in http::server
//!     → connection.rs (hyper connection, idle + drain handling)
//!     → axum Router
//! ```

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, ConnectionSettings};
pub use listener::ListenerError;
