//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, method)
//!     → router.rs (exact path lookup, then method)
//!     → Return: Matched(route) | MethodNotAllowed(allowed) | NotFound
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → entry.rs (parse method + upstream URL)
//!     → reject duplicate (path, method)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact matching only: no prefixes, wildcards or parameters
//! - Deterministic: same input always matches same route

pub mod entry;
pub mod router;

pub use entry::{RouteEntry, RouteError};
pub use router::{PathRoutes, RouteLookup, RouteTable};

/// Liveness endpoint served ahead of the route table.
pub const HEALTH_PATH: &str = "/healthz";
