//! Edge Gateway
//!
//! Accepts inbound HTTP requests, matches them against a static route table,
//! applies a CORS policy and forwards them to one upstream per route.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                    EDGE GATEWAY                      │
//!                        │                                                      │
//!     Client Request     │  ┌─────────┐   ┌─────────┐   ┌──────────┐           │
//!     ───────────────────┼─▶│   net   │──▶│  http   │──▶│ routing  │           │
//!                        │  │listener │   │pipeline │   │  table   │           │
//!                        │  └─────────┘   └────┬────┘   └──────────┘           │
//!                        │                     │                                │
//!                        │                     ▼                                │
//!                        │               ┌──────────┐                           │
//!                        │               │ security │ (CORS, header hygiene)     │
//!                        │               └────┬─────┘                           │
//!                        │                     ▼                                │
//!     Client Response    │               ┌──────────┐                           │
//!     ◀──────────────────┼───────────────│  proxy   │◀──────────────────────────┼──── Upstream
//!                        │               │dispatcher│                           │
//!                        │               └──────────┘                           │
//!                        │                                                      │
//!                        │  config · lifecycle · observability                  │
//!                        └──────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod proxy;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::{Shutdown, ShutdownOutcome};
