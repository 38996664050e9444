//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → route table + CORS policy → metrics → bind listener
//!
//! State (state.rs):
//!     Starting → Serving → Draining → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Broadcast received → stop accepting → drain connections → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has a timeout: connections still open at the deadline are closed

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::{Shutdown, ShutdownOutcome, SHUTDOWN_GRACE};
pub use startup::{bootstrap, Bootstrap, StartupError};
pub use state::{Lifecycle, ServerState};
