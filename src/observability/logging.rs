//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber once at startup
//! - Map configured level names onto `EnvFilter` directives
//! - Select the output format (JSON lines, compact text, pretty console)
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - JSON format for production, pretty format for development

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Translate a configured level name into a filter directive.
///
/// Unknown names fall back to `info`; validation rejects them before this runs.
pub fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "fatal" | "panic" => "error",
        _ => "info",
    }
}

/// Filter used by the subscriber: `RUST_LOG` if present, else the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_directive(&config.level)))
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed (e.g. a second call in tests).
pub fn init(config: &LoggingConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    match config.format.to_ascii_lowercase().as_str() {
        "console" => registry.with(fmt::layer().pretty()).try_init(),
        "text" => registry.with(fmt::layer().compact()).try_init(),
        _ => registry
            .with(fmt::layer().json().with_current_span(true).flatten_event(true))
            .try_init(),
    }
}
