//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful shutdown. On non-unix targets
//! only Ctrl+C is observed.

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("SIGINT"),
            Signal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Block until the process is asked to terminate.
///
/// Fails only if the signal handlers cannot be registered.
#[cfg(unix)]
pub async fn wait_for_termination() -> io::Result<Signal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    let received = tokio::select! {
        _ = interrupt.recv() => Signal::Interrupt,
        _ = terminate.recv() => Signal::Terminate,
    };
    tracing::info!(signal = %received, "Shutdown signal received");
    Ok(received)
}

#[cfg(not(unix))]
pub async fn wait_for_termination() -> io::Result<Signal> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(signal = %Signal::Interrupt, "Shutdown signal received");
    Ok(Signal::Interrupt)
}
