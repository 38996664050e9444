//! TCP listener setup.
//!
//! # Responsibilities
//! - Bind the configured `host:port`
//! - Report bind failures with the address that was attempted
//!
//! Accepting happens in the server's accept loop; dropping the listener is
//! what makes the OS refuse new connections during drain.

use std::io;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Bind the inbound listener described by `config`.
///
/// Hostnames are resolved; the first address that binds wins.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ListenerError> {
    let addr = config.bind_address();

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ListenerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    match listener.local_addr() {
        Ok(local) => tracing::info!(address = %local, "Listener bound"),
        Err(e) => tracing::warn!(address = %addr, error = %e, "Listener bound, local address unknown"),
    }

    Ok(listener)
}
