//! Server state machine.
//!
//! ```text
//! Starting ──bind ok──▶ Serving ──signal──▶ Draining ──drained / deadline──▶ Stopped
//! ```
//!
//! Transitions only move forward. Observers subscribe to a watch channel and
//! always see the latest state.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServerState {
    Starting,
    Serving,
    Draining,
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Starting => "starting",
            ServerState::Serving => "serving",
            ServerState::Draining => "draining",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared handle on the server's current state.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<ServerState>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Starting);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> ServerState {
        *self.tx.borrow()
    }

    /// Move to `next` if it lies ahead of the current state.
    ///
    /// Returns `false` (and changes nothing) for a backwards or repeated transition.
    pub fn advance(&self, next: ServerState) -> bool {
        let advanced = self.tx.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if advanced {
            tracing::info!(state = %next, "Server state changed");
        }
        advanced
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.tx.subscribe()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_starting() {
        assert_eq!(Lifecycle::new().state(), ServerState::Starting);
    }

    #[test]
    fn transitions_are_monotonic() {
        let lifecycle = Lifecycle::new();

        assert!(lifecycle.advance(ServerState::Serving));
        assert!(!lifecycle.advance(ServerState::Serving));
        assert!(lifecycle.advance(ServerState::Draining));
        assert!(!lifecycle.advance(ServerState::Serving));
        assert!(lifecycle.advance(ServerState::Stopped));
        assert!(!lifecycle.advance(ServerState::Starting));

        assert_eq!(lifecycle.state(), ServerState::Stopped);
    }

    #[test]
    fn draining_may_be_skipped() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.advance(ServerState::Stopped));
        assert_eq!(lifecycle.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let lifecycle = Lifecycle::new();
        let mut rx = lifecycle.subscribe();
        assert!(!rx.has_changed().unwrap());

        lifecycle.advance(ServerState::Serving);
        lifecycle.advance(ServerState::Draining);

        assert!(rx.has_changed().unwrap());
        let seen = *rx.wait_for(|s| *s == ServerState::Draining).await.unwrap();
        assert_eq!(seen, ServerState::Draining);
    }
}
