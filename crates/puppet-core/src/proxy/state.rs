use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle of a proxy connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    ShuttingDown,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting down",
        };
        f.write_str(name)
    }
}

/// State shared between the proxy handle and its connection task
#[derive(Debug, Clone)]
pub(crate) struct SharedState(Arc<RwLock<ConnectionState>>);

impl SharedState {
    pub(crate) fn new(initial: ConnectionState) -> Self {
        Self(Arc::new(RwLock::new(initial)))
    }

    pub(crate) fn get(&self) -> ConnectionState {
        *self.0.read()
    }

    pub(crate) fn set(&self, next: ConnectionState) {
        let mut state = self.0.write();
        if *state != next {
            debug!("Connection {} -> {}", *state, next);
            *state = next;
        }
    }
}
