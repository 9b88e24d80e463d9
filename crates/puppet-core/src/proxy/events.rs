use crate::capture::Divergence;
use std::fmt;
use std::time::Duration;

/// Why a connection task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionExit {
    /// Local shutdown request
    Shutdown,
    /// The worker closed the socket
    Closed,
    /// No heartbeat within the liveness timeout
    Unresponsive,
    /// The byte stream could not be framed or decoded
    Framing(String),
    /// Reading or writing the socket failed
    Transport(String),
    /// A capture file could not be written
    Capture(String),
}

impl fmt::Display for ConnectionExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown requested"),
            Self::Closed => f.write_str("worker closed the channel"),
            Self::Unresponsive => f.write_str("worker unresponsive"),
            Self::Framing(e) => write!(f, "framing error: {}", e),
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Capture(e) => write!(f, "capture error: {}", e),
        }
    }
}

/// Notifications delivered to the proxy owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    /// The channel is ready for commands
    Connected,
    /// No heartbeat arrived for `silent_for`; emitted at most once per connection
    WorkerUnresponsive { silent_for: Duration },
    /// The worker went away mid-session
    ChannelClosed,
    /// A frame of a kind this build does not know was dropped
    UnknownCommand { kind: u32 },
    /// Outbound commands stopped matching the control stream
    ReplayDivergence(Divergence),
    /// Every captured response has been dispatched
    ReplayFinished { frames: usize },
    /// The connection task has ended; always the last event
    Disconnected(ConnectionExit),
}
