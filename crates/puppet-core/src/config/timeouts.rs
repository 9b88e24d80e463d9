//! Centralized timing defaults
//!
//! Every value here can be overridden through [`super::PuppetConfig`].

use std::time::Duration;

/// Defaults for the designer <-> worker channel
pub mod connection {
    use super::*;

    /// Interval between worker heartbeats (2 seconds)
    pub const HEARTBEAT_INTERVAL_MS: u64 = 2_000;

    /// Silence after which the worker is declared unresponsive (10 seconds)
    pub const LIVENESS_TIMEOUT_MS: u64 = 10_000;

    /// Bound on the synchronize handshake (5 seconds)
    pub const HANDSHAKE_MS: u64 = 5_000;

    /// How often the watchdog looks at the last heartbeat (500 ms)
    pub const WATCHDOG_TICK_MS: u64 = 500;

    pub fn heartbeat_interval() -> Duration {
        Duration::from_millis(HEARTBEAT_INTERVAL_MS)
    }

    pub fn liveness_timeout() -> Duration {
        Duration::from_millis(LIVENESS_TIMEOUT_MS)
    }

    pub fn handshake_timeout() -> Duration {
        Duration::from_millis(HANDSHAKE_MS)
    }

    pub fn watchdog_tick() -> Duration {
        Duration::from_millis(WATCHDOG_TICK_MS)
    }
}

/// Defaults for worker process supervision
pub mod supervisor {
    use super::*;

    /// Time allowed for the worker to connect back (10 seconds)
    pub const STARTUP_SECS: u64 = 10;

    /// Wait after each termination signal (3 seconds)
    pub const TERMINATE_GRACE_MS: u64 = 3_000;

    /// Window in which an exit counts as a failed launch (200 ms)
    pub const IMMEDIATE_EXIT_MS: u64 = 200;

    /// Signals sent before the child is left to a background reaper
    pub const MAX_ESCALATIONS: u32 = 2;

    pub fn startup_timeout() -> Duration {
        Duration::from_secs(STARTUP_SECS)
    }

    pub fn terminate_grace() -> Duration {
        Duration::from_millis(TERMINATE_GRACE_MS)
    }

    pub fn immediate_exit_window() -> Duration {
        Duration::from_millis(IMMEDIATE_EXIT_MS)
    }
}
