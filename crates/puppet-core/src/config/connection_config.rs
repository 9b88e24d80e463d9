//! Channel timing configuration

use super::timeouts;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Heartbeat and handshake timing for one designer <-> worker channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// How often the worker sends `PuppetAlive`
    #[serde(with = "humantime_serde")]
    pub heartbeat_interval: Duration,
    /// Silence tolerated before the worker is declared unresponsive
    #[serde(with = "humantime_serde")]
    pub liveness_timeout: Duration,
    /// Bound on the synchronize round trip
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Duration,
    /// Granularity of the liveness check
    #[serde(with = "humantime_serde")]
    pub watchdog_tick: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: timeouts::connection::heartbeat_interval(),
            liveness_timeout: timeouts::connection::liveness_timeout(),
            handshake_timeout: timeouts::connection::handshake_timeout(),
            watchdog_tick: timeouts::connection::watchdog_tick(),
        }
    }
}
