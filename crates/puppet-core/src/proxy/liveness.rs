use std::time::Duration;
use tokio::time::Instant;

/// Tracks the last heartbeat and reports silence exactly once
#[derive(Debug)]
pub struct LivenessMonitor {
    timeout: Duration,
    last_seen: Instant,
    reported: bool,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_seen: now,
            reported: false,
        }
    }

    pub fn record_heartbeat(&mut self, now: Instant) {
        self.last_seen = now;
    }

    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// `Some(silence)` the first time the timeout is exceeded, `None` otherwise
    pub fn check(&mut self, now: Instant) -> Option<Duration> {
        let silence = self.silence(now);
        if self.reported || silence < self.timeout {
            return None;
        }
        self.reported = true;
        Some(silence)
    }

    pub fn is_reported(&self) -> bool {
        self.reported
    }
}
