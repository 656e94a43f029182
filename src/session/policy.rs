//! Reconnection policy
//!
//! Two tiers: a short burst of fixed-delay reconnects after a disconnect,
//! then slow periodic probing once the burst is used up.

use std::time::Duration;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before each reconnect in the burst
    pub delay: Duration,
    /// Reconnects allowed before falling back to periodic probing
    pub max_attempts: u32,
    /// Period of the health probe
    pub probe_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            probe_interval: DEFAULT_PROBE_INTERVAL,
        }
    }
}

impl ReconnectPolicy {
    /// Delay for the next reconnect after `attempts_so_far`, or `None` once
    /// the burst is exhausted
    pub fn next_delay(&self, attempts_so_far: u32) -> Option<Duration> {
        (attempts_so_far < self.max_attempts).then_some(self.delay)
    }

    pub fn is_exhausted(&self, attempts_so_far: u32) -> bool {
        attempts_so_far >= self.max_attempts
    }
}
