//! Effects produced by state transitions

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Effects to be executed after the new state has been published
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Invoke transport `initialize` (spawned; failure comes back as an event)
    InitializeTransport,

    /// Post `ReconnectTimeout { attempt, disconnected_at }` after `delay`.
    /// `disconnected_at` identifies the disconnect that scheduled it.
    ScheduleReconnect {
        delay: Duration,
        attempt: u32,
        disconnected_at: DateTime<Utc>,
    },

    /// Fast retry burst used up; wait for the periodic probe
    ReconnectExhausted { attempts: u32 },

    /// Print the pairing code to the terminal
    RenderPairingCode { code: String },
}

impl Effect {
    pub fn schedule_reconnect(
        delay: Duration,
        attempt: u32,
        disconnected_at: DateTime<Utc>,
    ) -> Self {
        Effect::ScheduleReconnect {
            delay,
            attempt,
            disconnected_at,
        }
    }
}
