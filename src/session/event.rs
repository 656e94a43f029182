//! Events that can occur in a session

use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Transport events
    PairingCodeIssued {
        code: String,
    },
    Authenticated,
    Ready,
    Disconnected {
        reason: String,
    },
    AuthFailed {
        message: String,
    },

    // Reconnection events
    /// Explicit reconnect request (operator or caller)
    ReconnectTriggered,
    /// A scheduled reconnect timer fired
    ReconnectTimeout {
        attempt: u32,
        disconnected_at: DateTime<Utc>,
    },
    /// Transport `initialize` returned an error
    InitializeFailed {
        message: String,
    },
    /// Periodic probe result
    HealthCheck {
        transport_connected: bool,
    },
}

impl Event {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::PairingCodeIssued { .. } => "pairing_code_issued",
            Event::Authenticated => "authenticated",
            Event::Ready => "ready",
            Event::Disconnected { .. } => "disconnected",
            Event::AuthFailed { .. } => "auth_failed",
            Event::ReconnectTriggered => "reconnect_triggered",
            Event::ReconnectTimeout { .. } => "reconnect_timeout",
            Event::InitializeFailed { .. } => "initialize_failed",
            Event::HealthCheck { .. } => "health_check",
        }
    }
}
