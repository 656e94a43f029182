//! Pure state transition function
//!
//! Given the same state, policy, event and clock reading this always produces
//! the same result. No I/O happens here; the runtime executes the effects.

use super::{Connection, Effect, Event, PairingArtifact, ReconnectPolicy, SessionState};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// Keep the current state as-is (timestamp included)
    pub fn unchanged(state: &SessionState) -> Self {
        Self::new(state.clone())
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Stale reconnect timer for attempt {attempt} (current attempt {current})")]
    StaleTimer { attempt: u32, current: u32 },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: &SessionState,
    policy: &ReconnectPolicy,
    event: Event,
    now: DateTime<Utc>,
) -> Result<TransitionResult, TransitionError> {
    match (&state.connection, event) {
        // ============================================================
        // Pairing
        // ============================================================

        // Idle + PairingCodeIssued -> AwaitingPairing
        // AwaitingPairing + PairingCodeIssued -> AwaitingPairing (code rotated)
        (Connection::Idle | Connection::AwaitingPairing { .. }, Event::PairingCodeIssued { code }) => {
            let artifact = PairingArtifact::new(code.clone());
            Ok(TransitionResult::new(
                state.with_connection(Connection::AwaitingPairing { artifact }, now),
            )
            .with_effect(Effect::RenderPairingCode { code }))
        }

        // AwaitingPairing + Authenticated -> Authenticated (artifact dropped)
        (Connection::AwaitingPairing { .. }, Event::Authenticated) => Ok(TransitionResult::new(
            state.with_connection(Connection::Authenticated, now),
        )),

        // ============================================================
        // Readiness
        // ============================================================

        // any + Ready -> Ready, burst counter reset
        (_, Event::Ready) => Ok(TransitionResult::new(
            state
                .with_connection(Connection::Ready, now)
                .with_reconnect_attempt(0),
        )),

        // ============================================================
        // Disconnection
        // ============================================================

        // Ready + Disconnected -> Disconnected, reconnect scheduled
        (Connection::Ready, Event::Disconnected { reason }) => {
            Ok(enter_disconnected(state, policy, reason, now))
        }

        // Ready / Authenticated + failed probe -> Disconnected, same as a
        // transport disconnect
        (
            Connection::Ready | Connection::Authenticated,
            Event::HealthCheck {
                transport_connected: false,
            },
        ) => Ok(enter_disconnected(
            state,
            policy,
            "Transport reported not connected".to_string(),
            now,
        )),

        // Idle + InitializeFailed -> Disconnected, next attempt scheduled if any left
        (Connection::Idle, Event::InitializeFailed { message }) => {
            Ok(enter_disconnected(state, policy, message, now))
        }

        // ============================================================
        // Authentication failure
        // ============================================================

        // any (not Ready) + AuthFailed -> AuthFailed
        (connection, Event::AuthFailed { message }) if !connection.is_ready() => Ok(
            TransitionResult::new(state.with_connection(Connection::AuthFailed { message }, now)),
        ),

        // ============================================================
        // Reconnection
        // ============================================================

        // Disconnected / AuthFailed / Idle + ReconnectTriggered -> Idle
        (connection, Event::ReconnectTriggered) if connection.can_reconnect() => {
            Ok(reconnect(state, now))
        }

        // Disconnected + timer from this disconnect -> Idle
        (
            Connection::Disconnected { .. },
            Event::ReconnectTimeout {
                attempt,
                disconnected_at,
            },
        ) if attempt == state.reconnect_attempt.saturating_add(1)
            && disconnected_at == state.last_transition_at =>
        {
            Ok(reconnect(state, now))
        }

        (_, Event::ReconnectTimeout { attempt, .. }) => Err(TransitionError::StaleTimer {
            attempt,
            current: state.reconnect_attempt,
        }),

        // Disconnected with the burst used up -> periodic probe retries
        (Connection::Disconnected { .. }, Event::HealthCheck { .. })
            if policy.is_exhausted(state.reconnect_attempt) =>
        {
            Ok(reconnect(state, now))
        }

        // AuthFailed -> periodic probe re-initializes so a fresh code can be paired
        (Connection::AuthFailed { .. }, Event::HealthCheck { .. }) => Ok(reconnect(state, now)),

        // Idle for a whole probe interval: the last initialize went nowhere
        (Connection::Idle, Event::HealthCheck { .. }) if idle_too_long(state, policy, now) => {
            Ok(reconnect(state, now))
        }

        // Nothing to do for the probe anywhere else
        (_, Event::HealthCheck { .. }) => Ok(TransitionResult::unchanged(state)),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (connection, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {}",
            connection.kind(),
            event.name()
        ))),
    }
}

fn enter_disconnected(
    state: &SessionState,
    policy: &ReconnectPolicy,
    reason: String,
    now: DateTime<Utc>,
) -> TransitionResult {
    let attempts = state.reconnect_attempt;
    let result =
        TransitionResult::new(state.with_connection(Connection::Disconnected { reason }, now));

    match policy.next_delay(attempts) {
        Some(delay) => result.with_effect(Effect::schedule_reconnect(
            delay,
            attempts.saturating_add(1),
            now,
        )),
        None => result.with_effect(Effect::ReconnectExhausted { attempts }),
    }
}

fn idle_too_long(state: &SessionState, policy: &ReconnectPolicy, now: DateTime<Utc>) -> bool {
    match (now - state.last_transition_at).to_std() {
        Ok(elapsed) => elapsed >= policy.probe_interval,
        // Clock went backwards
        Err(_) => false,
    }
}

fn reconnect(state: &SessionState, now: DateTime<Utc>) -> TransitionResult {
    let attempt = state.reconnect_attempt.saturating_add(1);
    TransitionResult::new(
        state
            .with_connection(Connection::Idle, now)
            .with_reconnect_attempt(attempt),
    )
    .with_effect(Effect::InitializeTransport)
}
