//! Session state types

use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Pairing Artifact
// ============================================================================

/// One-time pairing payload issued by the transport.
///
/// Opaque to the gateway: it is only ever rendered, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingArtifact {
    code: String,
}

impl PairingArtifact {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

// ============================================================================
// Connection State
// ============================================================================

/// Connection state of the messaging session.
///
/// The pairing artifact lives inside `AwaitingPairing`, so leaving that
/// variant drops the artifact in the same assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Connection {
    /// Transport not started, or (re)initializing
    #[default]
    Idle,

    /// Transport issued a pairing code and waits for a device to scan it
    AwaitingPairing { artifact: PairingArtifact },

    /// Credential accepted, session still loading
    Authenticated,

    /// Fully connected; the only state that accepts sends
    Ready,

    /// Lost the connection after being ready, or a (re)initialize failed
    Disconnected { reason: String },

    /// Transport rejected the stored credential
    AuthFailed { message: String },
}

/// Field-less mirror of [`Connection`] for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Idle,
    AwaitingPairing,
    Authenticated,
    Ready,
    Disconnected,
    AuthFailed,
}

impl ConnectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionKind::Idle => "idle",
            ConnectionKind::AwaitingPairing => "awaiting_pairing",
            ConnectionKind::Authenticated => "authenticated",
            ConnectionKind::Ready => "ready",
            ConnectionKind::Disconnected => "disconnected",
            ConnectionKind::AuthFailed => "auth_failed",
        }
    }
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Connection {
    pub fn kind(&self) -> ConnectionKind {
        match self {
            Connection::Idle => ConnectionKind::Idle,
            Connection::AwaitingPairing { .. } => ConnectionKind::AwaitingPairing,
            Connection::Authenticated => ConnectionKind::Authenticated,
            Connection::Ready => ConnectionKind::Ready,
            Connection::Disconnected { .. } => ConnectionKind::Disconnected,
            Connection::AuthFailed { .. } => ConnectionKind::AuthFailed,
        }
    }

    /// Sends are permitted only when ready; everything else fails closed
    pub fn is_ready(&self) -> bool {
        matches!(self, Connection::Ready)
    }

    pub fn pairing_artifact(&self) -> Option<&PairingArtifact> {
        match self {
            Connection::AwaitingPairing { artifact } => Some(artifact),
            _ => None,
        }
    }

    /// States from which a reconnect may be triggered
    pub fn can_reconnect(&self) -> bool {
        matches!(
            self,
            Connection::Idle | Connection::Disconnected { .. } | Connection::AuthFailed { .. }
        )
    }
}

// ============================================================================
// Session State
// ============================================================================

/// The single process-wide session state.
///
/// Only the session runtime writes it; everyone else reads published clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub connection: Connection,
    pub last_transition_at: DateTime<Utc>,
    /// Consecutive reconnect attempts since the last `Ready`
    pub reconnect_attempt: u32,
}

impl SessionState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            connection: Connection::Idle,
            last_transition_at: now,
            reconnect_attempt: 0,
        }
    }

    pub fn pairing_artifact(&self) -> Option<&PairingArtifact> {
        self.connection.pairing_artifact()
    }

    pub fn is_ready(&self) -> bool {
        self.connection.is_ready()
    }

    /// Move to `connection`, stamping the transition time
    pub fn with_connection(&self, connection: Connection, now: DateTime<Utc>) -> Self {
        Self {
            connection,
            last_transition_at: now,
            reconnect_attempt: self.reconnect_attempt,
        }
    }

    pub fn with_reconnect_attempt(mut self, attempt: u32) -> Self {
        self.reconnect_attempt = attempt;
        self
    }
}
