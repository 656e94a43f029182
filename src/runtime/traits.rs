//! Trait abstractions for runtime I/O
//!
//! The messaging transport is an external collaborator. These traits let the
//! session runtime and the send path run against the HTTP bridge in
//! production and against mocks in tests.

use crate::session::Event;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// Transport Types
// ============================================================================

/// Events a transport can emit. Closed set, registered once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    PairingCode { code: String },
    Authenticated,
    Ready,
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    AuthFailure {
        #[serde(default)]
        message: String,
    },
}

impl From<TransportEvent> for Event {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::PairingCode { code } => Event::PairingCodeIssued { code },
            TransportEvent::Authenticated => Event::Authenticated,
            TransportEvent::Ready => Event::Ready,
            TransportEvent::Disconnected { reason } => Event::Disconnected { reason },
            TransportEvent::AuthFailure { message } => Event::AuthFailed { message },
        }
    }
}

/// Connection state as reported by the transport itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportState {
    Connected,
    Opening,
    #[serde(other)]
    Disconnected,
}

/// A resolved conversation (group or contact)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Transport error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::NotFound, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Rejected, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Bridge unreachable, timeouts
    Network,
    /// Target does not exist
    NotFound,
    /// Transport refused the operation
    Rejected,
    /// Unknown error
    Unknown,
}

impl TransportErrorKind {
    /// Name reported to HTTP callers as `errorType`
    pub fn error_type(self) -> &'static str {
        match self {
            Self::Network => "NetworkError",
            Self::NotFound => "NotFoundError",
            Self::Rejected => "RejectedError",
            Self::Unknown => "Error",
        }
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// The messaging transport capability
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start (or restart) the underlying client
    async fn initialize(&self) -> Result<(), TransportError>;

    /// The transport's own view of its connection
    async fn connection_state(&self) -> Result<TransportState, TransportError>;

    /// Register the event sink. Called once, before `initialize`.
    fn subscribe(&self, sink: mpsc::Sender<TransportEvent>);

    /// Look up a conversation by id; `Ok(None)` when it does not exist
    async fn resolve_conversation(&self, id: &str)
        -> Result<Option<ConversationRef>, TransportError>;

    /// Send a plain text message
    async fn send_text(&self, conversation: &ConversationRef, body: &str)
        -> Result<(), TransportError>;
}

// ============================================================================
// Arc implementation for trait objects
// ============================================================================

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn initialize(&self) -> Result<(), TransportError> {
        (**self).initialize().await
    }

    async fn connection_state(&self) -> Result<TransportState, TransportError> {
        (**self).connection_state().await
    }

    fn subscribe(&self, sink: mpsc::Sender<TransportEvent>) {
        (**self).subscribe(sink);
    }

    async fn resolve_conversation(
        &self,
        id: &str,
    ) -> Result<Option<ConversationRef>, TransportError> {
        (**self).resolve_conversation(id).await
    }

    async fn send_text(
        &self,
        conversation: &ConversationRef,
        body: &str,
    ) -> Result<(), TransportError> {
        (**self).send_text(conversation, body).await
    }
}
