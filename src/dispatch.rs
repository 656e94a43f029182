//! Outbound message dispatch
//!
//! Guard on session state, validate, resolve the conversation, send once.
//! No retries and no de-duplication: a resent request is a new message.

use crate::runtime::{ConversationRef, Transport, TransportError};
use crate::session::Connection;
use thiserror::Error;

/// One outbound plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub conversation_id: String,
    pub body: String,
}

impl SendRequest {
    pub fn new(conversation_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            body: body.into(),
        }
    }

    fn validate(&self) -> Result<(), SendError> {
        if self.conversation_id.trim().is_empty() || self.body.trim().is_empty() {
            return Err(SendError::InvalidArgument(
                "groupId and mensagem are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Confirmation of a submitted message. The transport gives no message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub conversation: ConversationRef,
}

/// Request-scoped send failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("Messaging session is not connected")]
    NotConnected,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
    #[error("{message}")]
    SendFailed { message: String, error_type: String },
}

impl SendError {
    /// Whether a caller may retry the identical request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, SendError::NotConnected | SendError::SendFailed { .. })
    }
}

impl From<TransportError> for SendError {
    fn from(error: TransportError) -> Self {
        SendError::SendFailed {
            error_type: error.kind.error_type().to_string(),
            message: error.message,
        }
    }
}

/// Run the send contract against `transport` given the current connection.
pub async fn send_message<T: Transport + ?Sized>(
    connection: &Connection,
    transport: &T,
    request: &SendRequest,
) -> Result<SendReceipt, SendError> {
    if !connection.is_ready() {
        tracing::info!(state = %connection.kind(), "Rejecting send: session not ready");
        return Err(SendError::NotConnected);
    }

    request.validate()?;

    let conversation_id = request.conversation_id.trim();
    tracing::info!(conversation_id, "Resolving conversation");

    let conversation = match transport.resolve_conversation(conversation_id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => {
            tracing::info!(conversation_id, "Conversation not found");
            return Err(SendError::ConversationNotFound(conversation_id.to_string()));
        }
        Err(e) => {
            tracing::error!(conversation_id, error = %e, "Failed to resolve conversation");
            return Err(SendError::ConversationNotFound(conversation_id.to_string()));
        }
    };

    if let Err(e) = transport.send_text(&conversation, &request.body).await {
        tracing::error!(
            conversation_id,
            error = %e.message,
            error_type = e.kind.error_type(),
            "Failed to send message"
        );
        return Err(e.into());
    }

    tracing::info!(conversation_id, "Message sent");
    Ok(SendReceipt { conversation })
}
