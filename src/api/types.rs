//! API request and response types

use crate::runtime::SessionStatus;
use crate::session::ConnectionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to send a message. Fields are optional so a missing field is a 400
/// from validation rather than a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub mensagem: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub whatsapp_status: &'static str,
    pub state: ConnectionKind,
    pub reconnect_attempt: u32,
    pub timestamp: DateTime<Utc>,
}

impl From<SessionStatus> for StatusResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            success: true,
            whatsapp_status: if status.connected {
                "connected"
            } else {
                "disconnected"
            },
            state: status.state,
            reconnect_attempt: status.reconnect_attempt,
            timestamp: status.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            error_type: None,
        }
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }
}
