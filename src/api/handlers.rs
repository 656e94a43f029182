//! HTTP request handlers

use super::types::{ErrorResponse, SendMessageRequest, SendMessageResponse, StatusResponse};
use super::views;
use super::AppState;
use crate::dispatch::{SendError, SendRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::Instrument;
use uuid::Uuid;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/qr", get(get_pairing_page))
        .route("/send-message", post(send_message))
        .route("/reconnect", post(request_reconnect))
        .route("/ping", get(ping))
        // Legacy paths kept for existing callers
        .route("/teste-conexao", get(get_status))
        .route("/enviar-mensagem", post(send_message))
        .with_state(state)
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.session.status().into())
}

async fn get_pairing_page(State(state): State<AppState>) -> Html<String> {
    Html(views::render(&state.session.pairing_view(&state.pairing)))
}

/// Ask the session to re-initialize; a no-op unless it is disconnected,
/// failed or idle. Returns the status as of the request.
async fn request_reconnect(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StatusResponse>), AppError> {
    state
        .session
        .reconnect()
        .await
        .map_err(AppError::Unavailable)?;
    Ok((StatusCode::ACCEPTED, Json(state.session.status().into())))
}

async fn ping() -> &'static str {
    "pong"
}

async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, AppError> {
    // A malformed body is treated as missing fields, after the readiness check
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable send request body");
            SendMessageRequest::default()
        }
    };
    let span = tracing::info_span!("send_message", request_id = %Uuid::new_v4());
    tracing::debug!(parent: &span, request = ?body, "Send request");

    let request = SendRequest::new(
        body.group_id.unwrap_or_default(),
        body.mensagem.unwrap_or_default(),
    );
    let receipt = state
        .session
        .send_message(&request)
        .instrument(span.clone())
        .await?;
    tracing::debug!(
        parent: &span,
        conversation_id = %receipt.conversation.id,
        conversation_name = ?receipt.conversation.name,
        "Send accepted"
    );

    Ok(Json(SendMessageResponse {
        success: true,
        message: "Message sent".to_string(),
    }))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal { message: String, error_type: String },
}

impl From<SendError> for AppError {
    fn from(error: SendError) -> Self {
        tracing::info!(error = %error, retryable = error.is_retryable(), "Send rejected");
        match error {
            SendError::NotConnected => AppError::Unavailable(error.to_string()),
            SendError::InvalidArgument(msg) => AppError::BadRequest(msg),
            SendError::ConversationNotFound(_) => AppError::NotFound(error.to_string()),
            SendError::SendFailed {
                message,
                error_type,
            } => AppError::Internal {
                message,
                error_type,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
            AppError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorResponse::new(msg))
            }
            AppError::Internal {
                message,
                error_type,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(message).with_type(error_type),
            ),
        };

        (status, Json(body)).into_response()
    }
}
