//! HTTP bridge transport
//!
//! The messaging client itself runs out of process behind a small JSON API.
//! This adapter speaks that API:
//!
//! - `POST /initialize` starts (or restarts) the client
//! - `GET /state` returns `{"state": "CONNECTED" | ...}`
//! - `GET /chats/{id}` returns the conversation or 404
//! - `POST /chats/{id}/messages` with `{"body": "..."}` sends text
//! - `GET /events` streams newline-delimited JSON `TransportEvent`s

use crate::runtime::{ConversationRef, Transport, TransportError, TransportEvent, TransportState};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_STREAM_RETRY: Duration = Duration::from_secs(5);

pub struct BridgeTransport {
    client: Client,
    base_url: Url,
    event_stream_retry: Duration,
}

impl BridgeTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::unknown(format!("Invalid bridge URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::unknown(format!(
                "Invalid bridge URL '{base_url}': not a base URL"
            )));
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            event_stream_retry: EVENT_STREAM_RETRY,
        })
    }

    #[cfg(test)]
    fn with_event_stream_retry(mut self, retry: Duration) -> Self {
        self.event_stream_retry = retry;
        self
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read_error(response: reqwest::Response) -> TransportError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<BridgeErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| format!("Bridge returned {status}: {body}"));
        classify_status(status, message)
    }
}

fn classify_status(status: StatusCode, message: String) -> TransportError {
    match status {
        StatusCode::NOT_FOUND => TransportError::not_found(message),
        s if s.is_client_error() => TransportError::rejected(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            TransportError::network(message)
        }
        _ => TransportError::unknown(message),
    }
}

fn request_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        TransportError::network(format!("Connection failed: {e}"))
    } else {
        TransportError::unknown(format!("Request failed: {e}"))
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn initialize(&self) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url(&["initialize"]))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(())
    }

    async fn connection_state(&self) -> Result<TransportState, TransportError> {
        let response = self
            .client
            .get(self.url(&["state"]))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let body: StateBody = response
            .json()
            .await
            .map_err(|e| TransportError::unknown(format!("Failed to parse state: {e}")))?;
        Ok(body.state)
    }

    fn subscribe(&self, sink: mpsc::Sender<TransportEvent>) {
        let client = self.client.clone();
        let url = self.url(&["events"]);
        let retry = self.event_stream_retry;

        tokio::spawn(async move {
            loop {
                let reason = tokio::select! {
                    () = sink.closed() => break,
                    reason = pump_events(&client, &url, &sink) => reason,
                };

                tracing::warn!(reason = %reason, "Bridge event stream ended");
                if sink
                    .send(TransportEvent::Disconnected {
                        reason: reason.clone(),
                    })
                    .await
                    .is_err()
                {
                    break;
                }

                tokio::select! {
                    () = sink.closed() => break,
                    () = tokio::time::sleep(retry) => {}
                }
            }
            tracing::debug!("Bridge event subscription stopped");
        });
    }

    async fn resolve_conversation(
        &self,
        id: &str,
    ) -> Result<Option<ConversationRef>, TransportError> {
        let response = self
            .client
            .get(self.url(&["chats", id]))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_error(&e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let conversation = response
            .json()
            .await
            .map_err(|e| TransportError::unknown(format!("Failed to parse conversation: {e}")))?;
        Ok(Some(conversation))
    }

    async fn send_text(
        &self,
        conversation: &ConversationRef,
        body: &str,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url(&["chats", &conversation.id, "messages"]))
            .timeout(REQUEST_TIMEOUT)
            .json(&SendBody { body })
            .send()
            .await
            .map_err(|e| request_error(&e))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(())
    }
}

/// Read one event stream until it ends; returns why it ended
async fn pump_events(client: &Client, url: &Url, sink: &mpsc::Sender<TransportEvent>) -> String {
    let response = match client.get(url.clone()).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => return format!("Event stream returned {}", r.status()),
        Err(e) => return request_error(&e).message,
    };

    tracing::info!(url = %url, "Bridge event stream opened");

    let mut stream = response.bytes_stream();
    let mut lines = LineBuffer::default();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => return format!("Event stream error: {e}"),
        };

        for line in lines.push(&chunk) {
            match serde_json::from_str::<TransportEvent>(&line) {
                Ok(event) => {
                    tracing::debug!(event = ?event, "Bridge event");
                    if sink.send(event).await.is_err() {
                        return "Session runtime stopped".to_string();
                    }
                }
                Err(e) => tracing::warn!(error = %e, line = %line, "Skipping malformed bridge event"),
            }
        }
    }

    "Event stream closed".to_string()
}

/// Splits a byte stream into trimmed, non-empty text lines
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            // Blank lines and `:` comments are keep-alives
            if !line.is_empty() && !line.starts_with(':') {
                lines.push(line);
            }
        }
        lines
    }
}

#[derive(Debug, Deserialize)]
struct StateBody {
    state: TransportState,
}

#[derive(Debug, Serialize)]
struct SendBody<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct BridgeErrorBody {
    error: Option<String>,
}
