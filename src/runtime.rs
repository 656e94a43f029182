//! Runtime for the messaging session
//!
//! One actor owns `SessionState` and the transport. Transport events, timer
//! events and reconnect requests are serialized through its channel; every
//! transition is published as a whole snapshot over a `watch` channel, so
//! readers never see a state without its matching artifact.

mod executor;
pub mod scheduler;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::dispatch::{self, SendReceipt, SendError, SendRequest};
use crate::pairing::{pairing_view, PairingSettings, PairingView};
use crate::session::{ConnectionKind, Event, ReconnectPolicy, SessionState};
use chrono::{DateTime, Utc};
use scheduler::{spawn_logged, spawn_periodic};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Read-only status of the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub connected: bool,
    pub state: ConnectionKind,
    pub reconnect_attempt: u32,
    /// Time of the last state change
    pub timestamp: DateTime<Utc>,
}

impl From<&SessionState> for SessionStatus {
    fn from(state: &SessionState) -> Self {
        Self {
            connected: state.is_ready(),
            state: state.connection.kind(),
            reconnect_attempt: state.reconnect_attempt,
            timestamp: state.last_transition_at,
        }
    }
}

/// Owns the session runtime and its background tasks
pub struct SessionManager {
    handle: SessionHandle,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionManager {
    /// Subscribe to the transport, start the actor and the health probe.
    pub fn start<T: Transport + 'static>(
        transport: Arc<T>,
        policy: ReconnectPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (transport_tx, transport_rx) = mpsc::channel(64);
        let (state_tx, state_rx) = watch::channel(SessionState::new(Utc::now()));

        transport.subscribe(transport_tx);

        let runtime = SessionRuntime::new(
            policy,
            transport.clone(),
            event_rx,
            event_tx.clone(),
            transport_rx,
            state_tx,
            shutdown.clone(),
        );

        let mut tasks = vec![spawn_logged("session-runtime", runtime.run())];

        let probe_transport = transport.clone();
        let probe_tx = event_tx.clone();
        tasks.push(spawn_periodic(
            "health-check",
            policy.probe_interval,
            shutdown.clone(),
            move || {
                let transport = probe_transport.clone();
                let event_tx = probe_tx.clone();
                async move {
                    let transport_connected = match transport.connection_state().await {
                        Ok(state) => state == TransportState::Connected,
                        Err(e) => {
                            tracing::warn!(error = %e, "Health check could not reach transport");
                            false
                        }
                    };
                    tracing::debug!(transport_connected, "Health check");
                    let _ = event_tx.send(Event::HealthCheck { transport_connected }).await;
                }
            },
        ));

        let handle = SessionHandle {
            event_tx,
            state_rx,
            transport,
        };

        Self {
            handle,
            shutdown,
            tasks,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Cancel background tasks and wait for them to finish
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        tracing::info!("Session manager stopped");
    }
}

/// Cheap, cloneable access to the session for request handlers
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    state_rx: watch::Receiver<SessionState>,
    transport: Arc<dyn Transport>,
}

impl SessionHandle {
    /// Latest published state
    #[cfg(test)]
    pub fn snapshot(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus::from(&*self.state_rx.borrow())
    }

    pub fn pairing_view(&self, settings: &PairingSettings) -> PairingView {
        pairing_view(&self.state_rx.borrow(), settings)
    }

    /// Watch state changes
    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Ask the runtime to re-initialize the transport
    pub async fn reconnect(&self) -> Result<(), String> {
        self.event_tx
            .send(Event::ReconnectTriggered)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Dispatch one outbound message
    pub async fn send_message(&self, request: &SendRequest) -> Result<SendReceipt, SendError> {
        // Clone out of the borrow; it must not be held across the transport calls
        let connection = self.state_rx.borrow().connection.clone();
        dispatch::send_message(&connection, self.transport.as_ref(), request).await
    }
}
