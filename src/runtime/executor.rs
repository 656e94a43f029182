//! Session runtime executor

use super::traits::{Transport, TransportEvent};
use crate::pairing::render_terminal;
use crate::session::{transition, Effect, Event, ReconnectPolicy, SessionState, TransitionError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Wall-clock reading that advances with tokio's clock, so transition times
/// follow paused time in tests
#[derive(Debug, Clone, Copy)]
struct SessionClock {
    wall: DateTime<Utc>,
    instant: Instant,
}

impl SessionClock {
    fn anchored_at(wall: DateTime<Utc>) -> Self {
        Self {
            wall,
            instant: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.instant.elapsed())
            .map_or(self.wall, |elapsed| self.wall + elapsed)
    }
}

/// The single writer of `SessionState`
pub struct SessionRuntime<T>
where
    T: Transport + 'static,
{
    state: SessionState,
    clock: SessionClock,
    policy: ReconnectPolicy,
    transport: Arc<T>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    state_tx: watch::Sender<SessionState>,
    shutdown: CancellationToken,
}

impl<T> SessionRuntime<T>
where
    T: Transport + 'static,
{
    pub fn new(
        policy: ReconnectPolicy,
        transport: Arc<T>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        transport_rx: mpsc::Receiver<TransportEvent>,
        state_tx: watch::Sender<SessionState>,
        shutdown: CancellationToken,
    ) -> Self {
        let state = state_tx.borrow().clone();
        Self {
            clock: SessionClock::anchored_at(state.last_transition_at),
            state,
            policy,
            transport,
            event_rx,
            event_tx,
            transport_rx,
            state_tx,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Starting session runtime");

        // Initial connect; failures come back as InitializeFailed
        self.execute_effect(Effect::InitializeTransport);

        // Process events in a loop until shutdown
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                Some(event) = self.transport_rx.recv() => {
                    self.process_event(event.into());
                }
                Some(event) = self.event_rx.recv() => {
                    self.process_event(event);
                }
                else => break,
            }
        }

        tracing::info!("Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let event_name = event.name();

        // Pure state transition
        let result = match transition(&self.state, &self.policy, event, self.clock.now()) {
            Ok(r) => r,
            Err(TransitionError::StaleTimer { attempt, current }) => {
                tracing::debug!(attempt, current, "Ignoring stale reconnect timer");
                return;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring event");
                return;
            }
        };

        // Publish state and artifact together before any effect runs
        if result.new_state != self.state {
            tracing::info!(
                event = event_name,
                from = %self.state.connection.kind(),
                to = %result.new_state.connection.kind(),
                reconnect_attempt = result.new_state.reconnect_attempt,
                "Session state changed"
            );
            self.state = result.new_state;
            self.state_tx.send_replace(self.state.clone());
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::InitializeTransport => {
                let transport = self.transport.clone();
                let event_tx = self.event_tx.clone();
                let attempt = self.state.reconnect_attempt;
                tokio::spawn(async move {
                    tracing::info!(attempt, "Initializing transport");
                    if let Err(e) = transport.initialize().await {
                        tracing::error!(attempt, error = %e, "Transport initialize failed");
                        let _ = event_tx
                            .send(Event::InitializeFailed { message: e.message })
                            .await;
                    }
                });
            }

            Effect::ScheduleReconnect {
                delay,
                attempt,
                disconnected_at,
            } => {
                tracing::info!(attempt, delay_secs = delay.as_secs(), "Scheduling reconnect");
                let event_tx = self.event_tx.clone();
                let shutdown = self.shutdown.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = shutdown.cancelled() => {}
                        () = tokio::time::sleep(delay) => {
                            let _ = event_tx
                                .send(Event::ReconnectTimeout {
                                    attempt,
                                    disconnected_at,
                                })
                                .await;
                        }
                    }
                });
            }

            Effect::ReconnectExhausted { attempts } => {
                tracing::warn!(
                    attempts,
                    probe_interval_secs = self.policy.probe_interval.as_secs(),
                    "Reconnect attempts exhausted, waiting for health check"
                );
            }

            Effect::RenderPairingCode { code } => {
                tracing::info!("Pairing code received");
                match render_terminal(&code) {
                    Ok(rendered) => {
                        eprintln!();
                        eprintln!("Scan this code to link the session:");
                        eprintln!("{rendered}");
                        eprintln!();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to render pairing code in terminal");
                        tracing::info!(payload = %code, "Pairing payload");
                    }
                }
            }
        }
    }
}
