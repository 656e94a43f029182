//! Mock implementations for testing
//!
//! These mocks enable integration testing without a real transport.

use super::traits::*;
use super::{SessionHandle, SessionManager};
use crate::session::{ConnectionKind, ReconnectPolicy, SessionState};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Transport
// ============================================================================

/// Mock transport with scripted results and call counters
pub struct MockTransport {
    conversations: Mutex<HashSet<String>>,
    initialize_results: Mutex<VecDeque<Result<(), TransportError>>>,
    resolve_error: Mutex<Option<TransportError>>,
    send_error: Mutex<Option<TransportError>>,
    state: Mutex<TransportState>,
    sink: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    initialize_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
    send_calls: AtomicUsize,
    /// Record of all sent messages (conversation id, body)
    pub sent: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashSet::new()),
            initialize_results: Mutex::new(VecDeque::new()),
            resolve_error: Mutex::new(None),
            send_error: Mutex::new(None),
            state: Mutex::new(TransportState::Disconnected),
            sink: Mutex::new(None),
            initialize_calls: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Make a conversation resolvable
    pub fn with_conversation(self, id: impl Into<String>) -> Self {
        self.conversations.lock().unwrap().insert(id.into());
        self
    }

    pub fn fail_resolve(self, error: TransportError) -> Self {
        *self.resolve_error.lock().unwrap() = Some(error);
        self
    }

    pub fn fail_send(self, error: TransportError) -> Self {
        *self.send_error.lock().unwrap() = Some(error);
        self
    }

    /// Queue an initialize result; once the queue is empty initialize succeeds
    pub fn queue_initialize(&self, result: Result<(), TransportError>) {
        self.initialize_results.lock().unwrap().push_back(result);
    }

    pub fn set_state(&self, state: TransportState) {
        *self.state.lock().unwrap() = state;
    }

    /// Push an event through the subscribed sink
    pub async fn emit(&self, event: TransportEvent) {
        let sink = self.sink.lock().unwrap().clone();
        sink.expect("transport not subscribed")
            .send(event)
            .await
            .expect("session runtime stopped");
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn initialize(&self) -> Result<(), TransportError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        self.initialize_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn connection_state(&self) -> Result<TransportState, TransportError> {
        Ok(*self.state.lock().unwrap())
    }

    fn subscribe(&self, sink: mpsc::Sender<TransportEvent>) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    async fn resolve_conversation(
        &self,
        id: &str,
    ) -> Result<Option<ConversationRef>, TransportError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.resolve_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .contains(id)
            .then(|| ConversationRef {
                id: id.to_string(),
                name: None,
            }))
    }

    async fn send_text(
        &self,
        conversation: &ConversationRef,
        body: &str,
    ) -> Result<(), TransportError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.send_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.sent
            .lock()
            .unwrap()
            .push((conversation.id.clone(), body.to_string()));
        Ok(())
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// A running session manager wired to a `MockTransport`
pub struct TestRuntime {
    pub transport: Arc<MockTransport>,
    pub handle: SessionHandle,
    pub policy: ReconnectPolicy,
    manager: SessionManager,
}

pub struct TestRuntimeBuilder {
    transport: Option<MockTransport>,
    policy: ReconnectPolicy,
}

#[allow(dead_code)]
impl TestRuntimeBuilder {
    pub fn transport(mut self, transport: MockTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> TestRuntime {
        let transport = Arc::new(self.transport.unwrap_or_default());
        let manager =
            SessionManager::start(transport.clone(), self.policy, CancellationToken::new());
        TestRuntime {
            transport,
            handle: manager.handle(),
            policy: self.policy,
            manager,
        }
    }
}

#[allow(dead_code)]
impl TestRuntime {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> TestRuntimeBuilder {
        TestRuntimeBuilder {
            transport: None,
            policy: ReconnectPolicy {
                delay: Duration::from_secs(5),
                max_attempts: 3,
                probe_interval: Duration::from_secs(300),
            },
        }
    }

    pub async fn emit(&self, event: TransportEvent) {
        self.transport.emit(event).await;
    }

    /// Wait until the published state satisfies `predicate`
    pub async fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl FnMut(&SessionState) -> bool,
    ) -> bool {
        let mut rx = self.handle.subscribe();
        // Bind first: the `watch::Ref` in the result must drop before `rx`
        let reached = matches!(
            tokio::time::timeout(timeout, rx.wait_for(predicate)).await,
            Ok(Ok(_))
        );
        reached
    }

    /// Wait for a specific connection state with timeout
    pub async fn wait_for_state(&self, expected: ConnectionKind, timeout: Duration) -> bool {
        self.wait_for(timeout, |s| s.connection.kind() == expected).await
    }

    /// Wait until the transport saw at least `n` initialize calls
    pub async fn wait_for_initialize_calls(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.transport.initialize_calls() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    pub async fn shutdown(self) {
        self.manager.shutdown().await;
    }
}

/// Let spawned tasks run without moving the clock
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{SendError, SendRequest};
    use crate::pairing::{render_svg, PairingSettings, PairingView};

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_mock_transport_counts_calls() {
        let transport = MockTransport::new().with_conversation("g1");

        let found = transport.resolve_conversation("g1").await.unwrap();
        assert!(found.is_some());
        let missing = transport.resolve_conversation("g2").await.unwrap();
        assert!(missing.is_none());

        transport
            .send_text(found.as_ref().unwrap(), "hello")
            .await
            .unwrap();

        assert_eq!(transport.resolve_calls(), 2);
        assert_eq!(transport.send_calls(), 1);
        assert_eq!(transport.sent(), vec![("g1".to_string(), "hello".to_string())]);
    }

    /// Runtime initializes the transport once on start
    #[tokio::test]
    async fn test_initializes_on_start() {
        let rt = TestRuntime::new().build();
        assert!(rt.wait_for_initialize_calls(1, WAIT).await);
        assert_eq!(rt.handle.status().state, ConnectionKind::Idle);
        rt.shutdown().await;
    }

    /// Pairing -> authenticated -> ready, observed through the view and status
    #[tokio::test]
    async fn test_pairing_scenario() {
        let rt = TestRuntime::new().build();
        let settings = PairingSettings::default();

        rt.emit(TransportEvent::PairingCode {
            code: "X".to_string(),
        })
        .await;
        assert!(rt.wait_for_state(ConnectionKind::AwaitingPairing, WAIT).await);
        assert_eq!(
            rt.handle.pairing_view(&settings),
            PairingView::Code {
                svg: render_svg("X").unwrap(),
                reload_interval: settings.reload_interval,
            }
        );

        rt.emit(TransportEvent::Authenticated).await;
        assert!(rt.wait_for_state(ConnectionKind::Authenticated, WAIT).await);
        assert!(rt.handle.snapshot().pairing_artifact().is_none());
        assert_eq!(
            rt.handle.pairing_view(&settings),
            PairingView::Awaiting {
                poll_interval: settings.poll_interval
            }
        );
        assert!(!rt.handle.status().connected);

        rt.emit(TransportEvent::Ready).await;
        assert!(rt.wait_for_state(ConnectionKind::Ready, WAIT).await);
        assert_eq!(rt.handle.pairing_view(&settings), PairingView::AlreadyConnected);
        assert!(rt.handle.status().connected);

        rt.shutdown().await;
    }

    /// Disconnect schedules a reconnect after exactly the configured delay
    #[tokio::test(start_paused = true)]
    async fn test_disconnect_reconnects_after_delay() {
        let rt = TestRuntime::new().build();
        assert!(rt.wait_for_initialize_calls(1, WAIT).await);

        rt.emit(TransportEvent::Ready).await;
        assert!(rt.wait_for_state(ConnectionKind::Ready, WAIT).await);

        rt.emit(TransportEvent::Disconnected {
            reason: "NAVIGATION".to_string(),
        })
        .await;
        settle().await;
        assert_eq!(rt.handle.status().state, ConnectionKind::Disconnected);
        assert_eq!(rt.handle.status().reconnect_attempt, 0);

        tokio::time::advance(rt.policy.delay - Duration::from_millis(100)).await;
        settle().await;
        assert_eq!(rt.transport.initialize_calls(), 1, "reconnect fired early");

        tokio::time::advance(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(rt.transport.initialize_calls(), 2);

        let status = rt.handle.status();
        assert_eq!(status.state, ConnectionKind::Idle);
        assert_eq!(status.reconnect_attempt, 1);

        rt.shutdown().await;
    }

    /// Failed reconnects run the burst, then stay disconnected for the probe
    #[tokio::test(start_paused = true)]
    async fn test_failed_reconnects_exhaust_burst() {
        let transport = MockTransport::new();
        let rt = TestRuntime::new().transport(transport).build();
        assert!(rt.wait_for_initialize_calls(1, WAIT).await);

        for _ in 0..rt.policy.max_attempts {
            rt.transport
                .queue_initialize(Err(TransportError::network("bridge down")));
        }

        rt.emit(TransportEvent::Ready).await;
        rt.emit(TransportEvent::Disconnected {
            reason: "lost".to_string(),
        })
        .await;

        let expected_calls = 1 + rt.policy.max_attempts as usize;
        assert!(
            rt.wait_for_initialize_calls(expected_calls, Duration::from_secs(60))
                .await
        );
        assert!(rt
            .wait_for(WAIT, |s| s.connection.kind() == ConnectionKind::Disconnected
                && s.reconnect_attempt == rt.policy.max_attempts)
            .await);

        // Nothing else happens before the probe interval
        tokio::time::advance(rt.policy.delay * 4).await;
        settle().await;
        assert_eq!(rt.transport.initialize_calls(), expected_calls);

        // The probe retries
        tokio::time::advance(rt.policy.probe_interval).await;
        settle().await;
        assert_eq!(rt.transport.initialize_calls(), expected_calls + 1);
        assert_eq!(rt.handle.status().reconnect_attempt, rt.policy.max_attempts + 1);

        rt.shutdown().await;
    }

    /// Initialize failure at startup is absorbed and retried
    #[tokio::test(start_paused = true)]
    async fn test_startup_failure_retries() {
        let transport = MockTransport::new();
        transport.queue_initialize(Err(TransportError::network("connection refused")));
        let rt = TestRuntime::new().transport(transport).build();

        assert!(rt.wait_for_state(ConnectionKind::Disconnected, WAIT).await);
        assert!(rt.wait_for_initialize_calls(2, Duration::from_secs(30)).await);
        assert!(rt.wait_for_state(ConnectionKind::Idle, WAIT).await);

        rt.shutdown().await;
    }

    /// Probe notices a transport that dropped without telling us
    #[tokio::test(start_paused = true)]
    async fn test_health_check_detects_silent_disconnect() {
        let rt = TestRuntime::new().build();
        rt.transport.set_state(TransportState::Connected);
        rt.emit(TransportEvent::Ready).await;
        assert!(rt.wait_for_state(ConnectionKind::Ready, WAIT).await);

        tokio::time::advance(rt.policy.probe_interval).await;
        settle().await;
        assert_eq!(rt.handle.status().state, ConnectionKind::Ready);

        rt.transport.set_state(TransportState::Disconnected);
        tokio::time::advance(rt.policy.probe_interval).await;
        settle().await;
        assert_eq!(rt.handle.status().state, ConnectionKind::Disconnected);

        rt.shutdown().await;
    }

    /// An initialize that succeeds but never leads anywhere is retried by the probe
    #[tokio::test(start_paused = true)]
    async fn test_health_check_restarts_stalled_idle() {
        let rt = TestRuntime::new().build();
        assert!(rt.wait_for_initialize_calls(1, WAIT).await);
        assert_eq!(rt.handle.status().state, ConnectionKind::Idle);

        tokio::time::advance(rt.policy.probe_interval).await;
        settle().await;
        assert_eq!(rt.transport.initialize_calls(), 2);
        let status = rt.handle.status();
        assert_eq!(status.state, ConnectionKind::Idle);
        assert_eq!(status.reconnect_attempt, 1);

        rt.shutdown().await;
    }

    /// A session that drops while still loading is noticed by the probe
    #[tokio::test(start_paused = true)]
    async fn test_health_check_recovers_dropped_authenticated_session() {
        let rt = TestRuntime::new().build();
        assert!(rt.wait_for_initialize_calls(1, WAIT).await);

        rt.emit(TransportEvent::PairingCode {
            code: "X".to_string(),
        })
        .await;
        rt.emit(TransportEvent::Authenticated).await;
        assert!(rt.wait_for_state(ConnectionKind::Authenticated, WAIT).await);

        // The drop itself is not a valid event outside Ready
        rt.emit(TransportEvent::Disconnected {
            reason: "lost".to_string(),
        })
        .await;
        settle().await;
        assert_eq!(rt.handle.status().state, ConnectionKind::Authenticated);

        rt.transport.set_state(TransportState::Disconnected);
        tokio::time::advance(rt.policy.probe_interval).await;
        settle().await;
        assert_eq!(rt.handle.status().state, ConnectionKind::Disconnected);
        assert_eq!(rt.transport.initialize_calls(), 1);

        tokio::time::advance(rt.policy.delay).await;
        settle().await;
        assert_eq!(rt.transport.initialize_calls(), 2);
        assert_eq!(rt.handle.status().reconnect_attempt, 1);

        rt.shutdown().await;
    }

    /// A timer left over from an earlier disconnect does not cut the delay short
    #[tokio::test(start_paused = true)]
    async fn test_reconnect_delay_restarts_on_each_disconnect() {
        let rt = TestRuntime::new().build();
        assert!(rt.wait_for_initialize_calls(1, WAIT).await);

        rt.emit(TransportEvent::Ready).await;
        rt.emit(TransportEvent::Disconnected {
            reason: "first".to_string(),
        })
        .await;
        settle().await;
        rt.emit(TransportEvent::Ready).await;
        settle().await;

        tokio::time::advance(Duration::from_secs(4)).await;
        rt.emit(TransportEvent::Disconnected {
            reason: "second".to_string(),
        })
        .await;
        settle().await;
        assert_eq!(rt.handle.status().state, ConnectionKind::Disconnected);

        // First disconnect's timer fires now; ignored
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(rt.transport.initialize_calls(), 1);
        assert_eq!(rt.handle.status().state, ConnectionKind::Disconnected);

        // Second disconnect's own delay elapses
        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(rt.transport.initialize_calls(), 2);
        assert_eq!(rt.handle.status().state, ConnectionKind::Idle);

        rt.shutdown().await;
    }

    /// Manual reconnect from AuthFailed
    #[tokio::test]
    async fn test_manual_reconnect_after_auth_failure() {
        let rt = TestRuntime::new().build();
        assert!(rt.wait_for_initialize_calls(1, WAIT).await);

        rt.emit(TransportEvent::AuthFailure {
            message: "restore failed".to_string(),
        })
        .await;
        assert!(rt.wait_for_state(ConnectionKind::AuthFailed, WAIT).await);

        rt.handle.reconnect().await.unwrap();
        assert!(rt.wait_for_state(ConnectionKind::Idle, WAIT).await);
        assert!(rt.wait_for_initialize_calls(2, WAIT).await);

        rt.shutdown().await;
    }

    /// Sends are refused until ready, then go through
    #[tokio::test]
    async fn test_send_through_handle() {
        let transport = MockTransport::new().with_conversation("g1");
        let rt = TestRuntime::new().transport(transport).build();

        let result = rt.handle.send_message(&SendRequest::new("g1", "hi")).await;
        assert_eq!(result.unwrap_err(), SendError::NotConnected);
        assert_eq!(rt.transport.resolve_calls(), 0);

        rt.emit(TransportEvent::Ready).await;
        assert!(rt.wait_for_state(ConnectionKind::Ready, WAIT).await);

        let receipt = rt
            .handle
            .send_message(&SendRequest::new("g1", "hi"))
            .await
            .unwrap();
        assert_eq!(receipt.conversation.id, "g1");
        assert_eq!(rt.transport.send_calls(), 1);

        rt.shutdown().await;
    }

    /// Repeated status reads without events are identical
    #[tokio::test]
    async fn test_status_is_idempotent() {
        let rt = TestRuntime::new().build();
        rt.emit(TransportEvent::Ready).await;
        assert!(rt.wait_for_state(ConnectionKind::Ready, WAIT).await);

        let first = rt.handle.status();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(rt.handle.status(), first);

        rt.shutdown().await;
    }
}
