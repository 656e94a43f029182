//! Background task helpers
//!
//! Periodic jobs (health probe, keep-alive) are owned by whoever spawns them
//! and stop when their `CancellationToken` is cancelled.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Spawn `fut` and log if it panics instead of letting the failure vanish
pub fn spawn_logged<F>(name: &'static str, fut: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let inner = tokio::spawn(fut);
    tokio::spawn(async move {
        if let Err(e) = inner.await {
            if e.is_panic() {
                tracing::error!(task = name, error = %e, "Background task panicked");
            } else {
                tracing::debug!(task = name, "Background task cancelled");
            }
        }
    })
}

/// Run `job` every `period`, first run one period from now
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    spawn_logged(name, async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => job().await,
            }
        }

        tracing::debug!(task = name, "Periodic task stopped");
    })
}
