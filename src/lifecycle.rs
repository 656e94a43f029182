//! Process lifecycle: shutdown signals and the keep-alive pinger

use crate::config::KeepAliveConfig;
use crate::runtime::scheduler::spawn_periodic;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolve on SIGTERM or SIGINT
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to install signal handlers, using ctrl-c");
                ctrl_c().await;
                return;
            }
        };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM - shutting down");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT - shutting down");
        }
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received ctrl-c - shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    }
}

/// Periodically GET `config.url` so hosting platforms don't idle the process.
/// Failures are logged and never stop the pinger.
pub fn spawn_keepalive(
    config: KeepAliveConfig,
    shutdown: CancellationToken,
) -> Result<JoinHandle<()>, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(KEEPALIVE_TIMEOUT)
        .build()?;

    tracing::info!(
        url = %config.url,
        interval_secs = config.interval.as_secs(),
        "Keep-alive enabled"
    );

    let url = config.url;
    Ok(spawn_periodic("keep-alive", config.interval, shutdown, move || {
        let client = client.clone();
        let url = url.clone();
        async move {
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(status = %response.status(), "Keep-alive ping");
                }
                Ok(response) => {
                    tracing::warn!(status = %response.status(), "Keep-alive ping rejected");
                }
                Err(e) => tracing::warn!(error = %e, "Keep-alive ping failed"),
            }
        }
    }))
}
