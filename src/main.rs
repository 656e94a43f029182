//! Session gateway - HTTP front for a long-lived messaging session
//!
//! Keeps one authenticated session alive (pairing, reconnect, health probe)
//! and exposes status, the pairing code, and message submission over HTTP.

mod api;
mod bridge;
mod config;
mod dispatch;
mod lifecycle;
mod pairing;
mod runtime;
mod session;

use api::{create_router, AppState};
use axum::http::{header, Method};
use bridge::BridgeTransport;
use config::GatewayConfig;
use runtime::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, Layer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        port = config.port,
        bridge_url = %config.bridge_url,
        reconnect_delay_secs = config.reconnect.delay.as_secs(),
        reconnect_max_attempts = config.reconnect.max_attempts,
        health_check_interval_secs = config.reconnect.probe_interval.as_secs(),
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();

    let transport = Arc::new(BridgeTransport::new(&config.bridge_url)?);
    let manager = SessionManager::start(transport, config.reconnect, shutdown.clone());

    let keepalive = match config.keepalive.clone() {
        Some(keepalive) => Some(lifecycle::spawn_keepalive(keepalive, shutdown.clone())?),
        None => None,
    };

    let state = AppState::new(manager.handle(), config.pairing);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Session gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(lifecycle::shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, shutting down session");
    manager.shutdown().await;
    if let Some(task) = keepalive {
        let _ = task.await;
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "session_gateway=info,tower_http=info".into());

    let pretty = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("pretty"));
    let fmt_layer = if pretty {
        tracing_subscriber::fmt::layer().boxed()
    } else {
        json_layer(std::io::stdout).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// JSON log lines carrying the fields of the current span (`request_id`)
fn json_layer<S, W>(writer: W) -> impl Layer<S> + Send + Sync + 'static
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(writer)
}
