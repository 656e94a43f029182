//! Pairing code rendering and the pairing view
//!
//! Rendering is a pure function of the opaque payload: SVG for the web page,
//! unicode half-blocks for the terminal.

use crate::session::SessionState;
use qrcode::render::{svg, unicode};
use qrcode::QrCode;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Pairing payload is empty")]
    EmptyPayload,
    #[error("Failed to encode pairing payload: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

/// Client-side refresh timing for the pairing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingSettings {
    /// Re-poll interval while no code is available
    pub poll_interval: Duration,
    /// Reload interval while a code is shown (codes rotate)
    pub reload_interval: Duration,
}

impl Default for PairingSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reload_interval: DEFAULT_RELOAD_INTERVAL,
        }
    }
}

/// What the pairing page should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingView {
    AlreadyConnected,
    Awaiting { poll_interval: Duration },
    Code { svg: String, reload_interval: Duration },
}

/// Pick the view for the current state. Reads only; never fails.
pub fn pairing_view(state: &SessionState, settings: &PairingSettings) -> PairingView {
    if state.is_ready() {
        return PairingView::AlreadyConnected;
    }

    let awaiting = PairingView::Awaiting {
        poll_interval: settings.poll_interval,
    };

    let Some(artifact) = state.pairing_artifact() else {
        return awaiting;
    };

    match render_svg(artifact.code()) {
        Ok(svg) => PairingView::Code {
            svg,
            reload_interval: settings.reload_interval,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to render pairing code");
            awaiting
        }
    }
}

fn encode(code: &str) -> Result<QrCode, RenderError> {
    let payload = code.trim();
    if payload.is_empty() {
        return Err(RenderError::EmptyPayload);
    }
    Ok(QrCode::new(payload.as_bytes())?)
}

/// Render the payload as a standalone SVG document
pub fn render_svg(code: &str) -> Result<String, RenderError> {
    let qr = encode(code)?;
    Ok(qr
        .render::<svg::Color<'_>>()
        .min_dimensions(264, 264)
        .quiet_zone(true)
        .build())
}

/// Render the payload as terminal-friendly text
pub fn render_terminal(code: &str) -> Result<String, RenderError> {
    let qr = encode(code)?;
    Ok(qr
        .render::<unicode::Dense1x2>()
        .quiet_zone(true)
        .build())
}
