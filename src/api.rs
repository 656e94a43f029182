//! HTTP API for the session gateway

mod handlers;
mod types;
mod views;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::pairing::PairingSettings;
use crate::runtime::SessionHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub pairing: PairingSettings,
}

impl AppState {
    pub fn new(session: SessionHandle, pairing: PairingSettings) -> Self {
        Self { session, pairing }
    }
}
