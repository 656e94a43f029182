//! Session lifecycle state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! transport events go in, a new `SessionState` plus a list of effects comes
//! out. All I/O lives in the runtime.

mod effect;
pub mod event;
pub mod policy;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use policy::ReconnectPolicy;
pub use state::{Connection, ConnectionKind, PairingArtifact, SessionState};
pub use transition::{transition, TransitionError, TransitionResult};
