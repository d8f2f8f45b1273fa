//! # Parley Negotiate
//!
//! Session controller for procurement negotiations: creates a negotiation,
//! polls its status until every supplier conversation is done, and re-opens
//! past negotiations from history.

pub mod controller;
pub mod events;
pub mod polling;

pub use controller::{ControllerState, SessionController};
pub use events::{SessionEvent, SessionEvents, SessionPhase};
pub use polling::{PollConfig, PollHandle};
