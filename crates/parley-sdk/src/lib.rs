//! # Parley SDK
//!
//! HTTP gateway client for the Parley negotiation backend.
//!
//! [`GatewayClient`] implements [`parley_core::NegotiationBackend`] over the
//! backend's REST routes. Each route declares whether failures surface or
//! degrade to an empty result (see [`Endpoint::policy`]).

pub mod client;
pub mod config;
pub mod envelope;
pub mod policy;

pub use client::GatewayClient;
pub use config::ClientConfig;
pub use policy::{Endpoint, FailurePolicy};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::client::GatewayClient;
    pub use crate::config::ClientConfig;
    pub use parley_core::prelude::*;
}
