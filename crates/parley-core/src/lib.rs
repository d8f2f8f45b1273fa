//! # Parley Core
//!
//! Core types and pure algorithms for driving multi-supplier procurement
//! negotiations against an agent backend.
//!
//! This crate provides the fundamental building blocks:
//! - [`NegotiationSession`] - One negotiation as the client knows it
//! - [`IdentityReconciler`] - Supplier id to display-ready identity
//! - [`MessageNormalizer`] - Raw backend messages to an ordered transcript
//! - [`OfferComparison`] - Pairwise offer tournament
//! - [`NegotiationBackend`] - The transport seam
//! - [`ParleyError`] - Error types

pub mod backend;
pub mod comparison;
pub mod error;
pub mod fields;
pub mod history;
pub mod identity;
pub mod message;
pub mod negotiation;
pub mod normalize;
pub mod supplier;
pub mod types;

// Re-exports for convenience
pub use backend::NegotiationBackend;
pub use comparison::{Offer, OfferComparison};
pub use error::{ParleyError, Result};
pub use fields::{FieldRule, RawRecord};
pub use history::{status_counts, HistoryFilter};
pub use identity::{IdentityReconciler, IdentitySource};
pub use message::ConversationMessage;
pub use negotiation::{
    AgentProgress, CreatedNegotiation, NegotiatePayload, NegotiationRequest, NegotiationSession,
    StatusSnapshot,
};
pub use normalize::{MessageNormalizer, SenderProfile};
pub use supplier::{dominant_category, group_by_category, Product, SupplierIdentity};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::backend::NegotiationBackend;
    pub use crate::comparison::{Offer, OfferComparison};
    pub use crate::error::{ParleyError, Result};
    pub use crate::identity::IdentityReconciler;
    pub use crate::message::ConversationMessage;
    pub use crate::negotiation::{
        CreatedNegotiation, NegotiationRequest, NegotiationSession, StatusSnapshot,
    };
    pub use crate::normalize::{MessageNormalizer, SenderProfile};
    pub use crate::supplier::{Product, SupplierIdentity};
    pub use crate::types::{NegotiationStatus, ProductCategory, Role};
}
