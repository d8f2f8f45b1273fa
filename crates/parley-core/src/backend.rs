//! The seam between negotiation logic and the transport that reaches the backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::fields::RawRecord;
use crate::negotiation::{CreatedNegotiation, NegotiationRequest, NegotiationSession, StatusSnapshot};
use crate::supplier::Product;

/// Operations the negotiation backend offers.
///
/// Failure semantics are part of the contract. Calls that answer a direct user
/// action (`search_products`, `create_negotiation`) and the reference-data
/// listings return errors. Read paths that are polled or merely browsed
/// (`list_negotiations`, `negotiation_status`, `conversation`) degrade to an
/// empty value instead, because "no data yet" is a normal state for them.
#[async_trait]
pub trait NegotiationBackend: Send + Sync {
    /// Whether the backend answers its health probe. Never fails.
    async fn check_health(&self) -> bool;

    /// Semantic product search.
    async fn search_products(&self, query: &str) -> Result<Vec<Product>>;

    /// Raw supplier-registry rows.
    async fn list_suppliers(&self) -> Result<Vec<RawRecord>>;

    /// Raw product-catalog rows.
    async fn list_products(&self) -> Result<Vec<RawRecord>>;

    /// Launch a negotiation.
    async fn create_negotiation(&self, request: &NegotiationRequest) -> Result<CreatedNegotiation>;

    /// Past negotiations, empty when history is unavailable.
    async fn list_negotiations(&self) -> Vec<NegotiationSession>;

    /// Latest status, `None` when unknown or unreachable.
    async fn negotiation_status(&self, negotiation_id: &str) -> Option<StatusSnapshot>;

    /// Raw messages exchanged with one supplier, empty when there are none yet.
    async fn conversation(&self, negotiation_id: &str, supplier_id: &str) -> Vec<Value>;

    /// Look a negotiation up in the history by id.
    async fn find_negotiation(&self, negotiation_id: &str) -> Option<NegotiationSession> {
        let wanted = negotiation_id.trim();
        self.list_negotiations()
            .await
            .into_iter()
            .find(|session| session.id == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NegotiationStatus;

    struct HistoryOnly(Vec<NegotiationSession>);

    #[async_trait]
    impl NegotiationBackend for HistoryOnly {
        async fn check_health(&self) -> bool {
            true
        }

        async fn search_products(&self, _query: &str) -> Result<Vec<Product>> {
            Ok(Vec::new())
        }

        async fn list_suppliers(&self) -> Result<Vec<RawRecord>> {
            Ok(Vec::new())
        }

        async fn list_products(&self) -> Result<Vec<RawRecord>> {
            Ok(Vec::new())
        }

        async fn create_negotiation(&self, request: &NegotiationRequest) -> Result<CreatedNegotiation> {
            Err(crate::ParleyError::InvalidInput(request.prompt.clone()))
        }

        async fn list_negotiations(&self) -> Vec<NegotiationSession> {
            self.0.clone()
        }

        async fn negotiation_status(&self, _negotiation_id: &str) -> Option<StatusSnapshot> {
            None
        }

        async fn conversation(&self, _negotiation_id: &str, _supplier_id: &str) -> Vec<Value> {
            Vec::new()
        }
    }

    fn session(id: &str) -> NegotiationSession {
        NegotiationSession {
            id: id.to_string(),
            prompt: format!("prompt {}", id),
            tactics: Vec::new(),
            supplier_ids: Vec::new(),
            status: NegotiationStatus::Completed,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_negotiation_by_string_id() {
        let backend = HistoryOnly(vec![session("1"), session("12")]);

        let found = backend.find_negotiation("12").await.unwrap();
        assert_eq!(found.prompt, "prompt 12");

        assert!(backend.find_negotiation(" 1 ").await.is_some());
        assert!(backend.find_negotiation("3").await.is_none());
    }
}
