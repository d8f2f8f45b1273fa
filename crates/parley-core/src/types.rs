//! Common types used across Parley.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a negotiation as reported by the backend.
///
/// The backend is the source of truth; values outside the known set are kept
/// verbatim in [`NegotiationStatus::Other`] instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NegotiationStatus {
    /// Recorded but not yet picked up by the agent engine.
    Pending,
    /// Agents are talking to suppliers.
    Active,
    /// Accepted by the backend, agents spinning up.
    Started,
    /// Every supplier conversation has finished.
    Completed,
    /// Anything the backend invents later.
    Other(String),
}

impl NegotiationStatus {
    /// Parse a backend status string (case-insensitive).
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => NegotiationStatus::Pending,
            "active" => NegotiationStatus::Active,
            "started" => NegotiationStatus::Started,
            "completed" => NegotiationStatus::Completed,
            _ => NegotiationStatus::Other(raw.trim().to_string()),
        }
    }

    /// The wire form of this status.
    pub fn as_str(&self) -> &str {
        match self {
            NegotiationStatus::Pending => "pending",
            NegotiationStatus::Active => "active",
            NegotiationStatus::Started => "started",
            NegotiationStatus::Completed => "completed",
            NegotiationStatus::Other(raw) => raw,
        }
    }

    /// Returns true once no further polling is needed.
    pub fn is_completed(&self) -> bool {
        matches!(self, NegotiationStatus::Completed)
    }
}

impl Default for NegotiationStatus {
    fn default() -> Self {
        NegotiationStatus::Pending
    }
}

impl From<String> for NegotiationStatus {
    fn from(raw: String) -> Self {
        NegotiationStatus::parse(&raw)
    }
}

impl From<NegotiationStatus> for String {
    fn from(status: NegotiationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Product category used to group suppliers. Ordered as in [`ProductCategory::ALL`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Computers,
    Metal,
    Hoodies,
    OfficeSupplies,
    /// Safe default when a source does not say.
    #[default]
    Electronics,
}

impl ProductCategory {
    /// All categories, in display order.
    pub const ALL: [ProductCategory; 5] = [
        ProductCategory::Computers,
        ProductCategory::Metal,
        ProductCategory::Hoodies,
        ProductCategory::OfficeSupplies,
        ProductCategory::Electronics,
    ];

    /// Parse a raw category, accepting the wire form or the display label.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
    }

    /// Parse a raw category, falling back to the default.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or_default()
    }

    /// The wire form of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Computers => "computers",
            ProductCategory::Metal => "metal",
            ProductCategory::Hoodies => "hoodies",
            ProductCategory::OfficeSupplies => "office_supplies",
            ProductCategory::Electronics => "electronics",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Computers => "Computers",
            ProductCategory::Metal => "Metal",
            ProductCategory::Hoodies => "Hoodies",
            ProductCategory::OfficeSupplies => "Office Supplies",
            ProductCategory::Electronics => "Electronics",
        }
    }
}

/// Canonical author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Our agent, acting for the user.
    Negotiator,
    /// The supplier on the other side.
    Supplier,
}

impl Role {
    /// Collapse the backend's role vocabulary onto the two canonical roles.
    ///
    /// Negotiator messages are always tagged explicitly by the backend, so
    /// anything unrecognized or absent is attributed to the supplier.
    pub fn classify(raw: Option<&str>) -> Role {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("agent") | Some("negotiator") | Some("user") => Role::Negotiator,
            Some("supplier") | Some("supplier_response") => Role::Supplier,
            _ => Role::Supplier,
        }
    }

    /// The wire form of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Negotiator => "negotiator",
            Role::Supplier => "supplier",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_passthrough() {
        assert_eq!(NegotiationStatus::parse("Completed"), NegotiationStatus::Completed);
        assert!(NegotiationStatus::parse("completed").is_completed());

        let unknown = NegotiationStatus::parse("escalated");
        assert_eq!(unknown, NegotiationStatus::Other("escalated".to_string()));
        assert_eq!(unknown.as_str(), "escalated");
        assert!(!unknown.is_completed());
    }

    #[test]
    fn test_status_serde() {
        let status: NegotiationStatus = serde_json::from_str("\"started\"").unwrap();
        assert_eq!(status, NegotiationStatus::Started);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"started\"");
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(ProductCategory::parse("Office Supplies"), Some(ProductCategory::OfficeSupplies));
        assert_eq!(ProductCategory::parse("metal"), Some(ProductCategory::Metal));
        assert_eq!(ProductCategory::parse("furniture"), None);
        assert_eq!(ProductCategory::parse_or_default(None), ProductCategory::Electronics);
    }

    #[test]
    fn test_role_classification() {
        assert_eq!(Role::classify(Some("agent")), Role::Negotiator);
        assert_eq!(Role::classify(Some("Negotiator")), Role::Negotiator);
        assert_eq!(Role::classify(Some("user")), Role::Negotiator);
        assert_eq!(Role::classify(Some("supplier_response")), Role::Supplier);
        assert_eq!(Role::classify(Some("assistant")), Role::Supplier);
        assert_eq!(Role::classify(None), Role::Supplier);
    }
}
