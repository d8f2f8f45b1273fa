//! Negotiation sessions and the snapshots the backend reports about them.

use serde::{Deserialize, Serialize};

use crate::fields::{canonical_id, rules, RawRecord};
use crate::types::NegotiationStatus;

/// Placeholder shown for timestamps the backend did not provide.
pub const UNKNOWN_TIMESTAMP: &str = "unknown";

/// Product name used when neither the caller nor the prompt supplies one.
pub const DEFAULT_PRODUCT: &str = "General Product";

const PRODUCT_EXCERPT_CHARS: usize = 200;
const TACTICS_EXCERPT_CHARS: usize = 100;

/// One end-to-end negotiation as the client knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationSession {
    /// Backend-assigned identifier, compared by string equality.
    pub id: String,

    /// Free-text brief supplied by the user.
    pub prompt: String,

    /// Requested tone/strategy labels, in order.
    pub tactics: Vec<String>,

    /// Suppliers included, unique, in insertion order.
    pub supplier_ids: Vec<String>,

    /// Backend status.
    pub status: NegotiationStatus,

    /// ISO 8601 creation time, if the backend sent one.
    pub created_at: Option<String>,

    /// ISO 8601 update time, if the backend sent one.
    pub updated_at: Option<String>,
}

impl NegotiationSession {
    /// Map one row of the backend's history listing.
    ///
    /// Returns `None` for rows without any usable identifier.
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        let id = record.get_id(&rules::NEGOTIATION_ID)?;
        let tactics = record
            .get(&rules::NEGOTIATION_TACTICS)
            .map(|raw| split_tactics(&raw))
            .unwrap_or_default();

        Some(Self {
            id,
            prompt: record.get(&rules::NEGOTIATION_PROMPT).unwrap_or_default(),
            tactics,
            supplier_ids: Vec::new(),
            status: record
                .get(&rules::STATUS)
                .map(NegotiationStatus::from)
                .unwrap_or_default(),
            created_at: record.get(&rules::CREATED_AT),
            updated_at: record.get(&rules::UPDATED_AT),
        })
    }

    /// Creation time for display, `"unknown"` if absent.
    pub fn created_at_or_unknown(&self) -> &str {
        self.created_at.as_deref().unwrap_or(UNKNOWN_TIMESTAMP)
    }

    /// Update time for display, `"unknown"` if absent.
    pub fn updated_at_or_unknown(&self) -> &str {
        self.updated_at.as_deref().unwrap_or(UNKNOWN_TIMESTAMP)
    }

    /// Replace the supplier list, keeping it unique and in order.
    pub fn set_supplier_ids<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.supplier_ids = unique_ids(ids);
    }
}

/// Split a backend strategy string (`"professional, direct"`) into tactics.
pub fn split_tactics(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonicalize identifiers, dropping blanks and duplicates, keeping first-seen order.
pub fn unique_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        if let Some(id) = canonical_id(id.as_ref()) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
    }
    out
}

/// What the user asks for when launching a negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationRequest {
    pub prompt: String,
    pub supplier_ids: Vec<String>,
    pub tactics: Vec<String>,
    pub product: Option<String>,
}

impl NegotiationRequest {
    /// Create a new request; supplier ids are de-duplicated in order.
    pub fn new<I, S>(prompt: impl Into<String>, supplier_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prompt: prompt.into(),
            supplier_ids: unique_ids(supplier_ids),
            tactics: Vec::new(),
            product: None,
        }
    }

    /// Add a tone/strategy label.
    pub fn with_tactic(mut self, tactic: impl Into<String>) -> Self {
        self.tactics.push(tactic.into());
        self
    }

    /// Set all tone/strategy labels at once.
    pub fn with_tactics<I, S>(mut self, tactics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tactics = tactics.into_iter().map(Into::into).collect();
        self
    }

    /// Name the product explicitly.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Product sent to the backend: explicit, else a prompt excerpt, else a default.
    pub fn resolved_product(&self) -> String {
        if let Some(product) = self.product.as_deref().filter(|p| !p.trim().is_empty()) {
            return product.to_string();
        }
        let excerpt = excerpt(&self.prompt, PRODUCT_EXCERPT_CHARS);
        if excerpt.is_empty() {
            DEFAULT_PRODUCT.to_string()
        } else {
            excerpt
        }
    }

    /// Tactics sent to the backend as one comma-joined string.
    pub fn joined_tactics(&self) -> String {
        let joined = self
            .tactics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if joined.is_empty() {
            excerpt(&self.prompt, TACTICS_EXCERPT_CHARS)
        } else {
            joined
        }
    }

    /// The JSON body for `POST /negotiate`.
    pub fn to_payload(&self) -> NegotiatePayload {
        NegotiatePayload {
            product: self.resolved_product(),
            prompt: self.prompt.clone(),
            tactics: self.joined_tactics(),
            suppliers: self.supplier_ids.clone(),
        }
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}

/// Wire body of `POST /negotiate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiatePayload {
    pub product: String,
    pub prompt: String,
    pub tactics: String,
    pub suppliers: Vec<String>,
}

/// Stable result of creating a negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedNegotiation {
    pub id: String,
    pub status: NegotiationStatus,
}

impl CreatedNegotiation {
    /// Map the backend's create response; `None` when it carries no id.
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        Some(Self {
            id: record.get_id(&rules::NEGOTIATION_ID)?,
            status: record
                .get(&rules::STATUS)
                .map(NegotiationStatus::from)
                .unwrap_or(NegotiationStatus::Started),
        })
    }
}

/// Per-supplier progress inside a status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProgress {
    pub supplier_id: String,
    pub message_count: u64,
}

/// What `/negotiation_status/{id}` reports at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub negotiation_id: String,
    pub agents: Vec<AgentProgress>,
    pub all_completed: bool,
}

impl StatusSnapshot {
    /// Map a status payload. Agents without a supplier id are skipped.
    ///
    /// A missing `all_completed` flag reads as `false` unless the payload's own
    /// `status` says `completed`.
    pub fn from_record(requested_id: &str, record: &RawRecord) -> Self {
        let agents = record
            .as_map()
            .get("agents")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| RawRecord::from_value(item.clone()))
                    .filter_map(|agent| {
                        Some(AgentProgress {
                            supplier_id: agent.get_id(&rules::AGENT_SUPPLIER_ID)?,
                            message_count: agent
                                .get_f64(&rules::MESSAGE_COUNT)
                                .map(|n| n.max(0.0) as u64)
                                .unwrap_or(0),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let all_completed = record.get_bool(&rules::ALL_COMPLETED).unwrap_or_else(|| {
            record
                .get(&rules::STATUS)
                .map(|s| NegotiationStatus::parse(&s).is_completed())
                .unwrap_or(false)
        });

        Self {
            negotiation_id: record
                .get_id(&rules::NEGOTIATION_ID)
                .unwrap_or_else(|| requested_id.to_string()),
            agents,
            all_completed,
        }
    }

    /// Supplier ids in agent order, unique.
    pub fn supplier_ids(&self) -> Vec<String> {
        unique_ids(self.agents.iter().map(|a| a.supplier_id.as_str()))
    }

    /// Message count for one supplier (0 if the supplier has no agent yet).
    pub fn message_count(&self, supplier_id: &str) -> u64 {
        self.agents
            .iter()
            .find(|a| a.supplier_id == supplier_id)
            .map(|a| a.message_count)
            .unwrap_or(0)
    }

    /// Sum of message counts across agents.
    pub fn total_messages(&self) -> u64 {
        self.agents.iter().map(|a| a.message_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> RawRecord {
        RawRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_payload_for_bulk_pricing_request() {
        let request = NegotiationRequest::new("Request bulk pricing", ["s1", "s2"])
            .with_tactic("professional");

        let payload = request.to_payload();
        assert_eq!(payload.product, "Request bulk pricing");
        assert_eq!(payload.prompt, "Request bulk pricing");
        assert_eq!(payload.tactics, "professional");
        assert_eq!(payload.suppliers, vec!["s1", "s2"]);
    }

    #[test]
    fn test_payload_defaults() {
        let long_prompt = "x".repeat(300);
        let request = NegotiationRequest::new(long_prompt, ["s1"]);
        assert_eq!(request.resolved_product().chars().count(), 200);
        assert_eq!(request.joined_tactics().chars().count(), 100);

        let empty = NegotiationRequest::new("   ", ["s1"]);
        assert_eq!(empty.resolved_product(), DEFAULT_PRODUCT);

        let explicit = NegotiationRequest::new("prompt", ["s1"])
            .with_product("Steel beams")
            .with_tactics(["professional", "direct"]);
        assert_eq!(explicit.resolved_product(), "Steel beams");
        assert_eq!(explicit.joined_tactics(), "professional, direct");
    }

    #[test]
    fn test_supplier_ids_are_unique_in_order() {
        let request = NegotiationRequest::new("p", [" s2", "s1", "s2 ", ""]);
        assert_eq!(request.supplier_ids, vec!["s2", "s1"]);
    }

    #[test]
    fn test_session_from_history_row() {
        let session = NegotiationSession::from_record(&record(json!({
            "negotiation_id": 17,
            "product": "Hoodies, 500 units",
            "strategy": "professional, direct",
        })))
        .unwrap();

        assert_eq!(session.id, "17");
        assert_eq!(session.prompt, "Hoodies, 500 units");
        assert_eq!(session.tactics, vec!["professional", "direct"]);
        assert_eq!(session.status, NegotiationStatus::Pending);
        assert_eq!(session.created_at_or_unknown(), UNKNOWN_TIMESTAMP);
        assert!(NegotiationSession::from_record(&record(json!({ "product": "x" }))).is_none());
    }

    #[test]
    fn test_created_negotiation_defaults_status() {
        let created =
            CreatedNegotiation::from_record(&record(json!({ "negotiation_id": "n1" }))).unwrap();
        assert_eq!(created.id, "n1");
        assert_eq!(created.status, NegotiationStatus::Started);
    }

    #[test]
    fn test_status_snapshot_mapping() {
        let snapshot = StatusSnapshot::from_record(
            "n1",
            &record(json!({
                "agents": [
                    { "supplier_id": "s1", "message_count": 3 },
                    { "sup_id": 2, "message_count": "1" },
                    { "message_count": 9 }
                ]
            })),
        );

        assert_eq!(snapshot.negotiation_id, "n1");
        assert_eq!(snapshot.supplier_ids(), vec!["s1", "2"]);
        assert_eq!(snapshot.message_count("2"), 1);
        assert_eq!(snapshot.total_messages(), 4);
        assert!(!snapshot.all_completed);

        let done = StatusSnapshot::from_record("n1", &record(json!({ "status": "completed" })));
        assert!(done.all_completed);

        let flagged = StatusSnapshot::from_record(
            "n1",
            &record(json!({ "all_completed": true, "status": "active" })),
        );
        assert!(flagged.all_completed);
    }
}
