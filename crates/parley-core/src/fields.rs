//! Data-driven field extraction for loosely shaped backend payloads.
//!
//! The negotiation backend is inconsistent about field names (`supplier_id` vs
//! `sup_id`, `message_text` vs `content`, ...). Every logical field is described
//! by a [`FieldRule`]: an ordered alias list probed first-match-wins. New aliases
//! are added to the tables in [`rules`], not to the call sites.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A logical field and the payload keys that may carry it, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Logical name, used in logs.
    pub name: &'static str,

    /// Payload keys probed in order.
    pub aliases: &'static [&'static str],
}

impl FieldRule {
    /// Create a new rule.
    pub const fn new(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases }
    }

    /// First non-empty alias value, coerced to a string.
    pub fn extract(&self, object: &Map<String, Value>) -> Option<String> {
        self.aliases
            .iter()
            .find_map(|key| object.get(*key).and_then(scalar_to_string))
    }

    /// First alias value that reads as a number (numeric strings included).
    pub fn extract_f64(&self, object: &Map<String, Value>) -> Option<f64> {
        self.aliases.iter().find_map(|key| match object.get(*key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// First alias value that reads as a boolean (`"true"`/`"false"` included).
    pub fn extract_bool(&self, object: &Map<String, Value>) -> Option<bool> {
        self.aliases.iter().find_map(|key| match object.get(*key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().to_ascii_lowercase().parse().ok(),
            _ => None,
        })
    }
}

/// The alias tables for every field the client reads from the backend.
pub mod rules {
    use super::FieldRule;

    pub const MESSAGE_ID: FieldRule = FieldRule::new("message_id", &["message_id", "id"]);
    pub const MESSAGE_TEXT: FieldRule =
        FieldRule::new("text", &["message_text", "content", "text", "body"]);
    pub const MESSAGE_TIMESTAMP: FieldRule = FieldRule::new(
        "timestamp",
        &["message_timestamp", "timestamp", "created_at", "sent_at", "date"],
    );
    pub const MESSAGE_ROLE: FieldRule = FieldRule::new("role", &["role", "sender_role", "sender"]);

    pub const SUPPLIER_ID: FieldRule =
        FieldRule::new("supplier_id", &["supplier_id", "id", "supplier_name"]);
    pub const SUPPLIER_NAME: FieldRule = FieldRule::new("supplier_name", &["supplier_name", "name"]);
    pub const CATEGORY: FieldRule = FieldRule::new("category", &["category", "product_category"]);
    pub const RATING: FieldRule = FieldRule::new("rating", &["rating"]);
    pub const RESPONSE_TIME: FieldRule =
        FieldRule::new("response_time", &["response_time", "responseTime"]);
    pub const PRICE_RANGE: FieldRule = FieldRule::new("price_range", &["price_range", "priceRange"]);
    pub const LOCATION: FieldRule = FieldRule::new("location", &["location"]);

    pub const PRODUCT_SUPPLIER_ID: FieldRule = FieldRule::new("supplier_id", &["supplier_id"]);

    pub const AGENT_SUPPLIER_ID: FieldRule = FieldRule::new("supplier_id", &["supplier_id", "sup_id"]);
    pub const MESSAGE_COUNT: FieldRule = FieldRule::new("message_count", &["message_count"]);

    pub const NEGOTIATION_ID: FieldRule = FieldRule::new("negotiation_id", &["negotiation_id", "id"]);
    pub const NEGOTIATION_PROMPT: FieldRule = FieldRule::new("prompt", &["prompt", "product"]);
    pub const NEGOTIATION_TACTICS: FieldRule =
        FieldRule::new("tactics", &["strategy", "tactics", "modes"]);
    pub const STATUS: FieldRule = FieldRule::new("status", &["status"]);
    pub const CREATED_AT: FieldRule = FieldRule::new("created_at", &["created_at", "createdAt"]);
    pub const UPDATED_AT: FieldRule = FieldRule::new("updated_at", &["updated_at", "updatedAt"]);
    pub const ALL_COMPLETED: FieldRule =
        FieldRule::new("all_completed", &["all_completed", "allCompleted"]);
}

/// Coerce a scalar JSON value to a string. Empty strings, nulls and objects are
/// treated as absent; arrays of scalars are joined with `", "`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

/// Canonical form of an opaque identifier: trimmed, never empty.
pub fn canonical_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A backend row whose shape is only loosely known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    /// Wrap a JSON value, if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Read a string field through its rule.
    pub fn get(&self, rule: &FieldRule) -> Option<String> {
        rule.extract(&self.0)
    }

    /// Read a numeric field through its rule.
    pub fn get_f64(&self, rule: &FieldRule) -> Option<f64> {
        rule.extract_f64(&self.0)
    }

    /// Read a boolean field through its rule.
    pub fn get_bool(&self, rule: &FieldRule) -> Option<bool> {
        rule.extract_bool(&self.0)
    }

    /// Read an identifier field through its rule, in canonical form.
    pub fn get_id(&self, rule: &FieldRule) -> Option<String> {
        self.get(rule).as_deref().and_then(canonical_id)
    }

    /// The underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Deserialize a string-or-number field into a trimmed string (empty if absent).
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value)
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}

/// Deserialize an optional string-or-number field.
pub fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value).map(|s| s.trim().to_string()))
}
