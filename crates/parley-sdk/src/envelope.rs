//! Tolerant decoding of list responses.
//!
//! The backend wraps lists inconsistently: sometimes a bare array, sometimes an
//! object with the array under one of a few keys.

use serde_json::Value;
use tracing::warn;

/// Envelope keys for conversation responses.
pub const CONVERSATION_KEYS: &[&str] = &["message", "messages"];
/// Envelope keys for the supplier registry.
pub const SUPPLIER_KEYS: &[&str] = &["suppliers"];
/// Envelope keys for the product catalog.
pub const PRODUCT_KEYS: &[&str] = &["products"];
/// Envelope keys for the negotiation history.
pub const NEGOTIATION_KEYS: &[&str] = &["negotiations"];

/// Pull a list out of `value`, probing a bare array first and then each key in order.
///
/// Returns `None` when no known shape matches.
pub fn probe_list(value: &Value, keys: &[&str]) -> Option<Vec<Value>> {
    if let Value::Array(items) = value {
        return Some(items.clone());
    }

    let object = value.as_object()?;
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .cloned()
}

/// Like [`probe_list`], but an unknown shape is logged and read as an empty list.
pub fn list_from_envelope(value: &Value, keys: &[&str], operation: &str) -> Vec<Value> {
    probe_list(value, keys).unwrap_or_else(|| {
        warn!(
            operation,
            expected = ?keys,
            "Unrecognized response shape, treating as empty"
        );
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversation_shapes() {
        let bare = json!([{ "text": "a" }]);
        let singular = json!({ "message": [{ "text": "a" }] });
        let plural = json!({ "messages": [{ "text": "a" }, { "text": "b" }] });

        assert_eq!(list_from_envelope(&bare, CONVERSATION_KEYS, "test").len(), 1);
        assert_eq!(list_from_envelope(&singular, CONVERSATION_KEYS, "test").len(), 1);
        assert_eq!(list_from_envelope(&plural, CONVERSATION_KEYS, "test").len(), 2);
    }

    #[test]
    fn test_unknown_shapes_are_empty() {
        for value in [json!({ "data": [1] }), json!("oops"), json!(null), json!({ "messages": "x" })] {
            assert!(probe_list(&value, CONVERSATION_KEYS).is_none());
            assert!(list_from_envelope(&value, CONVERSATION_KEYS, "test").is_empty());
        }
    }
}
