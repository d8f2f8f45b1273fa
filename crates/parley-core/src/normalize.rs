//! Transcript normalization.
//!
//! Raw backend messages vary in field names, carry `<reasoning>` scratch-work
//! and contain bracketed template placeholders such as `[Your Name]`.
//! [`MessageNormalizer`] turns them into an ordered list of
//! [`ConversationMessage`]s. Normalization is idempotent: feeding the output back
//! in (as JSON) yields the same list.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ParleyError, Result};
use crate::fields::{canonical_id, rules, RawRecord};
use crate::message::ConversationMessage;
use crate::types::Role;

/// Values substituted for the sender placeholders the agent leaves in its drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    pub name: String,
    pub title: String,
    pub company: String,
    pub phone: String,
    pub email: String,
    pub website: String,
}

impl Default for SenderProfile {
    fn default() -> Self {
        Self {
            name: "Alex Morgan".to_string(),
            title: "Procurement Manager".to_string(),
            company: "Parley Procurement".to_string(),
            phone: "+1 (555) 014-2037".to_string(),
            email: "alex.morgan@parley.example".to_string(),
            website: "www.parley.example".to_string(),
        }
    }
}

/// Placeholder vocabulary: (token words, which profile field replaces it).
/// Order matters: website is tried before company so `[Company Website]` is a website.
const PLACEHOLDERS: &[(&str, PlaceholderField)] = &[
    (r"your\s+(?:full\s+)?name", PlaceholderField::Name),
    (r"(?:your\s+)?(?:job\s+)?(?:title|position)", PlaceholderField::Title),
    (r"(?:your\s+)?(?:company\s+)?(?:website|web\s+site|url)", PlaceholderField::Website),
    (r"(?:your\s+)?company(?:\s+name)?", PlaceholderField::Company),
    (r"(?:your\s+)?(?:phone|telephone)(?:\s+number)?|(?:your\s+)?contact\s+number", PlaceholderField::Phone),
    (r"(?:your\s+)?e-?mail(?:\s+address)?", PlaceholderField::Email),
];

#[derive(Debug, Clone, Copy)]
enum PlaceholderField {
    Name,
    Title,
    Company,
    Phone,
    Email,
    Website,
}

impl PlaceholderField {
    fn value<'a>(&self, profile: &'a SenderProfile) -> &'a str {
        match self {
            PlaceholderField::Name => &profile.name,
            PlaceholderField::Title => &profile.title,
            PlaceholderField::Company => &profile.company,
            PlaceholderField::Phone => &profile.phone,
            PlaceholderField::Email => &profile.email,
            PlaceholderField::Website => &profile.website,
        }
    }
}

/// Converts raw message lists into canonical, ordered transcripts.
#[derive(Debug, Clone)]
pub struct MessageNormalizer {
    profile: SenderProfile,
    reasoning: Regex,
    placeholders: Vec<(Regex, PlaceholderField)>,
}

impl MessageNormalizer {
    /// Create a normalizer with the default sender profile.
    pub fn new() -> Result<Self> {
        Self::with_profile(SenderProfile::default())
    }

    /// Create a normalizer that substitutes the given profile.
    pub fn with_profile(profile: SenderProfile) -> Result<Self> {
        let reasoning = compile(r"(?is)<reasoning>.*?</reasoning>")?;

        // A token either closes its bracket within a short tail
        // ("[Your Name here]") or is left dangling ("[Your Name").
        let placeholders = PLACEHOLDERS
            .iter()
            .map(|(words, field)| {
                let pattern = format!(
                    r"(?i)\[\s*(?:{words})\b[^\[\]\n]{{0,24}}\]|\[\s*(?:{words})\b",
                    words = words
                );
                compile(&pattern).map(|re| (re, *field))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            profile,
            reasoning,
            placeholders,
        })
    }

    /// The profile used for substitution.
    pub fn profile(&self) -> &SenderProfile {
        &self.profile
    }

    /// Normalize a raw message list: extract fields, sanitize text, classify
    /// roles, then sort ascending by timestamp (missing ones first). The sort is
    /// stable, so equal timestamps keep backend order.
    pub fn normalize(&self, raw: &[Value]) -> Vec<ConversationMessage> {
        let mut messages: Vec<ConversationMessage> = raw
            .iter()
            .enumerate()
            .map(|(index, value)| self.normalize_one(index, value))
            .collect();

        messages.sort_by_key(ConversationMessage::sort_key);
        messages
    }

    /// Normalize one raw message found at `index` in the backend's list.
    pub fn normalize_one(&self, index: usize, value: &Value) -> ConversationMessage {
        let record = match value {
            Value::Object(map) => RawRecord(map.clone()),
            // A bare string is a body with nothing else known about it.
            Value::String(text) => {
                return ConversationMessage {
                    id: positional_id(index),
                    role: Role::Supplier,
                    text: self.sanitize(text),
                    timestamp: None,
                }
            }
            _ => RawRecord::default(),
        };

        ConversationMessage {
            id: record
                .get(&rules::MESSAGE_ID)
                .as_deref()
                .and_then(canonical_id)
                .unwrap_or_else(|| positional_id(index)),
            role: Role::classify(record.get(&rules::MESSAGE_ROLE).as_deref()),
            text: record
                .get(&rules::MESSAGE_TEXT)
                .map(|text| self.sanitize(&text))
                .unwrap_or_default(),
            timestamp: record
                .get(&rules::MESSAGE_TIMESTAMP)
                .map(|t| t.trim().to_string()),
        }
    }

    /// Strip reasoning blocks and substitute placeholders.
    pub fn sanitize(&self, text: &str) -> String {
        let stripped = self.strip_reasoning(text);
        self.substitute_placeholders(&stripped).trim().to_string()
    }

    /// Remove every paired `<reasoning>...</reasoning>` block, markers included.
    ///
    /// Repeats until nothing matches, so blocks spliced together by an earlier
    /// removal are gone too.
    pub fn strip_reasoning(&self, text: &str) -> String {
        let mut out = text.to_string();
        while self.reasoning.is_match(&out) {
            out = self.reasoning.replace_all(&out, "").into_owned();
        }
        out
    }

    /// Replace placeholder tokens with the sender profile.
    pub fn substitute_placeholders(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (pattern, field) in &self.placeholders {
            if pattern.is_match(&out) {
                out = pattern
                    .replace_all(&out, regex::NoExpand(field.value(&self.profile)))
                    .into_owned();
            }
        }
        out
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ParleyError::Internal(format!("invalid pattern {}: {}", pattern, e)))
}

fn positional_id(index: usize) -> String {
    format!("msg-{}", index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalizer() -> MessageNormalizer {
        MessageNormalizer::new().unwrap()
    }

    fn as_raw(messages: &[ConversationMessage]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| serde_json::to_value(m).unwrap())
            .collect()
    }

    #[test]
    fn test_reasoning_and_placeholder_example() {
        let raw = vec![json!({
            "message_text": "<reasoning>ignore</reasoning>Hello [Your Name]",
            "role": "agent",
            "timestamp": "2024-01-01T00:00:00Z",
        })];

        let messages = normalizer().normalize(&raw);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Negotiator);
        assert_eq!(messages[0].text, "Hello Alex Morgan");
        assert_eq!(messages[0].timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(messages[0].id, "msg-0");
    }

    #[test]
    fn test_reasoning_is_case_insensitive_and_multiline() {
        let text = "Dear team,\n<REASONING>step 1\nstep 2</Reasoning>We would like 500 units.<reasoning>more</reasoning>";
        assert_eq!(normalizer().sanitize(text), "Dear team,\nWe would like 500 units.");
    }

    #[test]
    fn test_spliced_reasoning_blocks() {
        let text = "<reas<reasoning>a</reasoning>oning>b</reasoning>Quote attached";
        assert_eq!(normalizer().sanitize(text), "Quote attached");
    }

    #[test]
    fn test_unpaired_reasoning_marker_is_kept() {
        let text = "Price is fine <reasoning> but unfinished";
        assert_eq!(normalizer().sanitize(text), text);
    }

    #[test]
    fn test_placeholder_vocabulary() {
        let text = "Best regards,\n[Your Name]\n[Your Title]\n[Your Company]\n[Your Phone Number]\n[your email address]\n[Website]";
        let profile = SenderProfile::default();
        let expected = format!(
            "Best regards,\n{}\n{}\n{}\n{}\n{}\n{}",
            profile.name, profile.title, profile.company, profile.phone, profile.email, profile.website
        );
        assert_eq!(normalizer().sanitize(text), expected);
    }

    #[test]
    fn test_partial_placeholders() {
        let n = normalizer();
        assert_eq!(n.sanitize("Signed, [Your Name here]"), "Signed, Alex Morgan");
        assert_eq!(n.sanitize("Signed, [YOUR NAME"), "Signed, Alex Morgan");
        assert_eq!(n.sanitize("Call [Your Phone] today"), format!("Call {} today", n.profile().phone));
    }

    #[test]
    fn test_custom_profile() {
        let profile = SenderProfile {
            name: "Sam Lee".to_string(),
            ..SenderProfile::default()
        };
        let n = MessageNormalizer::with_profile(profile).unwrap();
        assert_eq!(n.sanitize("[Your Name]"), "Sam Lee");
    }

    #[test]
    fn test_field_priority() {
        let raw = vec![json!({
            "id": 9,
            "content": "from content",
            "body": "from body",
            "created_at": "2024-02-01T00:00:00Z",
            "date": "2020-01-01",
            "role": "supplier_response",
        })];

        let message = &normalizer().normalize(&raw)[0];
        assert_eq!(message.id, "9");
        assert_eq!(message.text, "from content");
        assert_eq!(message.timestamp.as_deref(), Some("2024-02-01T00:00:00Z"));
        assert_eq!(message.role, Role::Supplier);
    }

    #[test]
    fn test_ordering_with_missing_timestamps() {
        let raw = vec![
            json!({ "text": "third", "timestamp": "2024-01-03T00:00:00Z" }),
            json!({ "text": "no time" }),
            json!({ "text": "first", "timestamp": "2024-01-01T00:00:00Z", "role": "agent" }),
            json!({ "text": "garbage time", "timestamp": "soon" }),
        ];

        let messages = normalizer().normalize(&raw);
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["no time", "garbage time", "first", "third"]);

        for pair in messages.windows(2) {
            assert!(pair[0].sort_key() <= pair[1].sort_key());
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let raw = vec![
            json!({ "message_text": "<reasoning>x</reasoning> Offer: $40/unit [Your Name]", "role": "supplier", "message_timestamp": "2024-01-02T10:00:00Z" }),
            json!({ "content": "Hi from [Your Company]", "role": "negotiator", "sent_at": "2024-01-02T09:00:00Z" }),
            json!({ "body": "untimed", "role": "mystery" }),
            json!("bare string [Your Email]"),
            json!(42),
        ];

        let n = normalizer();
        let once = n.normalize(&raw);
        let twice = n.normalize(&as_raw(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_malformed_entries_do_not_abort() {
        let raw = vec![json!(null), json!({ "text": "ok" })];
        let messages = normalizer().normalize(&raw);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "");
        assert_eq!(messages[1].id, "msg-1");
    }
}
