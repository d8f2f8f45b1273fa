//! Canonical transcript messages.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Role;

/// A transcript entry with stable fields, independent of the backend shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Backend message id, or `msg-{index}` when the backend sent none.
    pub id: String,

    /// Who wrote it.
    pub role: Role,

    /// Sanitized body.
    pub text: String,

    /// Timestamp as the backend sent it.
    pub timestamp: Option<String>,
}

impl ConversationMessage {
    /// Milliseconds since the epoch used for ordering; 0 when absent or unparseable.
    pub fn sort_key(&self) -> i64 {
        self.timestamp.as_deref().map(timestamp_millis).unwrap_or(0)
    }

    /// Parsed timestamp, if it parses.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Parse the timestamp shapes the backend is known to send: RFC 3339, naive
/// ISO/Postgres datetimes (read as UTC), bare dates, and epoch seconds/millis.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    if let Ok(epoch) = raw.parse::<i64>() {
        // Anything past year 5138 in seconds is really milliseconds.
        return if epoch.abs() >= 100_000_000_000 {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
    }

    None
}

/// Milliseconds since the epoch, 0 for anything unparseable.
pub fn timestamp_millis(raw: &str) -> i64 {
    parse_timestamp(raw).map(|t| t.timestamp_millis()).unwrap_or(0)
}
