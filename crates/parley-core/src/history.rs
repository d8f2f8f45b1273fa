//! Browsing helpers for past negotiations.

use std::collections::BTreeMap;

use crate::negotiation::NegotiationSession;
use crate::types::NegotiationStatus;

/// Narrows a history listing by free text and status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    /// Case-insensitive text matched against the prompt and the tactics.
    pub query: Option<String>,

    /// Only sessions with this status.
    pub status: Option<NegotiationStatus>,
}

impl HistoryFilter {
    /// A filter that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match sessions whose prompt or tactics contain `query`.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = if query.trim().is_empty() { None } else { Some(query) };
        self
    }

    /// Match sessions with the given status.
    pub fn with_status(mut self, status: NegotiationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, session: &NegotiationSession) -> bool {
        if let Some(status) = &self.status {
            if &session.status != status {
                return false;
            }
        }

        match &self.query {
            None => true,
            Some(query) => {
                let needle = query.trim().to_lowercase();
                session.prompt.to_lowercase().contains(&needle)
                    || session
                        .tactics
                        .iter()
                        .any(|t| t.to_lowercase().contains(&needle))
            }
        }
    }

    /// Matching sessions, in their original order.
    pub fn apply<'a>(&self, sessions: &'a [NegotiationSession]) -> Vec<&'a NegotiationSession> {
        sessions.iter().filter(|s| self.matches(s)).collect()
    }
}

/// Number of sessions per status label.
pub fn status_counts(sessions: &[NegotiationSession]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for session in sessions {
        *counts.entry(session.status.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, prompt: &str, tactics: &[&str], status: NegotiationStatus) -> NegotiationSession {
        NegotiationSession {
            id: id.to_string(),
            prompt: prompt.to_string(),
            tactics: tactics.iter().map(|t| t.to_string()).collect(),
            supplier_ids: Vec::new(),
            status,
            created_at: None,
            updated_at: None,
        }
    }

    fn history() -> Vec<NegotiationSession> {
        vec![
            session("1", "500 Hoodies for the team", &["friendly"], NegotiationStatus::Completed),
            session("2", "Steel beams", &["direct", "Professional"], NegotiationStatus::Active),
            session("3", "Laptops", &["professional"], NegotiationStatus::Completed),
        ]
    }

    #[test]
    fn test_query_matches_prompt_and_tactics() {
        let sessions = history();

        let by_prompt = HistoryFilter::new().with_query("hoodies");
        assert_eq!(by_prompt.apply(&sessions).len(), 1);

        let by_tactic: Vec<&str> = HistoryFilter::new()
            .with_query("PROFESSIONAL")
            .apply(&sessions)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(by_tactic, vec!["2", "3"]);

        assert_eq!(HistoryFilter::new().with_query("  ").apply(&sessions).len(), 3);
    }

    #[test]
    fn test_status_filter_and_counts() {
        let sessions = history();

        let completed = HistoryFilter::new()
            .with_status(NegotiationStatus::Completed)
            .with_query("laptop");
        assert_eq!(completed.apply(&sessions).len(), 1);

        let counts = status_counts(&sessions);
        assert_eq!(counts.get("completed"), Some(&2));
        assert_eq!(counts.get("active"), Some(&1));
        assert_eq!(counts.get("pending"), None);
    }
}
