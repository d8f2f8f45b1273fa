//! Session event feed.

use futures::Stream;
use parley_core::StatusSnapshot;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::trace;

/// Where the controller is in a negotiation's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No session.
    #[default]
    Idle,
    /// Create request in flight.
    Creating,
    /// Session known, status being polled.
    Polling,
    /// Every supplier conversation has finished.
    Completed,
    /// Polling gave up after its maximum duration.
    Expired,
}

/// A change consumers may want to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged {
        phase: SessionPhase,
        session_id: Option<String>,
    },
    StatusUpdated(StatusSnapshot),
    /// A user-triggered action failed.
    Error { message: String },
    ErrorDismissed,
}

/// Broadcast channel carrying [`SessionEvent`]s.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Events as a stream. Lagging subscribers skip what they missed.
    pub fn stream(&self) -> impl Stream<Item = SessionEvent> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|event| event.ok())
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        if self.tx.send(event).is_err() {
            trace!("Session event dropped, no subscribers");
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(64)
    }
}
