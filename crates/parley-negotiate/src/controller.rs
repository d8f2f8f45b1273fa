//! Negotiation session controller.
//!
//! Owns the lifecycle of the one negotiation the user is looking at:
//!
//! ```text
//! Idle --submit--> Creating --ok--> Polling --all_completed--> Completed
//!                     |                |
//!                     +--error--> Idle +--max_duration--> Expired --resume--> Polling
//! ```
//!
//! At most one polling loop runs per controller. Starting a session cancels the
//! previous loop before anything else, and every status response is checked
//! against the session id and generation it was requested for before it may
//! touch state.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use parley_core::{
    ConversationMessage, IdentityReconciler, MessageNormalizer, NegotiationBackend,
    NegotiationRequest, NegotiationSession, NegotiationStatus, ParleyError, Result,
    StatusSnapshot, SupplierIdentity,
};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::events::{SessionEvent, SessionEvents, SessionPhase};
use crate::polling::{Backoff, PollConfig, PollHandle};

/// What the controller currently knows, as handed to consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    pub phase: SessionPhase,
    pub session: Option<NegotiationSession>,
    /// Resolved identities for the session's suppliers, in session order.
    pub suppliers: Vec<SupplierIdentity>,
    pub last_snapshot: Option<StatusSnapshot>,
    /// Last surfaced error, until dismissed.
    pub last_error: Option<String>,
    generation: u64,
}

impl ControllerState {
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    /// Bumped every time the controller switches sessions.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct Poller {
    handle: PollHandle,
    task: JoinHandle<()>,
}

/// Drives one negotiation at a time against a [`NegotiationBackend`].
pub struct SessionController<B: NegotiationBackend + 'static> {
    backend: Arc<B>,
    normalizer: Arc<MessageNormalizer>,
    config: PollConfig,
    state: Arc<RwLock<ControllerState>>,
    poller: Mutex<Option<Poller>>,
    events: SessionEvents,
}

impl<B: NegotiationBackend + 'static> SessionController<B> {
    /// Create a controller with default polling and the default sender profile.
    pub fn new(backend: Arc<B>) -> Result<Self> {
        Ok(Self::with_parts(backend, MessageNormalizer::new()?, PollConfig::default()))
    }

    pub fn with_parts(backend: Arc<B>, normalizer: MessageNormalizer, config: PollConfig) -> Self {
        Self {
            backend,
            normalizer: Arc::new(normalizer),
            config,
            state: Arc::new(RwLock::new(ControllerState::default())),
            poller: Mutex::new(None),
            events: SessionEvents::default(),
        }
    }

    pub fn with_config(mut self, config: PollConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> ControllerState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    /// Whether a polling loop is live.
    pub async fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .await
            .as_ref()
            .map(|p| !p.handle.is_cancelled() && !p.task.is_finished())
            .unwrap_or(false)
    }

    /// Create a negotiation and start polling it.
    ///
    /// Any previous session is abandoned first. On failure the controller
    /// returns to `Idle` with the error surfaced; nothing is retried.
    pub async fn submit(&self, request: NegotiationRequest) -> Result<NegotiationSession> {
        self.cancel_poller().await;
        let generation = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.phase = SessionPhase::Creating;
            state.session = None;
            state.suppliers.clear();
            state.last_snapshot = None;
            state.last_error = None;
            state.generation
        };
        self.events.emit(SessionEvent::PhaseChanged {
            phase: SessionPhase::Creating,
            session_id: None,
        });

        let created = match self.create(&request).await {
            Ok(created) => created,
            Err(err) => {
                self.fail_creation(generation, &err).await;
                return Err(err);
            }
        };

        let session = NegotiationSession {
            id: created.id,
            prompt: request.prompt.clone(),
            tactics: request.tactics.clone(),
            supplier_ids: request.supplier_ids.clone(),
            status: created.status,
            created_at: Some(Utc::now().to_rfc3339()),
            updated_at: None,
        };
        let suppliers = self.resolve_identities(&session.supplier_ids).await;

        {
            let mut state = self.state.write().await;
            if state.generation != generation {
                debug!(negotiation_id = %session.id, "Session superseded while creating");
                return Ok(session);
            }
            state.session = Some(session.clone());
            state.suppliers = suppliers;
            state.phase = SessionPhase::Polling;
        }
        self.events.emit(SessionEvent::PhaseChanged {
            phase: SessionPhase::Polling,
            session_id: Some(session.id.clone()),
        });
        info!(negotiation_id = %session.id, suppliers = session.supplier_ids.len(), "Negotiation started");

        self.spawn_poller(&session.id, generation).await;
        Ok(session)
    }

    async fn create(&self, request: &NegotiationRequest) -> Result<parley_core::CreatedNegotiation> {
        if request.prompt.trim().is_empty() {
            return Err(ParleyError::InvalidInput("Prompt must not be empty".to_string()));
        }
        self.backend.create_negotiation(request).await
    }

    async fn fail_creation(&self, generation: u64, err: &ParleyError) {
        warn!(error = %err, "Negotiation could not be created");
        {
            let mut state = self.state.write().await;
            if state.generation != generation {
                return;
            }
            state.phase = SessionPhase::Idle;
            state.last_error = Some(err.to_string());
        }
        self.events.emit(SessionEvent::Error {
            message: err.to_string(),
        });
        self.events.emit(SessionEvent::PhaseChanged {
            phase: SessionPhase::Idle,
            session_id: None,
        });
    }

    /// Re-open a past negotiation by id.
    pub async fn open_from_history(&self, negotiation_id: &str) -> Result<NegotiationSession> {
        match self.backend.find_negotiation(negotiation_id).await {
            Some(session) => self.open_session(session).await,
            None => {
                let err = ParleyError::NotFound {
                    resource_type: "Negotiation".to_string(),
                    id: negotiation_id.to_string(),
                };
                self.state.write().await.last_error = Some(err.to_string());
                self.events.emit(SessionEvent::Error {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Re-open a session taken from the history listing.
    ///
    /// Never creates anything on the backend. Supplier identities are rebuilt;
    /// polling resumes only when the session is not already completed.
    pub async fn open_session(&self, mut session: NegotiationSession) -> Result<NegotiationSession> {
        self.cancel_poller().await;
        let generation = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.session = None;
            state.suppliers.clear();
            state.last_snapshot = None;
            state.last_error = None;
            state.generation
        };

        // History rows may come without suppliers; the status knows them.
        let snapshot = if session.supplier_ids.is_empty() {
            self.backend.negotiation_status(&session.id).await
        } else {
            None
        };
        if let Some(snapshot) = &snapshot {
            session.set_supplier_ids(snapshot.supplier_ids());
        }
        let suppliers = self.resolve_identities(&session.supplier_ids).await;

        let completed = session.status.is_completed()
            || snapshot.as_ref().map(|s| s.all_completed).unwrap_or(false);
        let phase = if completed {
            SessionPhase::Completed
        } else {
            SessionPhase::Polling
        };

        {
            let mut state = self.state.write().await;
            if state.generation != generation {
                return Ok(session);
            }
            state.session = Some(session.clone());
            state.suppliers = suppliers;
            state.last_snapshot = snapshot;
            state.phase = phase;
        }
        self.events.emit(SessionEvent::PhaseChanged {
            phase,
            session_id: Some(session.id.clone()),
        });
        info!(negotiation_id = %session.id, ?phase, "Opened negotiation from history");

        if !completed {
            self.spawn_poller(&session.id, generation).await;
        }
        Ok(session)
    }

    /// Start polling the active session. Replaces any running loop.
    pub async fn start_polling(&self, session_id: &str) -> Result<PollHandle> {
        let generation = {
            let mut state = self.state.write().await;
            if state.session_id() != Some(session_id) {
                return Err(ParleyError::InvalidInput(format!(
                    "Negotiation {} is not the active session",
                    session_id
                )));
            }
            state.phase = SessionPhase::Polling;
            state.generation
        };
        self.events.emit(SessionEvent::PhaseChanged {
            phase: SessionPhase::Polling,
            session_id: Some(session_id.to_string()),
        });

        self.spawn_poller(session_id, generation)
            .await
            .ok_or_else(|| {
                ParleyError::InvalidInput(format!(
                    "Negotiation {} was replaced before polling started",
                    session_id
                ))
            })
    }

    /// Stop a polling loop. Idempotent; stale handles are harmless.
    pub async fn stop_polling(&self, handle: &PollHandle) {
        handle.cancel();
        let mut slot = self.poller.lock().await;
        if slot.as_ref().map(|p| p.handle.id()) == Some(handle.id()) {
            if let Some(poller) = slot.take() {
                Self::join(poller).await;
            }
        }
    }

    /// Restart polling after it expired.
    pub async fn resume_polling(&self) -> Result<PollHandle> {
        let session_id = {
            let state = self.state.read().await;
            match (&state.session, state.phase) {
                (Some(_), SessionPhase::Completed) => {
                    return Err(ParleyError::InvalidInput(
                        "Negotiation already completed".to_string(),
                    ))
                }
                (Some(session), _) => session.id.clone(),
                (None, _) => {
                    return Err(ParleyError::InvalidInput("No active negotiation".to_string()))
                }
            }
        };
        self.start_polling(&session_id).await
    }

    /// Abandon the current session and return to `Idle`.
    pub async fn close(&self) {
        self.cancel_poller().await;
        {
            let mut state = self.state.write().await;
            let generation = state.generation + 1;
            *state = ControllerState {
                generation,
                ..ControllerState::default()
            };
        }
        self.events.emit(SessionEvent::PhaseChanged {
            phase: SessionPhase::Idle,
            session_id: None,
        });
    }

    /// Clear the surfaced error.
    pub async fn dismiss_error(&self) {
        let had_error = self.state.write().await.last_error.take().is_some();
        if had_error {
            self.events.emit(SessionEvent::ErrorDismissed);
        }
    }

    /// Normalized transcript with one supplier of the active session.
    pub async fn transcript(&self, supplier_id: &str) -> Vec<ConversationMessage> {
        let Some(negotiation_id) = self.state.read().await.session_id().map(str::to_string) else {
            return Vec::new();
        };
        let raw = self.backend.conversation(&negotiation_id, supplier_id).await;
        self.normalizer.normalize(&raw)
    }

    /// Transcripts for every supplier of the active session, fetched concurrently.
    ///
    /// A supplier without messages yields an empty transcript and does not
    /// affect the others.
    pub async fn transcripts(&self) -> Vec<(SupplierIdentity, Vec<ConversationMessage>)> {
        let suppliers = self.state.read().await.suppliers.clone();
        let transcripts = join_all(suppliers.iter().map(|s| self.transcript(&s.id))).await;
        suppliers.into_iter().zip(transcripts).collect()
    }

    /// Build identities from a fresh catalog and registry.
    ///
    /// An unavailable source is skipped; resolution itself never fails.
    pub async fn resolve_identities(&self, supplier_ids: &[String]) -> Vec<SupplierIdentity> {
        if supplier_ids.is_empty() {
            return Vec::new();
        }

        let (products, suppliers) =
            tokio::join!(self.backend.list_products(), self.backend.list_suppliers());
        let products = products.unwrap_or_else(|e| {
            warn!(error = %e, "Product catalog unavailable for identity lookup");
            Vec::new()
        });
        let suppliers = suppliers.unwrap_or_else(|e| {
            warn!(error = %e, "Supplier registry unavailable for identity lookup");
            Vec::new()
        });

        IdentityReconciler::new(&products, &suppliers).resolve_all(supplier_ids)
    }

    /// Start a loop for `generation`, or nothing if the controller has moved on.
    async fn spawn_poller(&self, session_id: &str, generation: u64) -> Option<PollHandle> {
        let mut slot = self.poller.lock().await;
        let current = self.state.read().await.generation;
        if current != generation {
            debug!(
                negotiation_id = session_id,
                generation,
                current,
                "Skipping poller for a replaced session"
            );
            return None;
        }

        if let Some(previous) = slot.take() {
            previous.handle.cancel();
            Self::join(previous).await;
        }

        let handle = PollHandle::new(session_id, generation);
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.backend),
            Arc::clone(&self.state),
            self.events.clone(),
            self.config.clone(),
            handle.clone(),
        ));
        debug!(negotiation_id = session_id, poller = %handle.id(), "Polling started");

        *slot = Some(Poller {
            handle: handle.clone(),
            task,
        });
        Some(handle)
    }

    async fn cancel_poller(&self) {
        let previous = self.poller.lock().await.take();
        if let Some(poller) = previous {
            poller.handle.cancel();
            Self::join(poller).await;
        }
    }

    async fn join(poller: Poller) {
        if let Err(e) = poller.task.await {
            warn!(error = %e, poller = %poller.handle.id(), "Polling task ended abnormally");
        }
    }
}

impl<B: NegotiationBackend + 'static> Drop for SessionController<B> {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.get_mut().take() {
            poller.handle.cancel();
        }
    }
}

enum Applied {
    Continue,
    Completed,
    Stale,
}

async fn poll_loop<B: NegotiationBackend + 'static>(
    backend: Arc<B>,
    state: Arc<RwLock<ControllerState>>,
    events: SessionEvents,
    config: PollConfig,
    handle: PollHandle,
) {
    let started = Instant::now();
    let mut backoff = Backoff::new(&config);
    let mut delay = std::time::Duration::ZERO;

    loop {
        tokio::select! {
            _ = handle.token().cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        if started.elapsed() >= config.max_duration {
            expire(&state, &events, &handle).await;
            break;
        }

        let snapshot = tokio::select! {
            _ = handle.token().cancelled() => break,
            snapshot = backend.negotiation_status(handle.session_id()) => snapshot,
        };

        let Some(snapshot) = snapshot else {
            delay = backoff.on_failure();
            debug!(
                negotiation_id = handle.session_id(),
                failures = backoff.failures(),
                retry_in_ms = delay.as_millis() as u64,
                "No status yet"
            );
            continue;
        };

        delay = backoff.on_success();
        match apply_snapshot(&state, &events, &handle, snapshot).await {
            Applied::Continue => {}
            Applied::Completed | Applied::Stale => break,
        }
    }

    debug!(negotiation_id = handle.session_id(), poller = %handle.id(), "Polling stopped");
}

fn is_current(state: &ControllerState, handle: &PollHandle) -> bool {
    !handle.is_cancelled()
        && state.generation == handle.generation()
        && state.session_id() == Some(handle.session_id())
}

/// Apply one status response, unless it belongs to an abandoned session.
async fn apply_snapshot(
    state: &RwLock<ControllerState>,
    events: &SessionEvents,
    handle: &PollHandle,
    snapshot: StatusSnapshot,
) -> Applied {
    let mut state = state.write().await;
    if !is_current(&state, handle) {
        debug!(negotiation_id = handle.session_id(), "Discarding stale status response");
        return Applied::Stale;
    }

    let completed = snapshot.all_completed;
    if let Some(session) = state.session.as_mut() {
        if session.supplier_ids.is_empty() {
            session.set_supplier_ids(snapshot.supplier_ids());
        }
        if completed {
            session.status = NegotiationStatus::Completed;
        }
    }
    state.last_snapshot = Some(snapshot.clone());
    events.emit(SessionEvent::StatusUpdated(snapshot));

    if completed {
        state.phase = SessionPhase::Completed;
        events.emit(SessionEvent::PhaseChanged {
            phase: SessionPhase::Completed,
            session_id: Some(handle.session_id().to_string()),
        });
        info!(negotiation_id = handle.session_id(), "Negotiation completed");
        Applied::Completed
    } else {
        Applied::Continue
    }
}

async fn expire(state: &RwLock<ControllerState>, events: &SessionEvents, handle: &PollHandle) {
    let mut state = state.write().await;
    if !is_current(&state, handle) {
        return;
    }
    state.phase = SessionPhase::Expired;
    events.emit(SessionEvent::PhaseChanged {
        phase: SessionPhase::Expired,
        session_id: Some(handle.session_id().to_string()),
    });
    warn!(negotiation_id = handle.session_id(), "Polling gave up after maximum duration");
}
