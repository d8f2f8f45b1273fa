//! Status polling configuration and handles.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// How often, and for how long, a session's status is polled.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay between successful polls.
    pub interval: Duration,

    /// Upper bound for the delay after repeated failed polls.
    pub max_interval: Duration,

    /// Delay multiplier applied per consecutive failed poll.
    pub backoff_factor: f64,

    /// Polling stops (phase `Expired`) once this much time has passed.
    pub max_duration: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(30),
            backoff_factor: 2.0,
            max_duration: Duration::from_secs(30 * 60),
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }
}

/// Delay schedule: fixed interval after a successful poll, growing after failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: PollConfig,
    failures: u32,
}

impl Backoff {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            config: config.clone(),
            failures: 0,
        }
    }

    /// Delay after a poll that returned a snapshot.
    pub fn on_success(&mut self) -> Duration {
        self.failures = 0;
        self.config.interval
    }

    /// Delay after a poll that returned nothing.
    pub fn on_failure(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let factor = self.config.backoff_factor.max(1.0).powi(self.failures.min(32) as i32);
        let delay = self.config.interval.as_secs_f64() * factor;
        let ceiling = self.config.max_interval.max(self.config.interval);

        if delay.is_finite() && delay < ceiling.as_secs_f64() {
            Duration::from_secs_f64(delay)
        } else {
            ceiling
        }
    }

    /// Consecutive failed polls so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// Handle to one polling loop.
///
/// Cancelling is idempotent; every clone refers to the same loop.
#[derive(Debug, Clone)]
pub struct PollHandle {
    id: Uuid,
    session_id: String,
    generation: u64,
    token: CancellationToken,
}

impl PollHandle {
    pub(crate) fn new(session_id: impl Into<String>, generation: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            generation,
            token: CancellationToken::new(),
        }
    }

    /// Unique id of this loop.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Negotiation being polled.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Controller generation the loop was started in.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop the loop. Safe to call any number of times.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_only_grows_on_failure() {
        let config = PollConfig::default();
        let mut backoff = Backoff::new(&config);

        assert_eq!(backoff.on_failure(), Duration::from_secs(6));
        assert_eq!(backoff.on_failure(), Duration::from_secs(12));
        assert_eq!(backoff.on_failure(), Duration::from_secs(24));
        assert_eq!(backoff.on_failure(), Duration::from_secs(30));
        assert_eq!(backoff.on_failure(), Duration::from_secs(30));
        assert_eq!(backoff.failures(), 5);

        assert_eq!(backoff.on_success(), Duration::from_secs(3));
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.on_failure(), Duration::from_secs(6));
    }

    #[test]
    fn test_handle_cancel_is_idempotent() {
        let handle = PollHandle::new("n1", 1);
        let clone = handle.clone();

        assert!(!handle.is_cancelled());
        handle.cancel();
        handle.cancel();
        clone.cancel();
        assert!(clone.is_cancelled());
        assert_eq!(clone.id(), handle.id());
        assert_eq!(clone.session_id(), "n1");
    }
}
