//! Per-endpoint failure policy.
//!
//! Whether a failed call surfaces an error or quietly becomes "no data" is
//! declared once per endpoint here instead of at every call site.

use parley_core::ParleyError;
use tracing::warn;

/// What to do when a call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the error to the caller.
    Propagate,
    /// Log it and return an empty value.
    DegradeToEmpty,
}

/// Backend endpoints the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Health,
    Search,
    Suppliers,
    Products,
    Negotiate,
    Negotiations,
    NegotiationStatus,
    Conversation,
}

impl Endpoint {
    /// Route prefix. Parameterized routes get their segments appended.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Health => "/health",
            Endpoint::Search => "/search",
            Endpoint::Suppliers => "/suppliers",
            Endpoint::Products => "/products",
            Endpoint::Negotiate => "/negotiate",
            // Misspelled on the backend.
            Endpoint::Negotiations => "/get_negotations",
            Endpoint::NegotiationStatus => "/negotiation_status",
            Endpoint::Conversation => "/conversation",
        }
    }

    /// Human-readable operation name used in errors and logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Endpoint::Health => "Health check",
            Endpoint::Search => "Search",
            Endpoint::Suppliers => "Fetch suppliers",
            Endpoint::Products => "Fetch products",
            Endpoint::Negotiate => "Create negotiation",
            Endpoint::Negotiations => "Fetch negotiations",
            Endpoint::NegotiationStatus => "Fetch negotiation status",
            Endpoint::Conversation => "Fetch conversation",
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        match self {
            Endpoint::Search | Endpoint::Suppliers | Endpoint::Products | Endpoint::Negotiate => {
                FailurePolicy::Propagate
            }
            Endpoint::Health
            | Endpoint::Negotiations
            | Endpoint::NegotiationStatus
            | Endpoint::Conversation => FailurePolicy::DegradeToEmpty,
        }
    }

    /// Resolve a failed call according to this endpoint's policy.
    ///
    /// Degrading endpoints log one warning and yield `T::default()`.
    pub fn settle<T: Default>(&self, result: Result<T, ParleyError>) -> Result<T, ParleyError> {
        match (result, self.policy()) {
            (Ok(value), _) => Ok(value),
            (Err(err), FailurePolicy::Propagate) => Err(err),
            (Err(err), FailurePolicy::DegradeToEmpty) => {
                warn!(endpoint = self.path(), error = %err, "{} degraded to empty result", self.operation());
                Ok(T::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> ParleyError {
        ParleyError::HttpStatus {
            operation: "x".to_string(),
            status: 500,
            message: String::new(),
        }
    }

    #[test]
    fn test_mutations_propagate() {
        for endpoint in [Endpoint::Search, Endpoint::Negotiate] {
            assert_eq!(endpoint.policy(), FailurePolicy::Propagate);
            assert!(endpoint.settle::<Vec<u8>>(Err(failure())).is_err());
        }
    }

    #[test]
    fn test_reads_degrade() {
        let settled: Option<u32> = Endpoint::NegotiationStatus.settle(Err(failure())).unwrap();
        assert_eq!(settled, None);

        let settled: Vec<u32> = Endpoint::Conversation.settle(Err(failure())).unwrap();
        assert!(settled.is_empty());

        let kept: Vec<u32> = Endpoint::Negotiations.settle(Ok(vec![1])).unwrap();
        assert_eq!(kept, vec![1]);
    }
}
