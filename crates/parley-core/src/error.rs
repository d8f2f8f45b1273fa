//! Error types for Parley.

use thiserror::Error;

/// Main error type for Parley operations.
///
/// Only user-triggered mutations (search, create negotiation) surface these to
/// callers. Read paths that mean "no data yet" degrade to empty results instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParleyError {
    /// The backend could not be reached at all (DNS, refused connection, TLS).
    #[error("Cannot connect to backend. Make sure the API server is running on {base_url} ({message})")]
    BackendUnreachable { base_url: String, message: String },

    /// The backend answered with a non-success status code.
    #[error("{operation} failed: {status} {message}")]
    HttpStatus {
        operation: String,
        status: u16,
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The caller supplied something unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    /// Operation timed out.
    #[error("Operation timed out after {duration_ms}ms: {message}")]
    Timeout { duration_ms: u64, message: String },

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Returns true if retrying the same call later may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ParleyError::BackendUnreachable { .. } => true,
            ParleyError::Timeout { .. } => true,
            ParleyError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the HTTP status code if the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ParleyError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience Result type for Parley operations.
pub type Result<T> = std::result::Result<T, ParleyError>;

impl From<serde_json::Error> for ParleyError {
    fn from(err: serde_json::Error) -> Self {
        ParleyError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_message_names_base_url() {
        let err = ParleyError::BackendUnreachable {
            base_url: "http://localhost:5147".to_string(),
            message: "connection refused".to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("http://localhost:5147"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_status_classification() {
        let server = ParleyError::HttpStatus {
            operation: "Search".to_string(),
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        let client = ParleyError::HttpStatus {
            operation: "Search".to_string(),
            status: 400,
            message: "Bad Request".to_string(),
        };

        assert!(server.is_recoverable());
        assert!(!client.is_recoverable());
        assert_eq!(client.status(), Some(400));
        assert_eq!(client.to_string(), "Search failed: 400 Bad Request");
    }

    #[test]
    fn test_from_serde_error() {
        let err: ParleyError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, ParleyError::SerializationError(_)));
    }
}
