//! Error types for the Confluence transport

use thiserror::Error;

/// Distinct upstream signals surfaced by a [`ContentTransport`](super::ContentTransport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The upstream service reported the page as missing (HTTP 404)
    #[error("{0}")]
    NotFound(String),

    /// The upstream service rejected the version token (HTTP 409)
    #[error("{0}")]
    Conflict(String),

    /// The call did not complete within the configured timeout
    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    /// Any other non-success status or connection failure
    #[error("Upstream request failed (status {status:?}): {message}")]
    Failure {
        status: Option<u16>,
        message: String,
    },

    /// The upstream answered with a body of unexpected shape
    #[error("Unexpected upstream response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    pub fn failure(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Failure {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether an idempotent read may be transparently retried after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Failure { status, .. } => status.map_or(true, |code| code >= 500),
            _ => false,
        }
    }

    /// Map a non-success HTTP status into the matching signal.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            404 => Self::NotFound(format!("Upstream page not found: {}", body)),
            409 => Self::Conflict(format!("Upstream version conflict: {}", body)),
            _ => Self::failure(Some(status), body),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout(error.to_string())
        } else if error.is_decode() {
            TransportError::InvalidResponse(error.to_string())
        } else {
            TransportError::failure(error.status().map(|s| s.as_u16()), error.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(error: serde_json::Error) -> Self {
        TransportError::InvalidResponse(error.to_string())
    }
}

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_keeps_signals_distinct() {
        assert!(matches!(
            TransportError::from_status(404, "x"),
            TransportError::NotFound(_)
        ));
        assert!(matches!(
            TransportError::from_status(409, "x"),
            TransportError::Conflict(_)
        ));
        assert!(matches!(
            TransportError::from_status(400, "x"),
            TransportError::Failure {
                status: Some(400),
                ..
            }
        ));
    }

    #[test]
    fn only_transient_failures_retry() {
        assert!(TransportError::Timeout("t".into()).is_retryable());
        assert!(TransportError::failure(Some(503), "busy").is_retryable());
        assert!(TransportError::failure(None, "connection refused").is_retryable());
        assert!(!TransportError::failure(Some(403), "denied").is_retryable());
        assert!(!TransportError::NotFound("n".into()).is_retryable());
        assert!(!TransportError::Conflict("c".into()).is_retryable());
    }
}
