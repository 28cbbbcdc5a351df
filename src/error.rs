use crate::confluence::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed status vocabulary carried by every response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Ok,
    InvalidInput,
    NotFound,
    VersionConflict,
    InvalidOperation,
    Unauthorized,
    InternalError,
}

impl ErrorCode {
    /// Machine-readable code string as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::InvalidInput => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status used when a response carries this code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::InvalidInput => 400,
            Self::NotFound => 404,
            Self::VersionConflict => 409,
            Self::InvalidOperation => 422,
            Self::Unauthorized => 401,
            Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for request handling.
///
/// Tree resolution and the mutation engine return this type explicitly; it is
/// collapsed into a response envelope only at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ConflagentError {
    /// Missing or malformed required fields
    #[error("{0}")]
    InvalidInput(String),

    /// Title does not resolve under the tenant root, or the endpoint is unknown
    #[error("{0}")]
    NotFound(String),

    /// Optimistic-concurrency rejection on a write
    #[error("{0}")]
    VersionConflict(String),

    /// Circular move or duplicate sibling title
    #[error("{0}")]
    InvalidOperation(String),

    /// Missing or incorrect bearer credential
    #[error("Unauthorized: missing or invalid bearer token")]
    Unauthorized,

    /// Transport failure, timeout or unexpected upstream response shape
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConflagentError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Status code this error maps to.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::VersionConflict(_) => ErrorCode::VersionConflict,
            Self::InvalidOperation(_) => ErrorCode::InvalidOperation,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Message safe to hand back to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "An unexpected error occurred.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Upstream signals map 1:1 into the status vocabulary.
impl From<TransportError> for ConflagentError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::NotFound(msg) => ConflagentError::NotFound(msg),
            TransportError::Conflict(msg) => ConflagentError::VersionConflict(msg),
            other => ConflagentError::Internal(other.to_string()),
        }
    }
}

/// Result type alias for operations that can result in a ConflagentError
pub type ConflagentResult<T> = Result<T, ConflagentError>;
