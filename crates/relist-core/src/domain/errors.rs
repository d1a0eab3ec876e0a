//! Domain error types
//!
//! This module defines error types specific to domain operations
//! (validation failures, invalid state transitions) and the normalized
//! error surface of every backend call ([`ApiError`]).

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid job identifier
    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    /// Invalid pairing code format (must be exactly six digits)
    #[error("Invalid pairing code: {0}")]
    InvalidPairingCode(String),

    /// Invalid listing identifier
    #[error("Invalid listing ID: {0}")]
    InvalidListingId(String),

    /// Unknown marketplace name
    #[error("Unknown marketplace: {0}")]
    UnknownMarketplace(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

// ============================================================================
// ApiError
// ============================================================================

/// Classification of an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Missing or rejected credential
    Auth,
    /// Transport-level failure (connect, timeout, reset)
    Network,
    /// The backend answered with something we cannot interpret
    Protocol,
    /// The backend reported an error status
    Server,
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApiErrorKind::Auth => "AuthError",
            ApiErrorKind::Network => "NetworkError",
            ApiErrorKind::Protocol => "ProtocolError",
            ApiErrorKind::Server => "ServerError",
        };
        write!(f, "{}", s)
    }
}

/// Normalized failure of a backend call
///
/// Every adapter maps its transport errors onto these four variants so
/// that callers can decide between retrying (network) and surfacing
/// (everything else) without knowing the transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No credential available, or the backend rejected it (401/403)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Response did not have the expected shape
    #[error("Unexpected response: {message}")]
    Protocol {
        /// What was wrong with the response
        message: String,
        /// Raw response body, kept for diagnostics
        body: Option<String>,
    },

    /// The backend returned a non-success status
    #[error("Server error ({status}): {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
}

impl ApiError {
    /// Shorthand for a protocol error without a body
    pub fn protocol(message: impl Into<String>) -> Self {
        ApiError::Protocol {
            message: message.into(),
            body: None,
        }
    }

    /// Shorthand for a protocol error carrying the raw response body
    pub fn protocol_with_body(message: impl Into<String>, body: impl Into<String>) -> Self {
        ApiError::Protocol {
            message: message.into(),
            body: Some(body.into()),
        }
    }

    /// Returns the classification of this error
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Auth(_) => ApiErrorKind::Auth,
            ApiError::Network(_) => ApiErrorKind::Network,
            ApiError::Protocol { .. } => ApiErrorKind::Protocol,
            ApiError::Server { .. } => ApiErrorKind::Server,
        }
    }

    /// Returns true for failures worth retrying on the next poll tick
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// Raw response body attached to this error, if any
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Protocol { body, .. } => body.as_deref(),
            ApiError::Server { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Human-readable message suitable for showing to a user
    ///
    /// Backend errors carry a JSON body of the form `{"detail": "..."}`;
    /// when present, the detail string is preferred over the raw body.
    pub fn message(&self) -> String {
        match self {
            ApiError::Auth(msg) | ApiError::Network(msg) => msg.clone(),
            ApiError::Protocol { message, .. } => message.clone(),
            ApiError::Server { status, body } => {
                extract_detail(body).unwrap_or_else(|| format!("Server returned status {status}"))
            }
        }
    }
}

/// Pulls the `detail` field out of a backend error body
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    }
}
