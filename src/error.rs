//! Authentication Error Handling
//!
//! Every failure the core can produce is one of six kinds. Callers cannot
//! tell an unknown username from a wrong secret, and token failures carry
//! only a short static reason for the audit log.
//!
//! # Mapping to responses
//!
//! | Kind | Rejection | HTTP |
//! |------|-----------|------|
//! | `InvalidCredentials`, `Malformed`, `BadSignature`, `Expired` | Unauthenticated | 401 |
//! | `StoreUnavailable` | ServiceUnavailable (retryable) | 503 |
//! | `InvalidConfiguration` | Misconfigured | 500 |
//!
//! ```ignore
//! match gatehouse.authenticate_bearer(header) {
//!     Ok(principal) => { /* attach to request */ }
//!     Err(e) => return (e.status_code(), e.code()),
//! }
//! ```

use thiserror::Error;

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors produced by verification, issuance, and validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown user or wrong secret (never distinguished)
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Configuration or a caller-supplied parameter is out of bounds
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Token could not be decoded into a supported claim set
    #[error("malformed token: {0}")]
    Malformed(&'static str),

    /// Token signature does not verify under any known key
    #[error("token signature mismatch")]
    BadSignature,

    /// Token was valid but its lifetime has elapsed
    #[error("token expired")]
    Expired,

    /// The user store failed or missed its deadline
    #[error("user store unavailable: {0}")]
    StoreUnavailable(String),
}

/// How a caller should answer a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Authentication rejected; the client must re-authenticate
    Unauthenticated,
    /// Infrastructure failure; the client may retry
    ServiceUnavailable,
    /// Server-side misconfiguration
    Misconfigured,
}

impl AuthError {
    /// Create an invalid configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Stable machine-readable code for logs and response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::Malformed(_) => "malformed_token",
            Self::BadSignature => "bad_signature",
            Self::Expired => "token_expired",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Classify the error for the caller's response
    pub fn rejection(&self) -> Rejection {
        match self {
            Self::InvalidCredentials | Self::Malformed(_) | Self::BadSignature | Self::Expired => {
                Rejection::Unauthenticated
            }
            Self::StoreUnavailable(_) => Rejection::ServiceUnavailable,
            Self::InvalidConfiguration(_) => Rejection::Misconfigured,
        }
    }

    /// HTTP status code matching [`AuthError::rejection`]
    pub fn status_code(&self) -> u16 {
        match self.rejection() {
            Rejection::Unauthenticated => 401,
            Rejection::ServiceUnavailable => 503,
            Rejection::Misconfigured => 500,
        }
    }

    /// Whether the same request may succeed if retried later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Whether this is an authentication rejection (as opposed to an
    /// infrastructure or configuration failure)
    pub fn is_rejection(&self) -> bool {
        self.rejection() == Rejection::Unauthenticated
    }
}
