//! Session principal model
//!
//! [`Identity`] is the non-secret part of a credential record: what the
//! verifier hands back on success and what the issuer embeds in a token.
//! [`Principal`] is an identity bound to a token lifetime. Both are plain
//! data; a `Principal` cannot be modified once built.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Stable, unique subject identifier (numeric or textual)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectId {
    /// Signed integer id (e.g. a database row id)
    Numeric(i64),
    /// Opaque textual id (e.g. a UUID)
    Text(String),
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{}", id),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for SubjectId {
    fn from(id: i64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl SubjectId {
    /// Parse a command-line style id: digits become numeric, anything else text
    pub fn parse_loose(s: &str) -> Self {
        s.parse::<i64>()
            .map(Self::Numeric)
            .unwrap_or_else(|_| Self::Text(s.to_string()))
    }
}

/// Authenticated identity without token timestamps
///
/// Serializes as `{"id", "username", "email"}`, the user object returned by
/// the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Subject identifier
    #[serde(rename = "id")]
    pub subject_id: SubjectId,
    /// Login name
    pub username: String,
    /// Contact email
    pub email: String,
}

impl Identity {
    /// Create an identity
    pub fn new(
        subject_id: impl Into<SubjectId>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            username: username.into(),
            email: email.into(),
        }
    }
}

impl AsRef<Identity> for Identity {
    fn as_ref(&self) -> &Identity {
        self
    }
}

/// Identity bound to the lifetime of the token that carries it
///
/// Invariant: `expires_at > issued_at`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    identity: Identity,
    issued_at: SystemTime,
    expires_at: SystemTime,
}

impl Principal {
    /// Build a principal; `None` unless `expires_at` is strictly after `issued_at`
    pub(crate) fn new(identity: Identity, issued_at: SystemTime, expires_at: SystemTime) -> Option<Self> {
        (expires_at > issued_at).then_some(Self {
            identity,
            issued_at,
            expires_at,
        })
    }

    /// The identity part
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Subject identifier
    pub fn subject_id(&self) -> &SubjectId {
        &self.identity.subject_id
    }

    /// Login name
    pub fn username(&self) -> &str {
        &self.identity.username
    }

    /// Contact email
    pub fn email(&self) -> &str {
        &self.identity.email
    }

    /// When the token was issued
    pub fn issued_at(&self) -> SystemTime {
        self.issued_at
    }

    /// When the token stops being valid
    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    /// Total lifetime granted at issue time
    pub fn ttl(&self) -> Duration {
        self.expires_at
            .duration_since(self.issued_at)
            .unwrap_or_default()
    }

    /// Time left before expiry, measured from `now`
    pub fn remaining(&self, now: SystemTime) -> Duration {
        self.expires_at.duration_since(now).unwrap_or_default()
    }
}

impl AsRef<Identity> for Principal {
    fn as_ref(&self) -> &Identity {
        &self.identity
    }
}
