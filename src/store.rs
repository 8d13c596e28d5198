//! User Store Integration
//!
//! The core never owns user storage. The surrounding application supplies a
//! [`UserStore`] (database, directory service, ...) and the verifier calls
//! `lookup` exactly once per verification. Store failures surface as
//! [`AuthError::StoreUnavailable`], distinct from bad credentials.
//!
//! ```ignore
//! use gatehouse::store::{UserStore, StoreError, StoreFuture};
//!
//! struct PgUserStore { pool: PgPool }
//!
//! impl UserStore for PgUserStore {
//!     fn lookup<'a>(&'a self, username: &'a str) -> StoreFuture<'a> {
//!         Box::pin(async move {
//!             let row = sqlx::query_as(/* ... */)
//!                 .fetch_optional(&self.pool)
//!                 .await
//!                 .map_err(|e| StoreError::Unavailable(e.to_string()))?;
//!             Ok(row.map(into_record))
//!         })
//!     }
//! }
//! ```
//!
//! [`InMemoryUserStore`] is a read-only map built once at startup, for tests
//! and small deployments.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::credential::{CredentialRecord, SecretHasher};
use crate::error::{AuthError, Result};
use crate::principal::SubjectId;

/// Error type for store lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or failed
    Unavailable(String),
    /// Lookup did not finish before the caller's deadline
    DeadlineExceeded,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "{}", msg),
            StoreError::DeadlineExceeded => write!(f, "lookup deadline exceeded"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}

/// Boxed future returned by [`UserStore::lookup`]
pub type StoreFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<Option<CredentialRecord>, StoreError>> + Send + 'a>>;

/// Credential lookup supplied by the surrounding application
pub trait UserStore: Send + Sync {
    /// Fetch the record for `username`, `Ok(None)` if there is none.
    ///
    /// Must have no side effects on failure.
    fn lookup<'a>(&'a self, username: &'a str) -> StoreFuture<'a>;
}

/// Immutable in-memory user store
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    records: HashMap<String, CredentialRecord>,
}

impl InMemoryUserStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pre-hashed record.
    ///
    /// Fails if the username or subject id is already taken.
    pub fn with_record(mut self, record: CredentialRecord) -> Result<Self> {
        if self.records.contains_key(&record.username) {
            return Err(AuthError::config(format!(
                "duplicate username '{}' in user store",
                record.username
            )));
        }
        if self.contains_subject(&record.subject_id) {
            return Err(AuthError::config(format!(
                "duplicate subject id '{}' in user store",
                record.subject_id
            )));
        }
        self.records.insert(record.username.clone(), record);
        Ok(self)
    }

    /// Hash `secret` with a fresh salt and add the resulting record
    pub fn with_user(
        self,
        hasher: &SecretHasher,
        subject_id: impl Into<SubjectId>,
        username: &str,
        email: &str,
        secret: &str,
    ) -> Result<Self> {
        let record = hasher.create_record(subject_id, username, email, secret)?;
        self.with_record(record)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn contains_subject(&self, subject_id: &SubjectId) -> bool {
        self.records.values().any(|r| &r.subject_id == subject_id)
    }
}

impl UserStore for InMemoryUserStore {
    fn lookup<'a>(&'a self, username: &'a str) -> StoreFuture<'a> {
        let record = self.records.get(username).cloned();
        Box::pin(async move { Ok(record) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::HashParams;

    fn hasher() -> SecretHasher {
        SecretHasher::new(HashParams::insecure_fast()).unwrap()
    }

    #[tokio::test]
    async fn test_lookup() {
        let store = InMemoryUserStore::new()
            .with_user(&hasher(), 1i64, "admin", "admin@example.com", "password")
            .unwrap();

        let record = store.lookup("admin").await.unwrap().unwrap();
        assert_eq!(record.subject_id, SubjectId::Numeric(1));
        assert!(store.lookup("nobody").await.unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let h = hasher();
        let result = InMemoryUserStore::new()
            .with_user(&h, 1i64, "admin", "a@example.com", "x")
            .unwrap()
            .with_user(&h, 2i64, "admin", "b@example.com", "y");
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_duplicate_subject_rejected() {
        let h = hasher();
        let result = InMemoryUserStore::new()
            .with_user(&h, 1i64, "admin", "a@example.com", "x")
            .unwrap()
            .with_user(&h, 1i64, "user", "b@example.com", "y");
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_store_error_maps_to_unavailable() {
        let err: AuthError = StoreError::DeadlineExceeded.into();
        assert_eq!(err, AuthError::StoreUnavailable("lookup deadline exceeded".into()));
        assert!(err.is_retryable());
    }
}
