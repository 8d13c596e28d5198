//! Credential Verification
//!
//! Checks a username and secret against the record returned by the
//! [`UserStore`]. The outcome reveals nothing about whether the username
//! exists:
//!
//! - an unknown username is hashed against a dummy credential with the same
//!   cost parameters, so both paths do the same Argon2id work
//! - unknown user and wrong secret return the same
//!   [`AuthError::InvalidCredentials`] and log the same event
//!
//! Store failures are reported as [`AuthError::StoreUnavailable`], never as
//! bad credentials.
//!
//! # Usage
//!
//! ```ignore
//! use gatehouse::{CredentialVerifier, SecretHasher, HashParams};
//!
//! let verifier = CredentialVerifier::new(store, SecretHasher::new(HashParams::default())?)
//!     .with_store_timeout(Duration::from_secs(2));
//!
//! let identity = verifier.verify("admin", "password").await?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::credential::{CredentialRecord, SecretHasher};
use crate::error::{AuthError, Result};
use crate::observability::SecurityEvent;
use crate::principal::Identity;
use crate::security_event;
use crate::store::{StoreError, UserStore};

/// Secret behind the dummy credential
const DUMMY_SECRET: &[u8] = b"gatehouse-dummy-credential";

/// Verifies username/secret pairs against a [`UserStore`]
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn UserStore>,
    hasher: SecretHasher,
    dummy_salt: Vec<u8>,
    dummy_hash: Vec<u8>,
    store_timeout: Option<Duration>,
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("hasher", &self.hasher)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl CredentialVerifier {
    /// Create a verifier.
    ///
    /// Generates the dummy credential with the hasher's parameters, so this
    /// costs one hash.
    pub fn new(store: Arc<dyn UserStore>, hasher: SecretHasher) -> Result<Self> {
        let dummy_salt = SecretHasher::generate_salt();
        let dummy_hash = hasher.hash(DUMMY_SECRET, &dummy_salt)?;
        Ok(Self {
            store,
            hasher,
            dummy_salt,
            dummy_hash,
            store_timeout: None,
        })
    }

    /// Bound every lookup made by [`verify`](Self::verify)
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// The configured lookup bound
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout
    }

    /// Verify `secret` for `username`, bounding the lookup by the configured
    /// store timeout.
    pub async fn verify(&self, username: &str, secret: &str) -> Result<Identity> {
        let deadline = self.store_timeout.map(|t| Instant::now() + t);
        self.verify_with_deadline(username, secret, deadline).await
    }

    /// Verify `secret` for `username`; the lookup is abandoned at `deadline`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] for an unknown user or a wrong secret
    /// - [`AuthError::StoreUnavailable`] if the lookup fails or misses the deadline
    pub async fn verify_with_deadline(
        &self,
        username: &str,
        secret: &str,
        deadline: Option<Instant>,
    ) -> Result<Identity> {
        let record = match self.lookup(username, deadline).await {
            Ok(record) => record,
            Err(err) => {
                security_event!(
                    SecurityEvent::StoreUnavailable,
                    username = %username,
                    error = %err,
                    "User store lookup failed"
                );
                return Err(err.into());
            }
        };

        let matched = match record {
            Some(record) => self.check_record(&record, secret),
            None => {
                self.burn_dummy(secret);
                None
            }
        };

        match matched {
            Some(identity) => {
                security_event!(
                    SecurityEvent::AuthenticationSuccess,
                    username = %username,
                    subject_id = %identity.subject_id,
                    "Authentication succeeded"
                );
                Ok(identity)
            }
            None => {
                security_event!(
                    SecurityEvent::AuthenticationFailure,
                    username = %username,
                    reason = "invalid_credentials",
                    "Authentication failed"
                );
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    async fn lookup(
        &self,
        username: &str,
        deadline: Option<Instant>,
    ) -> std::result::Result<Option<CredentialRecord>, StoreError> {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.store.lookup(username))
                .await
                .map_err(|_| StoreError::DeadlineExceeded)?,
            None => self.store.lookup(username).await,
        }
    }

    /// Hash and compare; `None` on mismatch or an unusable record
    fn check_record(&self, record: &CredentialRecord, secret: &str) -> Option<Identity> {
        match self
            .hasher
            .matches(secret.as_bytes(), &record.salt, &record.secret_hash)
        {
            Ok(true) => Some(record.identity()),
            Ok(false) => None,
            Err(err) => {
                tracing::warn!(
                    username = %record.username,
                    error = %err,
                    "Stored credential could not be hashed"
                );
                self.burn_dummy(secret);
                None
            }
        }
    }

    /// Same work as a real comparison; the result is discarded
    fn burn_dummy(&self, secret: &str) {
        let _ = self
            .hasher
            .matches(secret.as_bytes(), &self.dummy_salt, &self.dummy_hash);
    }
}
