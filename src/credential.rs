//! Stored credentials and salted slow hashing
//!
//! Secrets are never stored or compared in plaintext. A [`CredentialRecord`]
//! holds `Argon2id(secret, salt)` and the per-record random salt; checking a
//! supplied secret recomputes the hash and compares it in constant time.
//!
//! Cost parameters come from [`HashParams`]. Every comparison with the same
//! parameters does the same amount of work, which is what lets the verifier
//! hide whether a username exists.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::{AuthError, Result};
use crate::principal::{Identity, SubjectId};

/// Salt length used for new records
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
    /// Hash output length in bytes
    pub output_len: usize,
}

impl Default for HashParams {
    /// OWASP-recommended Argon2id baseline (19 MiB, 2 passes, 1 lane)
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
            output_len: 32,
        }
    }
}

impl HashParams {
    /// Cheap parameters for tests. Never use in production.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
            output_len: 32,
        }
    }

    fn to_argon2(self) -> Result<Params> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(self.output_len),
        )
        .map_err(|e| AuthError::config(format!("invalid hash parameters: {}", e)))
    }
}

/// A user's stored credential, as returned by the user store
///
/// `secret_hash` and `salt` never leave the verifier and are redacted from
/// `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Stable subject identifier
    pub subject_id: SubjectId,
    /// Unique login name
    pub username: String,
    /// `Argon2id(secret, salt)`
    pub secret_hash: Vec<u8>,
    /// Per-record random salt
    pub salt: Vec<u8>,
    /// Contact email
    pub email: String,
}

impl CredentialRecord {
    /// The non-secret fields
    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.subject_id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("subject_id", &self.subject_id)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Argon2id hasher bound to one set of cost parameters
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
    params: HashParams,
}

impl fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHasher")
            .field("params", &self.params)
            .finish()
    }
}

impl SecretHasher {
    /// Create a hasher; fails if Argon2 rejects the parameters
    pub fn new(params: HashParams) -> Result<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
        Ok(Self { argon2, params })
    }

    /// The cost parameters in use
    pub fn params(&self) -> HashParams {
        self.params
    }

    /// Compute `Argon2id(secret, salt)`
    pub fn hash(&self, secret: &[u8], salt: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.params.output_len];
        self.argon2
            .hash_password_into(secret, salt, &mut out)
            .map_err(|e| AuthError::config(format!("hashing failed: {}", e)))?;
        Ok(out)
    }

    /// Hash `secret` under `salt` and compare against `expected` in constant time
    pub fn matches(&self, secret: &[u8], salt: &[u8], expected: &[u8]) -> Result<bool> {
        let computed = self.hash(secret, salt)?;
        Ok(crypto::constant_time_eq(&computed, expected))
    }

    /// Generate a fresh random salt
    pub fn generate_salt() -> Vec<u8> {
        crypto::random_bytes(SALT_LEN)
    }

    /// Build a record for `secret` with a fresh salt (for seeding stores)
    pub fn create_record(
        &self,
        subject_id: impl Into<SubjectId>,
        username: impl Into<String>,
        email: impl Into<String>,
        secret: &str,
    ) -> Result<CredentialRecord> {
        let salt = Self::generate_salt();
        let secret_hash = self.hash(secret.as_bytes(), &salt)?;
        Ok(CredentialRecord {
            subject_id: subject_id.into(),
            username: username.into(),
            secret_hash,
            salt,
            email: email.into(),
        })
    }
}
