//! Token Signing Keys
//!
//! The signing key is loaded once at startup and shared read-only by the
//! issuer and validator. A [`Keyring`] holds the active key plus any retired
//! keys that tokens may still be signed with, so a key can be replaced by
//! changing configuration alone:
//!
//! ```ignore
//! use gatehouse::keys::{Keyring, SigningKey};
//!
//! let active = SigningKey::from_base64("2024-06", &std::env::var("GATEHOUSE_SIGNING_KEY")?)?;
//! let retired = SigningKey::from_base64("2024-01", &old_key_b64)?;
//!
//! let ring = Keyring::new(active).with_retired(retired)?;
//! ```
//!
//! New tokens are always signed with the active key and carry its key id;
//! validation looks the key up by that id.

use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AuthError, Result};

/// Symmetric signing key material
///
/// Bytes are zeroed on drop and never appear in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    #[zeroize(skip)]
    key_id: String,
    bytes: Vec<u8>,
}

impl SigningKey {
    /// Wrap raw key bytes
    pub fn new(key_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            key_id: key_id.into(),
            bytes,
        }
    }

    /// Decode key bytes from standard base64
    pub fn from_base64(key_id: impl Into<String>, encoded: &str) -> Result<Self> {
        let key_id = key_id.into();
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AuthError::config(format!("signing key '{}' is not valid base64: {}", key_id, e)))?;
        Ok(Self::new(key_id, bytes))
    }

    /// Generate a random key of `len` bytes
    pub fn generate(key_id: impl Into<String>, len: usize) -> Self {
        Self::new(key_id, crate::crypto::random_bytes(len))
    }

    /// Key identifier embedded in tokens
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Base64 encoding of the key bytes (for provisioning)
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// Key length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Active signing key plus retired verification-only keys
#[derive(Debug, Clone)]
pub struct Keyring {
    active: SigningKey,
    retired: HashMap<String, SigningKey>,
}

impl Keyring {
    /// Create a ring with a single active key
    pub fn new(active: SigningKey) -> Self {
        Self {
            active,
            retired: HashMap::new(),
        }
    }

    /// Add a key that is accepted for validation but never used to sign.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidConfiguration`] if the id is already in the ring,
    /// either as the active key or as another retired key.
    pub fn with_retired(mut self, key: SigningKey) -> Result<Self> {
        if key.key_id() == self.active.key_id() {
            return Err(AuthError::config(format!(
                "retired key id '{}' collides with active key",
                key.key_id()
            )));
        }
        if self.retired.contains_key(key.key_id()) {
            return Err(AuthError::config(format!(
                "duplicate retired key id '{}'",
                key.key_id()
            )));
        }
        self.retired.insert(key.key_id().to_string(), key);
        Ok(self)
    }

    /// The key new tokens are signed with
    pub fn active(&self) -> &SigningKey {
        &self.active
    }

    /// Find a key by id (active or retired)
    pub fn get(&self, key_id: &str) -> Option<&SigningKey> {
        if self.active.key_id() == key_id {
            Some(&self.active)
        } else {
            self.retired.get(key_id)
        }
    }

    /// Ids of all keys in the ring, active first
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.active.key_id()];
        let mut retired: Vec<&str> = self.retired.keys().map(String::as_str).collect();
        retired.sort_unstable();
        ids.extend(retired);
        ids
    }
}
