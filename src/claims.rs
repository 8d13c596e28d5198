//! Versioned claim schema and token wire format
//!
//! A token is two base64url (unpadded) segments joined by `.`:
//!
//! ```text
//! base64url(claims_json) "." base64url(HMAC-SHA256(key, claims_json))
//! ```
//!
//! `claims_json` is the canonical serialization of [`ClaimSet`]: fields
//! always in the order `v, kid, sub, usr, eml, iat, exp`, timestamps in Unix
//! milliseconds. The signature covers every byte of it.
//!
//! Decoders check `v` before anything else. Unknown versions are rejected;
//! unknown extra fields within a known version are ignored so an issuer can
//! add fields without breaking older validators.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::{AuthError, Result};
use crate::keys::{Keyring, SigningKey};
use crate::principal::SubjectId;

/// Claim schema version written by this crate
pub const CLAIMS_VERSION: u32 = 1;

/// Claims carried by a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ClaimSet {
    pub v: u32,
    pub kid: String,
    pub sub: SubjectId,
    pub usr: String,
    pub eml: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct VersionHeader {
    v: Option<u32>,
}

/// Serialize and sign `claims` with `key`
pub(crate) fn seal(claims: &ClaimSet, key: &SigningKey) -> Result<String> {
    let payload = serde_json::to_vec(claims)
        .map_err(|e| AuthError::config(format!("failed to encode claims: {}", e)))?;
    let signature = crypto::sign(key.as_bytes(), &payload);
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&payload),
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// A parsed token whose signature has not been checked yet
#[derive(Debug)]
pub(crate) struct Unverified {
    pub claims: ClaimSet,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

impl Unverified {
    /// Split and decode a token.
    ///
    /// Fails with [`AuthError::Malformed`] if either segment is missing or not
    /// base64url, the claims are not JSON, the version is unknown, a field
    /// is missing, or `exp <= iat`.
    pub fn parse(token: &str) -> Result<Self> {
        let (payload_b64, signature_b64) = token
            .split_once('.')
            .ok_or(AuthError::Malformed("expected two segments"))?;
        if payload_b64.is_empty() || signature_b64.is_empty() {
            return Err(AuthError::Malformed("empty segment"));
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::Malformed("claims segment is not base64url"))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::Malformed("signature segment is not base64url"))?;

        let header: VersionHeader = serde_json::from_slice(&payload)
            .map_err(|_| AuthError::Malformed("claims are not a JSON object"))?;
        match header.v {
            Some(CLAIMS_VERSION) => {}
            Some(_) => return Err(AuthError::Malformed("unsupported claims version")),
            None => return Err(AuthError::Malformed("missing claims version")),
        }

        let claims: ClaimSet = serde_json::from_slice(&payload)
            .map_err(|_| AuthError::Malformed("missing or invalid claim fields"))?;
        if claims.exp <= claims.iat {
            return Err(AuthError::Malformed("expiry not after issue time"));
        }

        Ok(Self {
            claims,
            payload,
            signature,
        })
    }

    /// Check the signature with the key named by `kid`.
    ///
    /// An unknown key id is a [`AuthError::BadSignature`]: the token was not
    /// signed by any key this process trusts.
    pub fn verify(self, keyring: &Keyring) -> Result<ClaimSet> {
        let key = keyring
            .get(&self.claims.kid)
            .ok_or(AuthError::BadSignature)?;
        if crypto::verify_signature(key.as_bytes(), &self.payload, &self.signature) {
            Ok(self.claims)
        } else {
            Err(AuthError::BadSignature)
        }
    }
}
