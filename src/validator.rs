//! Token Validation
//!
//! Validation is a pure function of the token, the current time, and the
//! keyring. Checks run in a fixed order and stop at the first failure:
//!
//! 1. parse: two base64url segments, known claims version, all fields
//!    present, `exp > iat` ([`AuthError::Malformed`])
//! 2. signature under the key named by the token's key id
//!    ([`AuthError::BadSignature`])
//! 3. `exp > now` ([`AuthError::Expired`])
//!
//! and then rebuild the [`Principal`].

use std::sync::Arc;
use std::time::SystemTime;

use crate::claims::Unverified;
use crate::clock::{from_unix_millis, Clock, SystemClock};
use crate::error::{AuthError, Result};
use crate::keys::Keyring;
use crate::observability::SecurityEvent;
use crate::principal::{Identity, Principal};
use crate::security_event;

/// Verifies tokens and reconstructs the principal they carry
#[derive(Debug, Clone)]
pub struct TokenValidator {
    keyring: Arc<Keyring>,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    /// Create a validator using the system clock
    pub fn new(keyring: Arc<Keyring>) -> Self {
        Self::with_clock(keyring, Arc::new(SystemClock))
    }

    /// Create a validator reading time from `clock`
    pub fn with_clock(keyring: Arc<Keyring>, clock: Arc<dyn Clock>) -> Self {
        Self { keyring, clock }
    }

    /// Validate `token` against the current time
    pub fn validate(&self, token: &str) -> Result<Principal> {
        self.validate_at(token, self.clock.now())
    }

    /// Validate `token` as of `now`
    pub fn validate_at(&self, token: &str, now: SystemTime) -> Result<Principal> {
        let result = check(&self.keyring, token, now);
        if let Err(err) = &result {
            security_event!(
                SecurityEvent::TokenRejected,
                reason = err.code(),
                "Token rejected"
            );
        }
        result
    }
}

fn check(keyring: &Keyring, token: &str, now: SystemTime) -> Result<Principal> {
    let claims = Unverified::parse(token)?.verify(keyring)?;

    let issued_at =
        from_unix_millis(claims.iat).ok_or(AuthError::Malformed("issue time before epoch"))?;
    let expires_at =
        from_unix_millis(claims.exp).ok_or(AuthError::Malformed("expiry before epoch"))?;

    if expires_at <= now {
        return Err(AuthError::Expired);
    }

    let identity = Identity {
        subject_id: claims.sub,
        username: claims.usr,
        email: claims.eml,
    };
    Principal::new(identity, issued_at, expires_at)
        .ok_or(AuthError::Malformed("expiry not after issue time"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    use crate::config::TtlPolicy;
    use crate::issuer::TokenIssuer;
    use crate::keys::SigningKey;
    use crate::testing::ManualClock;

    struct Fixture {
        clock: Arc<ManualClock>,
        issuer: TokenIssuer,
        validator: TokenValidator,
    }

    fn fixture_with(keyring: Keyring) -> Fixture {
        let keyring = Arc::new(keyring);
        let clock = Arc::new(ManualClock::fixed());
        Fixture {
            issuer: TokenIssuer::with_clock(keyring.clone(), TtlPolicy::default(), clock.clone()),
            validator: TokenValidator::with_clock(keyring, clock.clone()),
            clock,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Keyring::new(SigningKey::generate("primary", 32)))
    }

    fn admin() -> Identity {
        Identity::new(1i64, "admin", "admin@example.com")
    }

    fn with_signature(token: &str, f: impl FnOnce(&mut Vec<u8>)) -> String {
        let (claims, sig) = token.split_once('.').unwrap();
        let mut bytes = URL_SAFE_NO_PAD.decode(sig).unwrap();
        f(&mut bytes);
        format!("{}.{}", claims, URL_SAFE_NO_PAD.encode(bytes))
    }

    #[test]
    fn test_round_trip_equal_principal() {
        let fx = fixture();
        let (token, issued) = fx
            .issuer
            .issue_with_principal(&admin(), Duration::from_secs(3600))
            .unwrap();

        let validated = fx.validator.validate(token.as_str()).unwrap();
        assert_eq!(validated, issued);
        assert_eq!(validated.identity(), &admin());
    }

    #[test]
    fn test_round_trip_system_clock() {
        let keyring = Arc::new(Keyring::new(SigningKey::generate("primary", 32)));
        let issuer = TokenIssuer::new(keyring.clone(), TtlPolicy::default());
        let validator = TokenValidator::new(keyring);

        let (token, issued) = issuer
            .issue_with_principal(&admin(), Duration::from_secs(3600))
            .unwrap();
        assert_eq!(validator.validate(token.as_str()).unwrap(), issued);
    }

    #[test]
    fn test_every_signature_byte_flip_is_bad_signature() {
        let fx = fixture();
        let token = fx.issuer.issue_default(&admin()).unwrap();

        for i in 0..crate::crypto::SIGNATURE_LEN {
            for mask in [0x01u8, 0x80, 0xff] {
                let tampered = with_signature(token.as_str(), |sig| sig[i] ^= mask);
                assert_eq!(
                    fx.validator.validate(&tampered),
                    Err(AuthError::BadSignature),
                    "byte {} mask {:#x}",
                    i,
                    mask
                );
            }
        }
    }

    #[test]
    fn test_truncated_signature_is_bad_signature() {
        let fx = fixture();
        let token = fx.issuer.issue_default(&admin()).unwrap();
        let tampered = with_signature(token.as_str(), |sig| sig.truncate(16));
        assert_eq!(fx.validator.validate(&tampered), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_altered_claims_are_bad_signature() {
        let fx = fixture();
        let token = fx.issuer.issue_default(&admin()).unwrap();
        let (claims, sig) = token.as_str().split_once('.').unwrap();

        let json = String::from_utf8(URL_SAFE_NO_PAD.decode(claims).unwrap()).unwrap();
        let forged = json.replace("\"usr\":\"admin\"", "\"usr\":\"root\"");
        assert_ne!(json, forged);

        let tampered = format!("{}.{}", URL_SAFE_NO_PAD.encode(forged), sig);
        assert_eq!(fx.validator.validate(&tampered), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_one_second_ttl_expires() {
        let fx = fixture();
        let token = fx.issuer.issue(&admin(), Duration::from_secs(1)).unwrap();

        assert!(fx.validator.validate(token.as_str()).is_ok());

        fx.clock.advance(Duration::from_millis(999));
        assert!(fx.validator.validate(token.as_str()).is_ok());

        fx.clock.advance(Duration::from_millis(1));
        assert_eq!(fx.validator.validate(token.as_str()), Err(AuthError::Expired));
    }

    #[tokio::test]
    async fn test_one_second_ttl_expires_in_real_time() {
        let keyring = Arc::new(Keyring::new(SigningKey::generate("primary", 32)));
        let issuer = TokenIssuer::new(keyring.clone(), TtlPolicy::default());
        let validator = TokenValidator::new(keyring);

        let token = issuer.issue(&admin(), Duration::from_secs(1)).unwrap();
        assert!(validator.validate(token.as_str()).is_ok());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(validator.validate(token.as_str()), Err(AuthError::Expired));
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let fx = fixture();
        let token = fx.issuer.issue(&admin(), Duration::from_secs(1)).unwrap();
        fx.clock.advance(Duration::from_secs(10));

        let tampered = with_signature(token.as_str(), |sig| sig[0] ^= 1);
        assert_eq!(fx.validator.validate(&tampered), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_retired_key_still_validates() {
        let old = SigningKey::generate("2024-01", 32);
        let old_issuer = TokenIssuer::with_clock(
            Arc::new(Keyring::new(old.clone())),
            TtlPolicy::default(),
            Arc::new(ManualClock::fixed()),
        );
        let token = old_issuer.issue_default(&admin()).unwrap();

        let fx = fixture_with(
            Keyring::new(SigningKey::generate("2024-06", 32))
                .with_retired(old)
                .unwrap(),
        );
        assert!(fx.validator.validate(token.as_str()).is_ok());

        // New tokens use the active key
        let fresh = fx.issuer.issue_default(&admin()).unwrap();
        let claims = Unverified::parse(fresh.as_str()).unwrap().claims;
        assert_eq!(claims.kid, "2024-06");
    }

    #[test]
    fn test_foreign_key_rejected() {
        let other = fixture();
        let token = other.issuer.issue_default(&admin()).unwrap();
        assert_eq!(fixture().validator.validate(token.as_str()), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let fx = fixture();
        for garbage in ["", ".", "abc", "a.b", "!!!.???", "eyJ2IjoxfQ.AAAA"] {
            assert!(
                matches!(fx.validator.validate(garbage), Err(AuthError::Malformed(_))),
                "{:?}",
                garbage
            );
        }
    }

    #[test]
    fn test_concurrent_validation() {
        let fx = fixture();
        let token = fx.issuer.issue_default(&admin()).unwrap();
        let validator = fx.validator.clone();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let validator = &validator;
                    let token = token.as_str();
                    s.spawn(move || {
                        for _ in 0..50 {
                            assert!(validator.validate(token).is_ok());
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    }
}
