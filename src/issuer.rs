//! Token Issuance
//!
//! Signs a versioned claim set with the active key of the [`Keyring`].
//! Tokens are stateless; nothing about an issued token is recorded.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::claims::{self, ClaimSet, CLAIMS_VERSION};
use crate::clock::{truncate_to_millis, unix_millis, Clock, SystemClock};
use crate::config::TtlPolicy;
use crate::error::{AuthError, Result};
use crate::keys::Keyring;
use crate::observability::SecurityEvent;
use crate::principal::{Identity, Principal};
use crate::security_event;

/// An issued session token
///
/// `Debug` shows only a prefix; use [`Token::as_str`] to hand the full value
/// to the client.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// The encoded token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the encoded token
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "Token({}...)", prefix)
    }
}

/// Creates signed, time-bounded tokens
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    keyring: Arc<Keyring>,
    ttl: TtlPolicy,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Create an issuer using the system clock
    pub fn new(keyring: Arc<Keyring>, ttl: TtlPolicy) -> Self {
        Self::with_clock(keyring, ttl, Arc::new(SystemClock))
    }

    /// Create an issuer reading time from `clock`
    pub fn with_clock(keyring: Arc<Keyring>, ttl: TtlPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            keyring,
            ttl,
            clock,
        }
    }

    /// Lifetime bounds in force
    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Issue a token for `identity` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidConfiguration`] if `ttl` is outside the policy
    /// bounds; no token is produced.
    pub fn issue(&self, identity: &impl AsRef<Identity>, ttl: Duration) -> Result<Token> {
        self.issue_with_principal(identity, ttl).map(|(token, _)| token)
    }

    /// Issue a token valid for the default ttl
    pub fn issue_default(&self, identity: &impl AsRef<Identity>) -> Result<Token> {
        self.issue(identity, self.ttl.default_ttl)
    }

    /// Issue a token and return the principal it carries
    pub fn issue_with_principal(
        &self,
        identity: &impl AsRef<Identity>,
        ttl: Duration,
    ) -> Result<(Token, Principal)> {
        let identity = identity.as_ref();
        let ttl = self.ttl.check(ttl)?;

        let issued_at = truncate_to_millis(self.clock.now());
        let expires_at = issued_at
            .checked_add(ttl)
            .map(truncate_to_millis)
            .ok_or_else(|| AuthError::config("token expiry overflows the clock"))?;
        let principal = Principal::new(identity.clone(), issued_at, expires_at)
            .ok_or_else(|| AuthError::config("token lifetime rounds to zero"))?;

        let key = self.keyring.active();
        let claims = ClaimSet {
            v: CLAIMS_VERSION,
            kid: key.key_id().to_string(),
            sub: identity.subject_id.clone(),
            usr: identity.username.clone(),
            eml: identity.email.clone(),
            iat: unix_millis(issued_at),
            exp: unix_millis(expires_at),
        };
        let token = Token(claims::seal(&claims, key)?);

        security_event!(
            SecurityEvent::TokenIssued,
            subject_id = %identity.subject_id,
            key_id = %key.key_id(),
            ttl_ms = ttl.as_millis() as u64,
            "Token issued"
        );

        Ok((token, principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SigningKey;
    use crate::testing::ManualClock;

    fn issuer(clock: Arc<ManualClock>) -> TokenIssuer {
        let keyring = Arc::new(Keyring::new(SigningKey::generate("primary", 32)));
        TokenIssuer::with_clock(keyring, TtlPolicy::default(), clock)
    }

    fn admin() -> Identity {
        Identity::new(1i64, "admin", "admin@example.com")
    }

    #[test]
    fn test_issue_embeds_lifetime() {
        let clock = Arc::new(ManualClock::fixed());
        let (token, principal) = issuer(clock.clone())
            .issue_with_principal(&admin(), Duration::from_secs(3600))
            .unwrap();

        assert!(token.as_str().contains('.'));
        assert_eq!(principal.identity(), &admin());
        assert_eq!(principal.issued_at(), clock.now());
        assert_eq!(principal.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_ttl_outside_bounds_is_rejected() {
        let issuer = issuer(Arc::new(ManualClock::fixed()));
        for ttl in [Duration::ZERO, Duration::from_millis(500), Duration::from_secs(86_401)] {
            assert!(matches!(
                issuer.issue(&admin(), ttl),
                Err(AuthError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_issue_default_uses_default_ttl() {
        let clock = Arc::new(ManualClock::fixed());
        let issuer = issuer(clock);
        let token = issuer.issue_default(&admin()).unwrap();
        let claims = crate::claims::Unverified::parse(token.as_str()).unwrap().claims;
        assert_eq!(claims.exp - claims.iat, 3_600_000);
        assert_eq!(claims.kid, "primary");
    }

    #[test]
    fn test_sub_millisecond_clock_is_truncated() {
        let clock = Arc::new(ManualClock::fixed());
        clock.advance(Duration::from_micros(1_500));
        let (_, principal) = issuer(clock)
            .issue_with_principal(&admin(), Duration::from_secs(1))
            .unwrap();
        assert_eq!(principal.ttl(), Duration::from_secs(1));
        assert_eq!(
            principal.issued_at(),
            ManualClock::fixed().now() + Duration::from_millis(1)
        );
    }

    #[test]
    fn test_debug_truncates_token() {
        let token = issuer(Arc::new(ManualClock::fixed()))
            .issue_default(&admin())
            .unwrap();
        let debug = format!("{:?}", token);
        assert!(debug.len() < token.as_str().len());
        assert!(debug.starts_with("Token("));
    }
}
