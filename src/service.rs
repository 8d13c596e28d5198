//! Login Service
//!
//! [`Gatehouse`] wires the verifier, issuer, and validator together for the
//! HTTP layer that fronts them:
//!
//! - login: verify credentials, then issue a token
//! - route guard: validate the presented token
//! - logout: validate and record; tokens are stateless, so the client simply
//!   discards theirs
//!
//! # Usage
//!
//! ```ignore
//! use gatehouse::{Gatehouse, GatehouseConfig, InMemoryUserStore};
//!
//! let gatehouse = Gatehouse::from_config(GatehouseConfig::from_env()?, Arc::new(store))?;
//!
//! // POST /auth/login
//! let response = gatehouse.login(&body.username, &body.password, None).await?;
//!
//! // Authenticated routes
//! let principal = gatehouse.authenticate_bearer(headers.get("authorization"))?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::clock::{unix_millis, Clock, SystemClock};
use crate::config::GatehouseConfig;
use crate::credential::SecretHasher;
use crate::error::{AuthError, Result};
use crate::issuer::TokenIssuer;
use crate::observability::SecurityEvent;
use crate::principal::{Identity, Principal};
use crate::security_event;
use crate::store::UserStore;
use crate::validator::TokenValidator;
use crate::verifier::CredentialVerifier;

/// Body returned by a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    /// Signed session token
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: &'static str,
    /// Token expiry, Unix milliseconds
    pub expires_at: i64,
    /// Seconds until expiry
    pub expires_in: u64,
    /// The authenticated user
    pub user: Identity,
}

/// Authentication service facade
#[derive(Debug, Clone)]
pub struct Gatehouse {
    verifier: CredentialVerifier,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl Gatehouse {
    /// Build the service from validated configuration
    pub fn from_config(config: GatehouseConfig, store: Arc<dyn UserStore>) -> Result<Self> {
        Self::from_config_with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build the service with an explicit clock
    pub fn from_config_with_clock(
        config: GatehouseConfig,
        store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if let Err(err) = config.validate() {
            security_event!(
                SecurityEvent::ConfigurationRejected,
                error = %err,
                "Configuration rejected"
            );
            return Err(err);
        }

        let mut verifier = CredentialVerifier::new(store, SecretHasher::new(config.hash_params)?)?;
        if let Some(timeout) = config.store_timeout {
            verifier = verifier.with_store_timeout(timeout);
        }

        let keyring = Arc::new(config.keyring);
        let issuer = TokenIssuer::with_clock(keyring.clone(), config.ttl, clock.clone());
        let validator = TokenValidator::with_clock(keyring.clone(), clock);

        security_event!(
            SecurityEvent::SystemStartup,
            active_key = %keyring.active().key_id(),
            key_count = keyring.key_ids().len(),
            default_ttl_secs = config.ttl.default_ttl.as_secs(),
            environment = %config.environment,
            "Gatehouse initialized"
        );

        Ok(Self {
            verifier,
            issuer,
            validator,
        })
    }

    /// The credential verifier
    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    /// The token issuer
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// The token validator
    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Verify credentials and issue a token (`ttl` defaults to the
    /// configured default).
    ///
    /// The ttl is checked before the store is consulted.
    pub async fn login(
        &self,
        username: &str,
        secret: &str,
        ttl: Option<Duration>,
    ) -> Result<LoginResponse> {
        let ttl = self
            .issuer
            .ttl_policy()
            .check(ttl.unwrap_or(self.issuer.ttl_policy().default_ttl))?;

        let identity = self.verifier.verify(username, secret).await?;
        let (token, principal) = self.issuer.issue_with_principal(&identity, ttl)?;

        Ok(LoginResponse {
            access_token: token.into_string(),
            token_type: "Bearer",
            expires_at: unix_millis(principal.expires_at()),
            expires_in: principal.ttl().as_secs(),
            user: identity,
        })
    }

    /// Validate a raw token
    pub fn authenticate(&self, token: &str) -> Result<Principal> {
        self.validator.validate(token)
    }

    /// Validate the token in an `Authorization` header value.
    ///
    /// A missing header or a scheme other than `Bearer` is
    /// [`AuthError::Malformed`].
    pub fn authenticate_bearer(&self, authorization: Option<&str>) -> Result<Principal> {
        let header = authorization.ok_or(AuthError::Malformed("missing authorization header"))?;
        let token = bearer_token(header).ok_or(AuthError::Malformed("expected bearer token"))?;
        self.authenticate(token)
    }

    /// Record a logout.
    ///
    /// The token must still be valid. Nothing is revoked: the token stays
    /// valid until it expires.
    pub fn logout(&self, token: &str) -> Result<Principal> {
        let principal = self.authenticate(token)?;
        security_event!(
            SecurityEvent::Logout,
            subject_id = %principal.subject_id(),
            username = %principal.username(),
            "User logged out"
        );
        Ok(principal)
    }
}

/// Extract the credentials of a `Bearer` authorization header
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TtlPolicy;
    use crate::credential::HashParams;
    use crate::key_policy::KeyPolicy;
    use crate::principal::SubjectId;
    use crate::store::InMemoryUserStore;
    use crate::testing::ManualClock;

    fn store() -> Arc<dyn UserStore> {
        let hasher = SecretHasher::new(HashParams::insecure_fast()).unwrap();
        Arc::new(
            InMemoryUserStore::new()
                .with_user(&hasher, 1i64, "admin", "admin@example.com", "password")
                .unwrap(),
        )
    }

    fn config() -> GatehouseConfig {
        GatehouseConfig::builder(KeyPolicy::for_environment("development").generate("primary"))
            .hash_params(HashParams::insecure_fast())
            .build()
            .unwrap()
    }

    fn gatehouse(clock: Arc<ManualClock>) -> Gatehouse {
        Gatehouse::from_config_with_clock(config(), store(), clock).unwrap()
    }

    #[tokio::test]
    async fn test_admin_scenario() {
        let clock = Arc::new(ManualClock::fixed());
        let gh = gatehouse(clock.clone());

        let response = gh
            .login("admin", "password", Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);
        assert_eq!(response.user.subject_id, SubjectId::Numeric(1));

        let principal = gh.authenticate(&response.access_token).unwrap();
        assert_eq!(principal.identity(), &response.user);
        assert_eq!(unix_millis(principal.expires_at()), response.expires_at);
        assert_eq!(principal.issued_at(), clock.now());

        assert_eq!(
            gh.login("admin", "wrong", None).await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_login_ttl_checked_first() {
        let gh = gatehouse(Arc::new(ManualClock::fixed()));
        let result = gh
            .login("admin", "password", Some(Duration::from_secs(90_000)))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_login_response_json() {
        let gh = gatehouse(Arc::new(ManualClock::fixed()));
        let response = gh.login("admin", "password", None).await.unwrap();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["expires_in"], TtlPolicy::default().default_ttl.as_secs());
        assert_eq!(json["user"]["id"], 1);
        assert_eq!(json["user"]["username"], "admin");
        assert!(json["user"].get("secret_hash").is_none());
    }

    #[tokio::test]
    async fn test_authenticate_bearer() {
        let gh = gatehouse(Arc::new(ManualClock::fixed()));
        let token = gh.login("admin", "password", None).await.unwrap().access_token;

        let header = format!("Bearer {}", token);
        assert_eq!(gh.authenticate_bearer(Some(&header)).unwrap().username(), "admin");

        let lower = format!("bearer {}", token);
        assert!(gh.authenticate_bearer(Some(&lower)).is_ok());

        assert_eq!(
            gh.authenticate_bearer(None),
            Err(AuthError::Malformed("missing authorization header"))
        );
        assert_eq!(
            gh.authenticate_bearer(Some(&format!("Basic {}", token))),
            Err(AuthError::Malformed("expected bearer token"))
        );
        assert_eq!(
            gh.authenticate_bearer(Some("Bearer ")),
            Err(AuthError::Malformed("expected bearer token"))
        );
    }

    #[tokio::test]
    async fn test_logout_is_stateless() {
        let clock = Arc::new(ManualClock::fixed());
        let gh = gatehouse(clock.clone());
        let token = gh
            .login("admin", "password", Some(Duration::from_secs(60)))
            .await
            .unwrap()
            .access_token;

        assert!(gh.logout(&token).is_ok());
        // Still valid after logout
        assert!(gh.authenticate(&token).is_ok());

        clock.advance(Duration::from_secs(60));
        assert_eq!(gh.logout(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config();
        config.ttl = TtlPolicy {
            min_ttl: Duration::from_secs(10),
            max_ttl: Duration::from_secs(5),
            default_ttl: Duration::from_secs(7),
        };
        assert!(matches!(
            Gatehouse::from_config(config, store()),
            Err(AuthError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("  BEARER   abc  "), Some("abc"));
        assert_eq!(bearer_token("Token abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    #[test]
    fn test_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Gatehouse>();
    }
}
