//! # Gatehouse
//!
//! Credential verification and stateless session tokens.
//!
//! The crate is the core behind a login endpoint: it checks a username and
//! secret against a stored salted hash, issues a signed, time-bounded token,
//! and later validates that token back into the authenticated principal.
//! HTTP routing, user storage, and UI belong to the surrounding application.
//!
//! ## Features
//!
//! - **Credential Verification**: Argon2id with per-record salts, constant-time
//!   comparison, equal work for unknown users
//! - **Token Issuance**: versioned claims signed with HMAC-SHA256, bounded ttl
//! - **Token Validation**: pure function of token, time, and keyring
//! - **Key Management**: active + retired keys, environment-aware strength checks
//! - **Structured Logging**: security audit events through `tracing`
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use gatehouse::{Gatehouse, GatehouseConfig, InMemoryUserStore, SecretHasher};
//! use gatehouse::observability::{init, ObservabilityConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init(ObservabilityConfig::from_env())?;
//!
//!     let config = GatehouseConfig::from_env()?;
//!     let hasher = SecretHasher::new(config.hash_params)?;
//!     let store = InMemoryUserStore::new()
//!         .with_user(&hasher, 1i64, "admin", "admin@example.com", "password")?;
//!
//!     let gatehouse = Gatehouse::from_config(config, Arc::new(store))?;
//!
//!     let login = gatehouse.login("admin", "password", None).await?;
//!     let principal = gatehouse.authenticate(&login.access_token)?;
//!     assert_eq!(principal.username(), "admin");
//!     Ok(())
//! }
//! ```

mod claims;
pub mod clock;
mod config;
pub mod credential;
mod crypto;
mod error;
mod issuer;
pub mod key_policy;
pub mod keys;
pub mod observability;
mod parse;
mod principal;
mod service;
pub mod store;
pub mod testing;
mod validator;
mod verifier;

// Re-exports
pub use claims::CLAIMS_VERSION;
pub use clock::{Clock, SystemClock};
pub use config::{GatehouseConfig, GatehouseConfigBuilder, TtlPolicy};
pub use credential::{CredentialRecord, HashParams, SecretHasher};
pub use crypto::constant_time_eq;
pub use error::{AuthError, Rejection, Result};
pub use issuer::{Token, TokenIssuer};
pub use key_policy::{KeyPolicy, KeyPolicyError};
pub use keys::{Keyring, SigningKey};
pub use parse::parse_duration;
pub use principal::{Identity, Principal, SubjectId};
pub use service::{bearer_token, Gatehouse, LoginResponse};
pub use store::{InMemoryUserStore, StoreError, UserStore};
pub use validator::TokenValidator;
pub use verifier::CredentialVerifier;
