//! Service configuration
//!
//! Provides a builder-pattern configuration for the verifier, issuer, and
//! validator, and a loader for environment variables.
//!
//! # Example
//!
//! ```ignore
//! use gatehouse::GatehouseConfig;
//!
//! // Load from environment variables
//! let config = GatehouseConfig::from_env()?;
//!
//! // Or build programmatically
//! let config = GatehouseConfig::builder(signing_key)
//!     .ttl(Duration::from_secs(60), Duration::from_secs(3600), Duration::from_secs(86400))
//!     .store_timeout(Duration::from_secs(2))
//!     .build()?;
//! ```

use std::time::Duration;

use crate::credential::HashParams;
use crate::error::{AuthError, Result};
use crate::key_policy::KeyPolicy;
use crate::keys::{Keyring, SigningKey};
use crate::parse::parse_duration;

/// Token lifetime bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Shortest lifetime a caller may request
    pub min_ttl: Duration,
    /// Longest lifetime a caller may request
    pub max_ttl: Duration,
    /// Lifetime used when the caller doesn't ask for one
    pub default_ttl: Duration,
}

impl Default for TtlPolicy {
    /// 1 second minimum, 1 hour default, 24 hour maximum
    fn default() -> Self {
        Self {
            min_ttl: Duration::from_secs(1),
            max_ttl: Duration::from_secs(24 * 60 * 60),
            default_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl TtlPolicy {
    /// Create bounds; see [`TtlPolicy::validate`] for the rules
    pub fn new(min_ttl: Duration, default_ttl: Duration, max_ttl: Duration) -> Result<Self> {
        let policy = Self {
            min_ttl,
            max_ttl,
            default_ttl,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Require `0 < min_ttl <= default_ttl <= max_ttl` with at least
    /// millisecond resolution for the minimum.
    pub fn validate(&self) -> Result<()> {
        if self.min_ttl < Duration::from_millis(1) {
            return Err(AuthError::config("min_ttl must be at least 1ms"));
        }
        if self.min_ttl > self.max_ttl {
            return Err(AuthError::config(format!(
                "min_ttl ({:?}) exceeds max_ttl ({:?})",
                self.min_ttl, self.max_ttl
            )));
        }
        if !self.contains(self.default_ttl) {
            return Err(AuthError::config(format!(
                "default_ttl ({:?}) outside [{:?}, {:?}]",
                self.default_ttl, self.min_ttl, self.max_ttl
            )));
        }
        Ok(())
    }

    /// Whether `ttl` lies in `[min_ttl, max_ttl]`
    pub fn contains(&self, ttl: Duration) -> bool {
        ttl >= self.min_ttl && ttl <= self.max_ttl
    }

    /// Check a caller-supplied ttl
    pub fn check(&self, ttl: Duration) -> Result<Duration> {
        if self.contains(ttl) {
            Ok(ttl)
        } else {
            Err(AuthError::config(format!(
                "requested ttl {:?} outside [{:?}, {:?}]",
                ttl, self.min_ttl, self.max_ttl
            )))
        }
    }
}

/// Complete configuration for the authentication core
#[derive(Debug, Clone)]
pub struct GatehouseConfig {
    /// Signing keys (active + retired)
    pub keyring: Keyring,
    /// Token lifetime bounds
    pub ttl: TtlPolicy,
    /// Argon2id cost parameters
    pub hash_params: HashParams,
    /// Deadline for a single user-store lookup (`None` = wait indefinitely)
    pub store_timeout: Option<Duration>,
    /// Deployment environment, selects the signing key policy
    pub environment: String,
}

impl GatehouseConfig {
    /// Start a builder around the active signing key
    pub fn builder(signing_key: SigningKey) -> GatehouseConfigBuilder {
        GatehouseConfigBuilder::new(signing_key)
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GATEHOUSE_SIGNING_KEY`: base64 signing key (required)
    /// - `GATEHOUSE_KEY_ID`: id of the signing key (default: "primary")
    /// - `GATEHOUSE_RETIRED_KEYS`: comma-separated `kid:base64` pairs still accepted for validation
    /// - `GATEHOUSE_TOKEN_TTL`: default token lifetime, e.g. "1h" (default: "1h")
    /// - `GATEHOUSE_MIN_TTL`: minimum lifetime (default: "1s")
    /// - `GATEHOUSE_MAX_TTL`: maximum lifetime (default: "24h")
    /// - `GATEHOUSE_HASH_MEMORY_KIB`, `GATEHOUSE_HASH_ITERATIONS`, `GATEHOUSE_HASH_PARALLELISM`: Argon2id cost
    /// - `GATEHOUSE_STORE_TIMEOUT`: user-store lookup deadline, e.g. "2s" (default: none)
    /// - `RUST_ENV` / `APP_ENV`: environment for the key policy (default: "development")
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_id = lookup("GATEHOUSE_KEY_ID").unwrap_or_else(|| "primary".to_string());
        let encoded = lookup("GATEHOUSE_SIGNING_KEY")
            .ok_or_else(|| AuthError::config("GATEHOUSE_SIGNING_KEY is not set"))?;
        let mut builder = Self::builder(SigningKey::from_base64(key_id, &encoded)?);

        if let Some(retired) = lookup("GATEHOUSE_RETIRED_KEYS") {
            for key in parse_retired_keys(&retired)? {
                builder = builder.retired_key(key);
            }
        }

        let defaults = TtlPolicy::default();
        let ttl = TtlPolicy {
            min_ttl: duration_var(&lookup, "GATEHOUSE_MIN_TTL")?.unwrap_or(defaults.min_ttl),
            max_ttl: duration_var(&lookup, "GATEHOUSE_MAX_TTL")?.unwrap_or(defaults.max_ttl),
            default_ttl: duration_var(&lookup, "GATEHOUSE_TOKEN_TTL")?.unwrap_or(defaults.default_ttl),
        };

        let base = HashParams::default();
        let hash_params = HashParams {
            memory_kib: number_var(&lookup, "GATEHOUSE_HASH_MEMORY_KIB")?.unwrap_or(base.memory_kib),
            iterations: number_var(&lookup, "GATEHOUSE_HASH_ITERATIONS")?.unwrap_or(base.iterations),
            parallelism: number_var(&lookup, "GATEHOUSE_HASH_PARALLELISM")?.unwrap_or(base.parallelism),
            output_len: base.output_len,
        };

        let environment = lookup("RUST_ENV")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        builder = builder
            .ttl_policy(ttl)
            .hash_params(hash_params)
            .environment(environment);

        if let Some(timeout) = duration_var(&lookup, "GATEHOUSE_STORE_TIMEOUT")? {
            builder = builder.store_timeout(timeout);
        }

        builder.build()
    }

    /// Key policy for the configured environment
    pub fn key_policy(&self) -> KeyPolicy {
        KeyPolicy::for_environment(&self.environment)
    }

    /// Check ttl bounds, hash parameters, and key strength.
    ///
    /// Retired keys are checked too; a weak key is a forgery risk whether or
    /// not it still signs.
    pub fn validate(&self) -> Result<()> {
        self.ttl.validate()?;
        crate::credential::SecretHasher::new(self.hash_params)?;

        let policy = self.key_policy();
        for key_id in self.keyring.key_ids() {
            if let Some(key) = self.keyring.get(key_id) {
                policy.validate(key.as_bytes()).map_err(|e| {
                    AuthError::config(format!("signing key '{}': {}", key_id, e))
                })?;
            }
        }

        if self.store_timeout == Some(Duration::ZERO) {
            return Err(AuthError::config("store_timeout must be non-zero"));
        }

        Ok(())
    }
}

/// Builder for GatehouseConfig
#[derive(Debug, Clone)]
pub struct GatehouseConfigBuilder {
    config: GatehouseConfig,
    error: Option<AuthError>,
}

impl GatehouseConfigBuilder {
    fn new(signing_key: SigningKey) -> Self {
        Self {
            config: GatehouseConfig {
                keyring: Keyring::new(signing_key),
                ttl: TtlPolicy::default(),
                hash_params: HashParams::default(),
                store_timeout: None,
                environment: "development".to_string(),
            },
            error: None,
        }
    }

    /// Accept tokens signed by a previous key.
    ///
    /// A key id already in the ring fails [`build`](Self::build).
    pub fn retired_key(mut self, key: SigningKey) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.config.keyring.clone().with_retired(key) {
            Ok(keyring) => self.config.keyring = keyring,
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Set token lifetime bounds
    pub fn ttl(mut self, min_ttl: Duration, default_ttl: Duration, max_ttl: Duration) -> Self {
        self.config.ttl = TtlPolicy {
            min_ttl,
            max_ttl,
            default_ttl,
        };
        self
    }

    /// Set token lifetime bounds from a policy
    pub fn ttl_policy(mut self, ttl: TtlPolicy) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Set Argon2id cost parameters
    pub fn hash_params(mut self, params: HashParams) -> Self {
        self.config.hash_params = params;
        self
    }

    /// Bound each user-store lookup
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.config.store_timeout = Some(timeout);
        self
    }

    /// Set the deployment environment
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.config.environment = environment.into();
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<GatehouseConfig> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.config.validate()?;
        Ok(self.config)
    }
}

fn duration_var<F>(lookup: &F, name: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => parse_duration(&raw)
            .map(Some)
            .ok_or_else(|| AuthError::config(format!("{} is not a duration: '{}'", name, raw))),
    }
}

fn number_var<F>(lookup: &F, name: &str) -> Result<Option<u32>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AuthError::config(format!("{} is not a number: '{}'", name, raw))),
    }
}

/// Parse `kid:base64,kid:base64`
fn parse_retired_keys(s: &str) -> Result<Vec<SigningKey>> {
    s.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key_id, encoded) = pair.split_once(':').ok_or_else(|| {
                AuthError::config("GATEHOUSE_RETIRED_KEYS entries must be 'kid:base64'")
            })?;
            SigningKey::from_base64(key_id.trim(), encoded)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn strong_key(id: &str) -> SigningKey {
        KeyPolicy::for_environment("development").generate(id)
    }

    fn env_of(pairs: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_ttl_policy_default_is_valid() {
        assert!(TtlPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_ttl_policy_ordering() {
        let s = Duration::from_secs;
        assert!(TtlPolicy::new(s(1), s(60), s(3600)).is_ok());
        assert!(TtlPolicy::new(s(10), s(5), s(3600)).is_err());
        assert!(TtlPolicy::new(s(10), s(60), s(5)).is_err());
        assert!(TtlPolicy::new(Duration::ZERO, s(60), s(3600)).is_err());
    }

    #[test]
    fn test_ttl_check_bounds_inclusive() {
        let policy = TtlPolicy::default();
        assert!(policy.check(policy.min_ttl).is_ok());
        assert!(policy.check(policy.max_ttl).is_ok());
        assert!(matches!(
            policy.check(policy.max_ttl + Duration::from_secs(1)),
            Err(AuthError::InvalidConfiguration(_))
        ));
        assert!(policy.check(Duration::from_millis(999)).is_err());
    }

    #[test]
    fn test_builder_rejects_weak_key() {
        let result = GatehouseConfig::builder(SigningKey::new("k", b"password".to_vec())).build();
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_builder_rejects_weak_retired_key() {
        let result = GatehouseConfig::builder(strong_key("new"))
            .retired_key(SigningKey::new("old", vec![7u8; 40]))
            .build();
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(msg)) if msg.contains("old")));
    }

    #[test]
    fn test_retired_key_colliding_with_active_fails() {
        let lookup = env_of(&[
            ("GATEHOUSE_SIGNING_KEY", strong_key("ignored").to_base64()),
            ("GATEHOUSE_RETIRED_KEYS", format!("primary:{}", strong_key("ignored").to_base64())),
        ]);
        assert_eq!(
            GatehouseConfig::from_lookup(lookup).unwrap_err(),
            AuthError::InvalidConfiguration("retired key id 'primary' collides with active key".into())
        );
    }

    #[test]
    fn test_duplicate_retired_key_ids_fail() {
        let lookup = env_of(&[
            ("GATEHOUSE_SIGNING_KEY", strong_key("ignored").to_base64()),
            (
                "GATEHOUSE_RETIRED_KEYS",
                format!(
                    "2024-01:{},2024-01:{}",
                    strong_key("a").to_base64(),
                    strong_key("b").to_base64()
                ),
            ),
        ]);
        let result = GatehouseConfig::from_lookup(lookup);
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(msg)) if msg.contains("duplicate retired key id '2024-01'")));
    }

    #[test]
    fn test_builder_keeps_first_retired_key_error() {
        let result = GatehouseConfig::builder(strong_key("new"))
            .retired_key(strong_key("new"))
            .retired_key(strong_key("old"))
            .build();
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(msg)) if msg.contains("collides")));
    }

    #[test]
    fn test_builder_rejects_bad_hash_params() {
        let result = GatehouseConfig::builder(strong_key("k"))
            .hash_params(HashParams {
                memory_kib: 0,
                ..HashParams::insecure_fast()
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_lookup() {
        let key = strong_key("ignored");
        let old = strong_key("ignored");
        let lookup = env_of(&[
            ("GATEHOUSE_SIGNING_KEY", key.to_base64()),
            ("GATEHOUSE_KEY_ID", "2024-06".to_string()),
            ("GATEHOUSE_RETIRED_KEYS", format!("2024-01:{}", old.to_base64())),
            ("GATEHOUSE_TOKEN_TTL", "30m".to_string()),
            ("GATEHOUSE_MAX_TTL", "2h".to_string()),
            ("GATEHOUSE_HASH_MEMORY_KIB", "256".to_string()),
            ("GATEHOUSE_STORE_TIMEOUT", "1500ms".to_string()),
        ]);

        let config = GatehouseConfig::from_lookup(lookup).unwrap();
        assert_eq!(config.keyring.active().key_id(), "2024-06");
        assert_eq!(config.keyring.active().as_bytes(), key.as_bytes());
        assert!(config.keyring.get("2024-01").is_some());
        assert_eq!(config.ttl.default_ttl, Duration::from_secs(1800));
        assert_eq!(config.ttl.max_ttl, Duration::from_secs(7200));
        assert_eq!(config.ttl.min_ttl, Duration::from_secs(1));
        assert_eq!(config.hash_params.memory_kib, 256);
        assert_eq!(config.hash_params.iterations, HashParams::default().iterations);
        assert_eq!(config.store_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_from_lookup_requires_key() {
        let result = GatehouseConfig::from_lookup(|_| None);
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(msg)) if msg.contains("GATEHOUSE_SIGNING_KEY")));
    }

    #[test]
    fn test_from_lookup_rejects_bad_duration() {
        let lookup = env_of(&[
            ("GATEHOUSE_SIGNING_KEY", strong_key("k").to_base64()),
            ("GATEHOUSE_TOKEN_TTL", "forever".to_string()),
        ]);
        let result = GatehouseConfig::from_lookup(lookup);
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(msg)) if msg.contains("GATEHOUSE_TOKEN_TTL")));
    }

    #[test]
    fn test_production_requires_longer_key() {
        let lookup = env_of(&[
            ("GATEHOUSE_SIGNING_KEY", strong_key("k").to_base64()),
            ("APP_ENV", "production".to_string()),
        ]);
        assert!(GatehouseConfig::from_lookup(lookup).is_err());
    }

    #[test]
    fn test_parse_retired_keys() {
        let a = strong_key("a");
        let keys = parse_retired_keys(&format!(" a:{} , ", a.to_base64())).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].key_id(), "a");
        assert!(parse_retired_keys("no-colon").is_err());
    }
}
