//! Signing Key Strength Validation and Generation
//!
//! Environment-aware checks applied to the token signing key when
//! configuration is loaded. A key that fails the policy is rejected at
//! startup rather than silently producing forgeable tokens.
//!
//! # Checks
//!
//! - Minimum length in bytes
//! - Weak pattern detection (keys that are really passwords)
//! - Shannon entropy of the key bytes
//!
//! # Example
//!
//! ```
//! use gatehouse::key_policy::KeyPolicy;
//!
//! let policy = KeyPolicy::for_environment("production");
//! assert!(policy.validate(b"my-secret-key").is_err());
//!
//! let key = policy.generate("primary");
//! assert!(policy.validate(key.as_bytes()).is_ok());
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::error::AuthError;
use crate::keys::SigningKey;

/// Error type for signing key validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPolicyError {
    /// Key is too short for the environment
    TooShort {
        actual: usize,
        minimum: usize,
        context: String,
    },
    /// Key contains a weak/common pattern
    WeakPattern { pattern: String },
    /// Key bytes have insufficient entropy
    LowEntropy {
        actual: f64,
        minimum: f64,
        context: String,
    },
}

impl fmt::Display for KeyPolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort {
                actual,
                minimum,
                context,
            } => {
                write!(
                    f,
                    "Signing key length ({} bytes) is below minimum ({} bytes) for {}",
                    actual, minimum, context
                )
            }
            Self::WeakPattern { pattern } => {
                write!(f, "Signing key contains weak pattern: '{}'", pattern)
            }
            Self::LowEntropy {
                actual,
                minimum,
                context,
            } => {
                write!(
                    f,
                    "Signing key entropy ({:.1} bits) is below minimum ({:.1} bits) for {}",
                    actual, minimum, context
                )
            }
        }
    }
}

impl std::error::Error for KeyPolicyError {}

impl From<KeyPolicyError> for AuthError {
    fn from(err: KeyPolicyError) -> Self {
        AuthError::InvalidConfiguration(err.to_string())
    }
}

/// Requirements for a valid signing key.
#[derive(Debug, Clone)]
pub struct KeyPolicy {
    /// Minimum key length in bytes
    pub min_length: usize,
    /// Minimum Shannon entropy in bits
    pub min_entropy: f64,
    /// Whether to check for weak patterns
    pub check_weak_patterns: bool,
    /// Context string for error messages
    pub context: String,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self::for_environment("development")
    }
}

impl KeyPolicy {
    /// Create a policy for a specific environment.
    ///
    /// # Environments
    ///
    /// - `production`: 64 bytes, 256-bit entropy
    /// - `staging`: 48 bytes, 192-bit entropy
    /// - `testing`: 32 bytes, 96-bit entropy
    /// - `development` (default): 32 bytes, 64-bit entropy
    pub fn for_environment(environment: &str) -> Self {
        match environment.to_lowercase().as_str() {
            "production" | "prod" => Self {
                min_length: 64,
                min_entropy: 256.0,
                check_weak_patterns: true,
                context: "production environment".to_string(),
            },
            "staging" | "stage" => Self {
                min_length: 48,
                min_entropy: 192.0,
                check_weak_patterns: true,
                context: "staging environment".to_string(),
            },
            "testing" | "test" => Self {
                min_length: 32,
                min_entropy: 96.0,
                check_weak_patterns: true,
                context: "testing environment".to_string(),
            },
            _ => Self {
                min_length: 32,
                min_entropy: 64.0,
                check_weak_patterns: true,
                context: "development environment".to_string(),
            },
        }
    }

    /// Validate key bytes against this policy.
    pub fn validate(&self, key: &[u8]) -> Result<(), KeyPolicyError> {
        if key.len() < self.min_length {
            return Err(KeyPolicyError::TooShort {
                actual: key.len(),
                minimum: self.min_length,
                context: self.context.clone(),
            });
        }

        if self.check_weak_patterns {
            if let Some(pattern) = find_weak_pattern(key) {
                return Err(KeyPolicyError::WeakPattern {
                    pattern: pattern.to_string(),
                });
            }
        }

        let entropy = calculate_entropy(key);
        if entropy < self.min_entropy {
            return Err(KeyPolicyError::LowEntropy {
                actual: entropy,
                minimum: self.min_entropy,
                context: self.context.clone(),
            });
        }

        Ok(())
    }

    /// Generate a random key that passes this policy.
    ///
    /// Retries a few times in the (unlikely) event a random draw falls
    /// short on entropy, then falls back to a longer key.
    pub fn generate(&self, key_id: &str) -> SigningKey {
        let length = self.min_length.max(32);

        for _ in 0..10 {
            let key = SigningKey::generate(key_id, length);
            if self.validate(key.as_bytes()).is_ok() {
                return key;
            }
        }

        SigningKey::generate(key_id, length + 32)
    }
}

/// Check for weak patterns in keys that are really text.
fn find_weak_pattern(key: &[u8]) -> Option<&'static str> {
    const WEAK_PATTERNS: &[&str] = &[
        "secret", "password", "admin", "123456", "qwerty", "default",
        "example", "test", "demo", "sample", "changeme", "letmein",
    ];

    let text = std::str::from_utf8(key).ok()?.to_lowercase();
    WEAK_PATTERNS.iter().copied().find(|p| text.contains(p))
}

/// Shannon entropy of a byte string in bits (per-byte entropy times length).
///
/// ```
/// use gatehouse::key_policy::calculate_entropy;
///
/// assert!(calculate_entropy(b"aaaaaa") < 1.0);
/// assert!(calculate_entropy(b"aB3$xY9!") > 20.0);
/// ```
pub fn calculate_entropy(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<u8, usize> = HashMap::new();
    for b in bytes {
        *counts.entry(*b).or_insert(0) += 1;
    }

    let total = bytes.len() as f64;
    let per_byte: f64 = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    per_byte * total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_for_environment() {
        let prod = KeyPolicy::for_environment("production");
        assert_eq!(prod.min_length, 64);

        let dev = KeyPolicy::for_environment("anything-else");
        assert_eq!(dev.min_length, 32);
        assert_eq!(dev.context, "development environment");
    }

    #[test]
    fn test_validate_too_short() {
        let policy = KeyPolicy::for_environment("development");
        assert!(matches!(
            policy.validate(b"short"),
            Err(KeyPolicyError::TooShort { actual: 5, minimum: 32, .. })
        ));
    }

    #[test]
    fn test_validate_weak_pattern() {
        let policy = KeyPolicy::for_environment("development");
        let result = policy.validate(b"this-is-my-PASSWORD-and-it-is-long-enough");
        assert!(matches!(result, Err(KeyPolicyError::WeakPattern { .. })));
    }

    #[test]
    fn test_validate_low_entropy() {
        let policy = KeyPolicy::for_environment("development");
        let result = policy.validate(&[0u8; 64]);
        assert!(matches!(result, Err(KeyPolicyError::LowEntropy { .. })));
    }

    #[test]
    fn test_generated_keys_pass() {
        for env in ["production", "staging", "testing", "development"] {
            let policy = KeyPolicy::for_environment(env);
            let key = policy.generate("primary");
            assert!(policy.validate(key.as_bytes()).is_ok(), "{} key rejected", env);
            assert_eq!(key.key_id(), "primary");
        }
    }

    #[test]
    fn test_entropy() {
        assert_eq!(calculate_entropy(b""), 0.0);
        assert!(calculate_entropy(b"aaaaaaaaaa") < 1.0);
        assert!(calculate_entropy(b"aB3$xY9!pQ") > 30.0);
    }

    #[test]
    fn test_converts_to_configuration_error() {
        let err: AuthError = KeyPolicyError::WeakPattern {
            pattern: "secret".to_string(),
        }
        .into();
        assert!(matches!(err, AuthError::InvalidConfiguration(msg) if msg.contains("secret")));
    }
}
