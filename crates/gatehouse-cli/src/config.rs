//! Configuration parsing for gatehouse.toml
//!
//! Defines the file schema and converts it into a validated
//! [`GatehouseConfig`]. Key values may reference environment variables with
//! `${VAR}` so the file itself never has to hold secrets.

use serde::{Deserialize, Serialize};
use std::path::Path;

use gatehouse::{parse_duration, GatehouseConfig, HashParams, SigningKey, TtlPolicy};

use crate::error::{CliError, Result};

/// Root configuration structure for gatehouse.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Deployment settings
    #[serde(default)]
    pub app: AppSection,

    /// Signing keys
    pub keys: KeysSection,

    /// Token lifetimes
    #[serde(default)]
    pub tokens: TokensSection,

    /// Argon2id cost
    #[serde(default)]
    pub hashing: Option<HashingSection>,

    /// User store settings
    #[serde(default)]
    pub store: StoreSection,
}

impl FileConfig {
    /// Load configuration from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CliError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CliError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_str(&content, path)
    }

    /// Parse configuration from a string
    pub fn from_str(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| CliError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Resolve `${VAR}` references, parse durations, and validate
    pub fn to_gatehouse_config(&self) -> Result<GatehouseConfig> {
        self.to_gatehouse_config_with(|name| std::env::var(name).ok())
    }

    /// Same as [`FileConfig::to_gatehouse_config`] with an explicit variable lookup
    pub fn to_gatehouse_config_with<F>(&self, lookup: F) -> Result<GatehouseConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let active = resolve(&self.keys.active, "keys.active", &lookup)?;
        let mut builder =
            GatehouseConfig::builder(SigningKey::from_base64(&self.keys.active_id, &active)?);

        for (i, retired) in self.keys.retired.iter().enumerate() {
            let field = format!("keys.retired[{}].key", i);
            let encoded = resolve(&retired.key, &field, &lookup)?;
            builder = builder.retired_key(SigningKey::from_base64(&retired.id, &encoded)?);
        }

        let ttl = TtlPolicy {
            min_ttl: duration(&self.tokens.min_ttl, "tokens.min_ttl")?,
            max_ttl: duration(&self.tokens.max_ttl, "tokens.max_ttl")?,
            default_ttl: duration(&self.tokens.default_ttl, "tokens.default_ttl")?,
        };

        builder = builder
            .ttl_policy(ttl)
            .environment(&self.app.environment);

        if let Some(hashing) = &self.hashing {
            builder = builder.hash_params(hashing.to_params());
        }
        if let Some(timeout) = &self.store.timeout {
            builder = builder.store_timeout(duration(timeout, "store.timeout")?);
        }

        Ok(builder.build()?)
    }
}

/// `[app]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    /// Environment name, selects the key policy
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            environment: default_environment(),
        }
    }
}

fn default_environment() -> String {
    "development".to_string()
}

/// `[keys]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysSection {
    /// Id of the signing key
    #[serde(default = "default_key_id")]
    pub active_id: String,

    /// Base64 signing key (can use ${VAR} syntax for env vars)
    pub active: String,

    /// Keys still accepted for validation
    #[serde(default)]
    pub retired: Vec<RetiredKey>,
}

fn default_key_id() -> String {
    "primary".to_string()
}

/// `[[keys.retired]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetiredKey {
    /// Key id carried by old tokens
    pub id: String,
    /// Base64 key (can use ${VAR} syntax)
    pub key: String,
}

/// `[tokens]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensSection {
    /// Default lifetime
    #[serde(default = "default_ttl")]
    pub default_ttl: String,
    /// Minimum lifetime
    #[serde(default = "default_min_ttl")]
    pub min_ttl: String,
    /// Maximum lifetime
    #[serde(default = "default_max_ttl")]
    pub max_ttl: String,
}

impl Default for TokensSection {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            min_ttl: default_min_ttl(),
            max_ttl: default_max_ttl(),
        }
    }
}

fn default_ttl() -> String {
    "1h".to_string()
}

fn default_min_ttl() -> String {
    "1s".to_string()
}

fn default_max_ttl() -> String {
    "24h".to_string()
}

/// `[hashing]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingSection {
    /// Memory cost in KiB
    pub memory_kib: Option<u32>,
    /// Passes
    pub iterations: Option<u32>,
    /// Lanes
    pub parallelism: Option<u32>,
}

impl HashingSection {
    fn to_params(&self) -> HashParams {
        let base = HashParams::default();
        HashParams {
            memory_kib: self.memory_kib.unwrap_or(base.memory_kib),
            iterations: self.iterations.unwrap_or(base.iterations),
            parallelism: self.parallelism.unwrap_or(base.parallelism),
            output_len: base.output_len,
        }
    }
}

/// `[store]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSection {
    /// Lookup deadline, e.g. "2s"
    pub timeout: Option<String>,
}

/// Expand a whole-value `${VAR}` reference
fn resolve<F>(value: &str, field: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match value.trim().strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        Some(var) => lookup(var).ok_or_else(|| CliError::missing(format!("{} (${{{}}})", field, var))),
        None => Ok(value.to_string()),
    }
}

fn duration(value: &str, field: &str) -> Result<std::time::Duration> {
    parse_duration(value).ok_or_else(|| CliError::invalid(field, format!("'{}' is not a duration", value)))
}

/// Template written by `gatehouse init`
pub fn init_template(environment: &str, key_b64: Option<&str>) -> String {
    let active = key_b64.unwrap_or("${GATEHOUSE_SIGNING_KEY}");
    format!(
        r#"# Gatehouse Configuration

[app]
environment = "{}"

[keys]
active_id = "primary"
active = "{}"

# Keys that old tokens may still be signed with
# [[keys.retired]]
# id = "2024-01"
# key = "${{GATEHOUSE_OLD_KEY}}"

[tokens]
default_ttl = "1h"
min_ttl = "1s"
max_ttl = "24h"

# Argon2id cost (defaults: 19456 KiB, 2 passes, 1 lane)
# [hashing]
# memory_kib = 19456
# iterations = 2
# parallelism = 1

# [store]
# timeout = "2s"
"#,
        environment, active
    )
}
