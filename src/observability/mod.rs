//! Logging and audit events
//!
//! Library code logs through `tracing` and never installs a subscriber
//! itself. Binaries call [`init`] once at startup; the security audit trail
//! is emitted with the [`security_event!`](crate::security_event) macro.
//!
//! # Usage
//!
//! ```ignore
//! use gatehouse::observability::{init, ObservabilityConfig, LogFormat};
//!
//! // From environment variables
//! init(ObservabilityConfig::from_env())?;
//!
//! // Or programmatically
//! let config = ObservabilityConfig::builder()
//!     .log_format(LogFormat::Json)
//!     .log_filter("gatehouse=debug,info")
//!     .build();
//! init(config)?;
//! ```

mod config;
mod events;
mod providers;

pub use config::{LogFormat, LogWriter, ObservabilityConfig, ObservabilityConfigBuilder};
pub use events::{security_event, SecurityEvent, Severity};

use tracing::info;

/// Initialize logging.
///
/// Must be called at most once per process, before any logging occurs.
///
/// # Errors
///
/// Returns an error if the log filter is invalid or a global subscriber is
/// already installed.
pub fn init(config: ObservabilityConfig) -> Result<(), ObservabilityError> {
    providers::init_tracing(&config)?;

    info!(
        log_format = ?config.log_format,
        log_filter = %config.log_filter,
        "Observability initialized"
    );

    Ok(())
}

/// Observability initialization errors
#[derive(Debug)]
pub enum ObservabilityError {
    /// Invalid configuration
    Config(String),
    /// Subscriber installation failed
    Provider(String),
}

impl std::fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Observability config error: {}", msg),
            Self::Provider(msg) => write!(f, "Provider error: {}", msg),
        }
    }
}

impl std::error::Error for ObservabilityError {}
