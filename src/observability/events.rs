//! Security Event Logging
//!
//! Structured audit records for every authentication decision. Events carry
//! a name, category, and severity; the severity picks the `tracing` level.
//!
//! # Usage
//!
//! ```ignore
//! use gatehouse::observability::SecurityEvent;
//!
//! gatehouse::security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     username = %username,
//!     reason = "invalid_credentials",
//!     "Authentication failed"
//! );
//! ```
//!
//! Never pass secrets, hashes, salts, key bytes, or whole tokens as fields.

use std::fmt;

/// Security event categories for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// Credentials verified
    AuthenticationSuccess,
    /// Unknown user or wrong secret
    AuthenticationFailure,
    /// Client discarded its token
    Logout,

    // Token events
    /// Session token issued
    TokenIssued,
    /// Presented token failed validation
    TokenRejected,

    // System events
    /// User store failed or timed out
    StoreUnavailable,
    /// Configuration or key material rejected
    ConfigurationRejected,
    /// Service initialized
    SystemStartup,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess
            | Self::AuthenticationFailure
            | Self::Logout => "authentication",

            Self::TokenIssued
            | Self::TokenRejected => "token",

            Self::StoreUnavailable
            | Self::ConfigurationRejected
            | Self::SystemStartup => "system",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            Self::StoreUnavailable => Severity::Critical,

            Self::AuthenticationFailure
            | Self::ConfigurationRejected => Severity::High,

            Self::AuthenticationSuccess
            | Self::TokenRejected => Severity::Medium,

            Self::Logout
            | Self::TokenIssued
            | Self::SystemStartup => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::Logout => "logout",
            Self::TokenIssued => "token_issued",
            Self::TokenRejected => "token_rejected",
            Self::StoreUnavailable => "store_unavailable",
            Self::ConfigurationRejected => "configuration_rejected",
            Self::SystemStartup => "system_startup",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
    /// Immediate attention required
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Log a security event with structured fields.
///
/// Adds `security_event`, `category`, and `severity` fields and logs at
/// `error` (critical), `warn` (high), `info` (medium), or `debug` (low).
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let category = event.category();
        let event_name = event.name();

        match event.severity() {
            $crate::observability::Severity::Critical => {
                ::tracing::error!(
                    security_event = event_name,
                    category = category,
                    severity = "critical",
                    $($field)*
                );
            }
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_categories() {
        assert_eq!(SecurityEvent::AuthenticationFailure.category(), "authentication");
        assert_eq!(SecurityEvent::TokenRejected.category(), "token");
        assert_eq!(SecurityEvent::StoreUnavailable.category(), "system");
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(SecurityEvent::StoreUnavailable.severity(), Severity::Critical);
        assert_eq!(SecurityEvent::AuthenticationFailure.severity(), Severity::High);
        assert_eq!(SecurityEvent::TokenRejected.severity(), Severity::Medium);
        assert_eq!(SecurityEvent::TokenIssued.severity(), Severity::Low);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_macro_compiles_at_every_level() {
        security_event!(SecurityEvent::StoreUnavailable, reason = "test", "critical");
        security_event!(SecurityEvent::AuthenticationFailure, username = %"bob", "high");
        security_event!(SecurityEvent::TokenRejected, reason = "expired", "medium");
        security_event!(SecurityEvent::TokenIssued, ttl_secs = 60u64, "low");
    }
}
