//! Time source for issuance and expiry checks
//!
//! Token timestamps are carried with millisecond precision. Everything that
//! reads "now" goes through [`Clock`] so expiry can be tested without
//! sleeping (see [`crate::testing::ManualClock`]).

use std::fmt::Debug;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current wall-clock time
pub trait Clock: Send + Sync + Debug {
    /// Current time
    fn now(&self) -> SystemTime;
}

/// The operating system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Milliseconds since the Unix epoch (0 for times before it)
pub fn unix_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Inverse of [`unix_millis`]; `None` for negative values
pub fn from_unix_millis(millis: i64) -> Option<SystemTime> {
    let millis = u64::try_from(millis).ok()?;
    UNIX_EPOCH.checked_add(Duration::from_millis(millis))
}

/// Drop sub-millisecond precision so a time survives a claims round-trip
pub fn truncate_to_millis(time: SystemTime) -> SystemTime {
    from_unix_millis(unix_millis(time)).unwrap_or(UNIX_EPOCH)
}
