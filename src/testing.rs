//! Security Testing Utilities
//!
//! Helpers for testing an authentication deployment: a controllable clock
//! for expiry checks and user-enumeration checks that compare both the
//! responses and the timing of known and unknown usernames.
//!
//! # Usage
//!
//! ```ignore
//! use gatehouse::testing::{check_user_enumeration, measure_interleaved, median_duration};
//!
//! #[tokio::test]
//! async fn test_no_user_enumeration() {
//!     let ((known, known_times), (unknown, unknown_times)) = measure_interleaved(
//!         20,
//!         || verifier.verify("admin", "wrong"),
//!         || verifier.verify("ghost", "wrong"),
//!     )
//!     .await;
//!
//!     let result = check_user_enumeration(
//!         &known,
//!         &unknown,
//!         median_duration(&known_times),
//!         median_duration(&unknown_times),
//!     );
//!     assert!(!result.vulnerable, "{:?}", result.issues);
//! }
//! ```

use std::future::Future;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::clock::Clock;

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    /// Start at `start`
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start at a fixed, millisecond-aligned instant (2023-11-14T22:13:20Z)
    pub fn fixed() -> Self {
        Self::new(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Jump to `to`
    pub fn set(&self, to: SystemTime) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock()
    }
}

// ============================================================================
// Enumeration Testing
// ============================================================================

/// Test usernames for enumeration testing
pub fn test_usernames() -> Vec<&'static str> {
    vec![
        "admin",
        "administrator",
        "root",
        "test",
        "user",
        "guest",
        "demo",
        "support",
        "webmaster",
        "postmaster",
    ]
}

/// Absolute timing gap that always counts as a leak
pub const MAX_TIMING_DIFF: Duration = Duration::from_millis(100);

/// Smallest acceptable fast/slow ratio between the two paths
pub const MIN_TIMING_RATIO: f64 = 0.8;

/// Check whether outcomes for a known and an unknown username can be told apart
///
/// `known_user_response` and `invalid_user_response` are whatever the caller
/// observes (error codes, messages, status lines); they must be identical.
/// Timings are flagged when they differ by more than [`MAX_TIMING_DIFF`], or
/// when the faster path takes less than [`MIN_TIMING_RATIO`] of the slower
/// one (ignoring gaps under 2ms, which are scheduler noise).
pub fn check_user_enumeration(
    known_user_response: &str,
    unknown_user_response: &str,
    known_user_timing: Duration,
    unknown_user_timing: Duration,
) -> UserEnumerationResult {
    let mut issues = Vec::new();

    if known_user_response != unknown_user_response {
        issues.push(format!(
            "Different responses for known vs unknown users: '{}' vs '{}'",
            known_user_response, unknown_user_response
        ));
    }

    let (fast, slow) = if known_user_timing < unknown_user_timing {
        (known_user_timing, unknown_user_timing)
    } else {
        (unknown_user_timing, known_user_timing)
    };
    let timing_diff = slow - fast;

    if timing_diff > MAX_TIMING_DIFF {
        issues.push(format!(
            "Timing difference of {:?} between known and unknown users",
            timing_diff
        ));
    } else if timing_diff > Duration::from_millis(2) && timing_ratio(fast, slow) < MIN_TIMING_RATIO {
        issues.push(format!(
            "Timing ratio {:.2} between known ({:?}) and unknown ({:?}) users",
            timing_ratio(fast, slow),
            known_user_timing,
            unknown_user_timing
        ));
    }

    UserEnumerationResult {
        vulnerable: !issues.is_empty(),
        issues,
    }
}

/// Result of user enumeration check
#[derive(Debug, Clone)]
pub struct UserEnumerationResult {
    /// Whether the outcomes appear distinguishable
    pub vulnerable: bool,
    /// Specific issues found
    pub issues: Vec<String>,
}

fn timing_ratio(fast: Duration, slow: Duration) -> f64 {
    if slow.is_zero() {
        return 1.0;
    }
    fast.as_secs_f64() / slow.as_secs_f64()
}

// ============================================================================
// Timing
// ============================================================================

/// Median of a set of durations (zero for an empty set)
pub fn median_duration(samples: &[Duration]) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2
    } else {
        sorted[mid]
    }
}

/// Run `op` `trials` times, returning the last outcome's `Debug` text and
/// each run's wall time.
///
/// To compare two paths prefer [`measure_interleaved`], which keeps drift in
/// machine load from landing on one side only.
pub async fn measure<F, Fut, T>(trials: usize, mut op: F) -> (String, Vec<Duration>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    T: std::fmt::Debug,
{
    let mut outcome = String::new();
    let mut timings = Vec::with_capacity(trials);
    for _ in 0..trials {
        let start = Instant::now();
        let result = op().await;
        timings.push(start.elapsed());
        outcome = format!("{:?}", result);
    }
    (outcome, timings)
}

/// Time `a` and `b` alternately for `trials` rounds.
///
/// The order flips every round so neither path always runs first.
pub async fn measure_interleaved<A, FutA, TA, B, FutB, TB>(
    trials: usize,
    mut a: A,
    mut b: B,
) -> ((String, Vec<Duration>), (String, Vec<Duration>))
where
    A: FnMut() -> FutA,
    FutA: Future<Output = TA>,
    TA: std::fmt::Debug,
    B: FnMut() -> FutB,
    FutB: Future<Output = TB>,
    TB: std::fmt::Debug,
{
    let mut a_out = (String::new(), Vec::with_capacity(trials));
    let mut b_out = (String::new(), Vec::with_capacity(trials));
    for round in 0..trials {
        if round % 2 == 0 {
            time_once(&mut a, &mut a_out).await;
            time_once(&mut b, &mut b_out).await;
        } else {
            time_once(&mut b, &mut b_out).await;
            time_once(&mut a, &mut a_out).await;
        }
    }
    (a_out, b_out)
}

async fn time_once<F, Fut, T>(op: &mut F, out: &mut (String, Vec<Duration>))
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    T: std::fmt::Debug,
{
    let start = Instant::now();
    let result = op().await;
    out.1.push(start.elapsed());
    out.0 = format!("{:?}", result);
}
