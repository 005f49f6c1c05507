//! Environment abstraction for deterministic testing.
//!
//! The frame loop feeds the engine two clocks: elapsed document time
//! (monotonic) and wall-clock UTC time. Both come from the [`Environment`] so
//! simulation can drive them by hand and production can use the system
//! clocks.

use std::time::Duration;

/// Abstract environment providing time.
///
/// # Invariants
///
/// - `now()` never goes backwards within one execution context.
/// - `wall_clock_millis()` is milliseconds since the Unix epoch; it may jump,
///   and callers never use it to measure intervals.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production uses `std::time::Instant`; simulation uses a virtual
    /// instant advanced by the test.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time in milliseconds since the Unix epoch.
    fn wall_clock_millis(&self) -> u64;
}
