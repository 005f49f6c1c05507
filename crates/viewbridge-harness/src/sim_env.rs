//! Virtual clock environment.
//!
//! Time only moves when the test advances it. Clones share the clock, so a
//! test can keep one handle while the manager owns another.

use std::{ops::Sub, sync::Arc, time::Duration};

use parking_lot::Mutex;
use viewbridge_core::Environment;

/// Wall-clock reading at simulation start (2023-11-14T22:13:20Z).
pub const SIM_EPOCH_MILLIS: u64 = 1_700_000_000_000;

/// Instant on the virtual clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since the simulation started.
    pub fn since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

#[derive(Debug)]
struct Clock {
    elapsed: Duration,
    wall_clock_millis: u64,
}

/// Deterministic environment driven by the test.
#[derive(Debug, Clone)]
pub struct SimEnv {
    clock: Arc<Mutex<Clock>>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Clock at zero, wall clock at [`SIM_EPOCH_MILLIS`].
    pub fn new() -> Self {
        Self::with_wall_clock(SIM_EPOCH_MILLIS)
    }

    /// Clock at zero with a chosen wall-clock reading.
    pub fn with_wall_clock(wall_clock_millis: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(Clock { elapsed: Duration::ZERO, wall_clock_millis })),
        }
    }

    /// Move both clocks forward.
    pub fn advance(&self, by: Duration) {
        let mut clock = self.clock.lock();
        clock.elapsed += by;
        clock.wall_clock_millis += by.as_millis() as u64;
    }

    /// Time since the simulation started.
    pub fn elapsed(&self) -> Duration {
        self.clock.lock().elapsed
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.clock.lock().elapsed)
    }

    fn wall_clock_millis(&self) -> u64 {
        self.clock.lock().wall_clock_millis
    }
}
