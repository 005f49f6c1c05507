//! Production environment backed by the system clocks.
//!
//! Document time comes from `std::time::Instant`, which advances on its own
//! and never goes backwards. UTC time comes from `SystemTime` and may jump
//! when the system clock is adjusted; the manager only hands it to the
//! engine and never measures intervals with it.

use viewbridge_core::Environment;

/// Environment using the system monotonic and wall clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    /// A clock set before the Unix epoch reads as 0.
    #[allow(clippy::disallowed_methods)]
    fn wall_clock_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |since| since.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn monotonic_time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = env.now();

        assert!(t2 - t1 >= Duration::from_millis(5));
    }

    #[test]
    fn wall_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemEnv::new().wall_clock_millis() > 1_577_836_800_000);
    }
}
