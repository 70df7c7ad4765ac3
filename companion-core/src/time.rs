//! Monotonic time abstractions and cooperative timers.
//!
//! The core never reads a clock itself. Every operation receives the current
//! instant from the caller, so the same logic runs against a board timer,
//! `std::time::Instant` on the host or a counter in tests.

use core::ops::Add;
use core::time::Duration;

/// Monotonic timestamp supplied by the platform driving the control loop.
pub trait DeviceInstant: Copy + Ord + Add<Duration, Output = Self> {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Rate limiter driven by a "last attempted at" comparison.
///
/// Used for reconnect attempts, periodic publishing and sensor sampling so
/// that nothing in the loop body has to sleep.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cadence<I> {
    period: Duration,
    last: Option<I>,
}

impl<I: DeviceInstant> Cadence<I> {
    /// Creates a cadence that fires immediately and then every `period`.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    /// Returns the configured period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Returns the instant of the last accepted attempt, if any.
    #[must_use]
    pub const fn last(&self) -> Option<I> {
        self.last
    }

    /// Returns `true` when a new attempt is allowed at `now`.
    #[must_use]
    pub fn is_due(&self, now: I) -> bool {
        match self.last {
            Some(last) => now.saturating_duration_since(last) >= self.period,
            None => true,
        }
    }

    /// Records an attempt at `now` when one is due and reports whether it was taken.
    pub fn try_fire(&mut self, now: I) -> bool {
        if self.is_due(now) {
            self.last = Some(now);
            true
        } else {
            false
        }
    }

    /// Forgets the last attempt so the next check fires immediately.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Converts whole minutes into a [`Duration`], treating non-positive values as zero.
#[must_use]
pub fn minutes(value: i32) -> Duration {
    let minutes = u64::try_from(value).unwrap_or(0);
    Duration::from_secs(minutes * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct Ms(u64);

    impl Add<Duration> for Ms {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self {
            Self(self.0 + u64::try_from(rhs.as_millis()).unwrap())
        }
    }

    impl DeviceInstant for Ms {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_millis(self.0.saturating_sub(earlier.0))
        }
    }

    #[test]
    fn cadence_fires_first_then_waits_for_period() {
        let mut cadence = Cadence::new(Duration::from_secs(5));
        assert!(cadence.try_fire(Ms(0)));
        assert!(!cadence.try_fire(Ms(4_999)));
        assert!(cadence.try_fire(Ms(5_000)));
        assert_eq!(cadence.last(), Some(Ms(5_000)));
    }

    #[test]
    fn negative_minutes_clamp_to_zero() {
        assert_eq!(minutes(-5), Duration::ZERO);
        assert_eq!(minutes(2), Duration::from_secs(120));
    }
}
