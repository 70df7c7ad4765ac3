use std::ops::Add;
use std::time::{Duration, Instant};

use companion_core::time::DeviceInstant;

/// `std::time::Instant` as the device clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HostInstant(Instant);

impl HostInstant {
    #[must_use]
    pub fn now() -> Self {
        Self(Instant::now())
    }
}

impl Add<Duration> for HostInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl DeviceInstant for HostInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earlier_instants_saturate_to_zero() {
        let start = HostInstant::now();
        let later = start + Duration::from_millis(250);
        assert_eq!(
            later.saturating_duration_since(start),
            Duration::from_millis(250)
        );
        assert_eq!(start.saturating_duration_since(later), Duration::ZERO);
    }
}
