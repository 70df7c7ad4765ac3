//! Hydration alarms.
//!
//! Alarms are tracked as a 32-bit mask. The remote controller owns the
//! schedule; the device only adds reminders of its own when the controller has
//! been silent for longer than the fallback interval.

use core::time::Duration;

use crate::time::DeviceInstant;

/// Number of alarm slots tracked by the device.
pub const WATER_ALARM_CAPACITY: u32 = 32;

/// Default silence after which the device raises its own reminder.
pub const DEFAULT_FALLBACK_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Identifier for a hydration alarm slot, always in `[0, 32)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct AlarmId(u8);

impl AlarmId {
    /// Validates a raw identifier. Out-of-range values yield `None`.
    #[must_use]
    pub fn new(raw: u32) -> Option<Self> {
        if raw < WATER_ALARM_CAPACITY {
            u8::try_from(raw).ok().map(Self)
        } else {
            None
        }
    }

    /// Returns the numeric identifier.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    const fn bit(self) -> u32 {
        1 << self.0
    }
}

/// Fixed-capacity set of active hydration alarms.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WaterAlarmSet {
    mask: u32,
}

impl WaterAlarmSet {
    /// Creates a set with every alarm inactive.
    #[must_use]
    pub const fn new() -> Self {
        Self { mask: 0 }
    }

    /// Activates `id`. Returns `true` when the alarm was previously inactive.
    pub fn activate(&mut self, id: AlarmId) -> bool {
        let newly = self.mask & id.bit() == 0;
        self.mask |= id.bit();
        newly
    }

    /// Deactivates `id`. Returns `true` when the alarm was previously active.
    pub fn deactivate(&mut self, id: AlarmId) -> bool {
        let was_active = self.mask & id.bit() != 0;
        self.mask &= !id.bit();
        was_active
    }

    /// Activates a raw id, ignoring values outside the capacity.
    pub fn activate_raw(&mut self, raw: u32) -> bool {
        AlarmId::new(raw).is_some_and(|id| self.activate(id))
    }

    /// Deactivates a raw id, ignoring values outside the capacity.
    pub fn deactivate_raw(&mut self, raw: u32) -> bool {
        AlarmId::new(raw).is_some_and(|id| self.deactivate(id))
    }

    /// Forces every alarm inactive, returning the previously active set.
    pub fn clear(&mut self) -> WaterAlarmSet {
        let previous = *self;
        self.mask = 0;
        previous
    }

    #[must_use]
    pub const fn is_active(self, id: AlarmId) -> bool {
        self.mask & id.bit() != 0
    }

    #[must_use]
    pub const fn any_active(self) -> bool {
        self.mask != 0
    }

    #[must_use]
    pub const fn active_count(self) -> u32 {
        self.mask.count_ones()
    }

    /// Lowest inactive slot, if any remain.
    #[must_use]
    pub fn first_free(self) -> Option<AlarmId> {
        let free = (!self.mask).trailing_zeros();
        AlarmId::new(free)
    }

    /// Iterates over active alarm ids in ascending order.
    pub fn iter(self) -> impl Iterator<Item = AlarmId> {
        (0..WATER_ALARM_CAPACITY)
            .filter_map(AlarmId::new)
            .filter(move |id| self.is_active(*id))
    }
}

/// Local fallback reminder schedule.
///
/// Any reminder, remote or local, restarts the silence window.
#[derive(Copy, Clone, Debug)]
pub struct WaterFallback<I> {
    interval: Duration,
    last_reminder: Option<I>,
}

impl<I: DeviceInstant> WaterFallback<I> {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_reminder: None,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts a fresh silence window at `now`.
    pub fn restart(&mut self, now: I) {
        self.last_reminder = Some(now);
    }

    /// Stops tracking until the next [`restart`](Self::restart).
    pub fn disarm(&mut self) {
        self.last_reminder = None;
    }

    /// Returns `true` when the silence window has elapsed at `now`.
    #[must_use]
    pub fn is_due(&self, now: I) -> bool {
        if self.interval.is_zero() {
            return false;
        }
        self.last_reminder
            .is_some_and(|last| now.saturating_duration_since(last) >= self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_is_idempotent() {
        let mut set = WaterAlarmSet::new();
        assert!(set.activate_raw(3));
        assert!(!set.activate_raw(3));
        assert_eq!(set.active_count(), 1);
        assert!(set.deactivate_raw(3));
        assert!(!set.any_active());
    }

    #[test]
    fn out_of_range_ids_are_ignored() {
        let mut set = WaterAlarmSet::new();
        assert!(!set.activate_raw(32));
        assert!(!set.deactivate_raw(99));
        assert!(!set.any_active());
        assert!(AlarmId::new(31).is_some());
    }

    #[test]
    fn first_free_skips_active_slots() {
        let mut set = WaterAlarmSet::new();
        set.activate_raw(0);
        set.activate_raw(1);
        assert_eq!(set.first_free().map(AlarmId::get), Some(2));

        let mut full = WaterAlarmSet::new();
        for id in 0..WATER_ALARM_CAPACITY {
            full.activate_raw(id);
        }
        assert_eq!(full.first_free(), None);
    }

    #[test]
    fn iter_reports_ascending_ids() {
        let mut set = WaterAlarmSet::new();
        set.activate_raw(7);
        set.activate_raw(2);
        set.activate_raw(31);
        let ids: heapless::Vec<u8, 4> = set.iter().map(AlarmId::get).collect();
        assert_eq!(ids.as_slice(), &[2, 7, 31]);
    }
}
