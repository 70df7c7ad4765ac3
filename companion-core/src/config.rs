//! Session configuration received from the remote controller.

use core::fmt;

/// Session parameters pushed by the remote controller.
///
/// Values are stored exactly as received; negative numbers are accepted and
/// treated as "unset" by the consumers that size timers from them.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionConfig {
    pub duration_minutes: i32,
    pub break_interval_minutes: i32,
    pub break_length_minutes: i32,
    pub water_reminder_enabled: bool,
}

impl SessionConfig {
    /// Returns `true` once a positive session duration is known.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.duration_minutes > 0
    }

    /// Returns `true` when the schedule contains breaks at all.
    #[must_use]
    pub const fn has_breaks(&self) -> bool {
        self.break_interval_minutes > 0 && self.break_length_minutes > 0
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duration={};break_interval={};break_length={};water_reminder={}",
            self.duration_minutes,
            self.break_interval_minutes,
            self.break_length_minutes,
            if self.water_reminder_enabled { "on" } else { "off" }
        )
    }
}

/// Single field update carried by a `config/*` message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigUpdate {
    Duration(i32),
    BreakInterval(i32),
    BreakLength(i32),
    WaterReminder(bool),
}

/// Result of applying a [`ConfigUpdate`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConfigChange {
    /// Value of `ready` before the update.
    pub was_ready: bool,
    /// Value of `ready` after the update.
    pub is_ready: bool,
}

impl ConfigChange {
    /// Returns `true` when this update is the one that completed the configuration.
    #[must_use]
    pub const fn became_ready(self) -> bool {
        !self.was_ready && self.is_ready
    }
}

/// Owner of the [`SessionConfig`] for the lifetime of the device.
#[derive(Clone, Debug, Default)]
pub struct ConfigStore {
    config: SessionConfig,
}

impl ConfigStore {
    /// Creates an empty store. Nothing is ready until a duration arrives.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            config: SessionConfig {
                duration_minutes: 0,
                break_interval_minutes: 0,
                break_length_minutes: 0,
                water_reminder_enabled: false,
            },
        }
    }

    /// Returns the current configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the derived "configuration complete" predicate.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.config.is_ready()
    }

    /// Updates exactly one field and reports how `ready` moved.
    pub fn apply(&mut self, update: ConfigUpdate) -> ConfigChange {
        let was_ready = self.config.is_ready();
        match update {
            ConfigUpdate::Duration(value) => self.config.duration_minutes = value,
            ConfigUpdate::BreakInterval(value) => self.config.break_interval_minutes = value,
            ConfigUpdate::BreakLength(value) => self.config.break_length_minutes = value,
            ConfigUpdate::WaterReminder(enabled) => self.config.water_reminder_enabled = enabled,
        }
        log::debug!("config update {update:?} -> {}", self.config);

        ConfigChange {
            was_ready,
            is_ready: self.config.is_ready(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_status_payload() {
        let mut store = ConfigStore::new();
        store.apply(ConfigUpdate::Duration(25));
        store.apply(ConfigUpdate::BreakInterval(20));
        store.apply(ConfigUpdate::BreakLength(5));
        store.apply(ConfigUpdate::WaterReminder(true));

        let mut rendered: heapless::String<96> = heapless::String::new();
        core::fmt::write(&mut rendered, format_args!("{}", store.config())).unwrap();
        assert_eq!(
            rendered.as_str(),
            "duration=25;break_interval=20;break_length=5;water_reminder=on"
        );
    }
}
