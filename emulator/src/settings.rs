use std::fs;
use std::path::Path;
use std::time::Duration;

use companion_core::device::DeviceSettings;
use companion_core::sync::Topics;
use serde::{Deserialize, Serialize};

use crate::error::EmulatorError;

const DEFAULT_SETTINGS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../",
    "configs/default.toml"
));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broker {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub topic_prefix: String,
    pub loop_period_ms: u64,
    pub sample_interval_ms: u64,
    pub publish_interval_ms: u64,
    pub reconnect_interval_ms: u64,
    pub water_fallback_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Length of one simulated day; the light and humidity curves repeat on it.
    pub day_length_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub broker: Broker,
    pub device: Device,
    pub simulation: Simulation,
}

impl Settings {
    /// Loads the settings at `path`, or the built-in defaults when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self, EmulatorError> {
        match path {
            Some(path) => {
                let text =
                    fs::read_to_string(path).map_err(|source| EmulatorError::SettingsRead {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Self::parse(&text)
            }
            None => Self::parse(DEFAULT_SETTINGS),
        }
    }

    pub fn parse(text: &str) -> Result<Self, EmulatorError> {
        Ok(toml::from_str(text)?)
    }

    #[must_use]
    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings::new()
            .with_loop_period(Duration::from_millis(self.device.loop_period_ms))
            .with_sample_interval(Duration::from_millis(self.device.sample_interval_ms))
            .with_publish_interval(Duration::from_millis(self.device.publish_interval_ms))
            .with_reconnect_interval(Duration::from_millis(self.device.reconnect_interval_ms))
            .with_water_fallback_interval(Duration::from_secs(
                self.device.water_fallback_minutes * 60,
            ))
    }

    pub fn topics(&self) -> Result<Topics, EmulatorError> {
        Topics::new(&self.device.topic_prefix).map_err(EmulatorError::TopicPrefix)
    }

    #[must_use]
    pub fn day_length(&self) -> Duration {
        Duration::from_secs(self.simulation.day_length_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_defaults_match_device_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.logger.level, "info");
        assert_eq!(settings.broker.port, 1883);
        assert_eq!(settings.device_settings(), DeviceSettings::new());
        assert_eq!(settings.topics().unwrap().prefix(), "swsc");
    }

    #[test]
    fn overrides_are_applied() {
        let text = DEFAULT_SETTINGS
            .replace("topic_prefix = \"swsc\"", "topic_prefix = \"lab/desk-2/\"")
            .replace("reconnect_interval_ms = 5000", "reconnect_interval_ms = 250");
        let settings = Settings::parse(&text).unwrap();

        assert_eq!(
            settings.device_settings().reconnect_interval,
            Duration::from_millis(250)
        );
        assert_eq!(settings.topics().unwrap().prefix(), "lab/desk-2");
    }

    #[test]
    fn wildcard_prefix_is_rejected() {
        let text = DEFAULT_SETTINGS.replace("topic_prefix = \"swsc\"", "topic_prefix = \"a/#\"");
        let settings = Settings::parse(&text).unwrap();
        assert!(matches!(
            settings.topics(),
            Err(EmulatorError::TopicPrefix(_))
        ));
    }

    #[test]
    fn missing_section_is_a_parse_error() {
        let err = Settings::parse("[logger]\nlevel = \"debug\"\n").unwrap_err();
        assert!(matches!(err, EmulatorError::SettingsParse(_)));
    }
}
