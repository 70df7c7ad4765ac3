//! Ambient environment classification.
//!
//! Samples are compared against fixed comfort thresholds and collapsed into a
//! single [`EnvironmentStatus`] label. Only changes of that label are reported
//! to the caller, so repeated identical readings are silent.

use core::fmt;

/// Upper comfort bound for temperature in degrees Celsius.
pub const TEMPERATURE_MAX_C: f32 = 30.0;
/// Lower comfort bound for temperature in degrees Celsius.
pub const TEMPERATURE_MIN_C: f32 = 20.0;
/// Upper comfort bound for relative humidity in percent.
pub const HUMIDITY_MAX_PCT: f32 = 70.0;
/// Lower comfort bound for relative humidity in percent.
pub const HUMIDITY_MIN_PCT: f32 = 40.0;
/// Lower comfort bound for illuminance in lux.
pub const LIGHT_MIN_LUX: f32 = 200.0;
/// Upper comfort bound for illuminance in lux.
pub const LIGHT_MAX_LUX: f32 = 800.0;

/// Derived classification of the latest complete sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EnvironmentStatus {
    Ideal,
    TooHot,
    TooCold,
    TooHumid,
    TooDry,
    TooDark,
    TooBright,
}

impl EnvironmentStatus {
    /// Wire label used on `status/environment` and `alert/environment`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            EnvironmentStatus::Ideal => "ideal",
            EnvironmentStatus::TooHot => "too_hot",
            EnvironmentStatus::TooCold => "too_cold",
            EnvironmentStatus::TooHumid => "too_humid",
            EnvironmentStatus::TooDry => "too_dry",
            EnvironmentStatus::TooDark => "too_dark",
            EnvironmentStatus::TooBright => "too_bright",
        }
    }

    #[must_use]
    pub const fn is_ideal(self) -> bool {
        matches!(self, EnvironmentStatus::Ideal)
    }

    /// Classifies a complete, finite sample.
    #[must_use]
    pub fn classify(reading: EnvironmentReading) -> Self {
        if reading.temperature_c > TEMPERATURE_MAX_C {
            EnvironmentStatus::TooHot
        } else if reading.temperature_c < TEMPERATURE_MIN_C {
            EnvironmentStatus::TooCold
        } else if reading.humidity_pct > HUMIDITY_MAX_PCT {
            EnvironmentStatus::TooHumid
        } else if reading.humidity_pct < HUMIDITY_MIN_PCT {
            EnvironmentStatus::TooDry
        } else if reading.light_lux < LIGHT_MIN_LUX {
            EnvironmentStatus::TooDark
        } else if reading.light_lux > LIGHT_MAX_LUX {
            EnvironmentStatus::TooBright
        } else {
            EnvironmentStatus::Ideal
        }
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A complete set of readings.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EnvironmentReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub light_lux: f32,
}

impl EnvironmentReading {
    /// Combines optional channel values, rejecting missing or non-finite ones.
    #[must_use]
    pub fn from_channels(
        temperature_c: Option<f32>,
        humidity_pct: Option<f32>,
        light_lux: Option<f32>,
    ) -> Option<Self> {
        let temperature_c = temperature_c.filter(|value| value.is_finite())?;
        let humidity_pct = humidity_pct.filter(|value| value.is_finite())?;
        let light_lux = light_lux.filter(|value| value.is_finite())?;
        Some(Self {
            temperature_c,
            humidity_pct,
            light_lux,
        })
    }
}

/// Edge-triggered environment monitor.
#[derive(Clone, Debug, Default)]
pub struct EnvironmentMonitor {
    status: Option<EnvironmentStatus>,
    last_reading: Option<EnvironmentReading>,
}

impl EnvironmentMonitor {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: None,
            last_reading: None,
        }
    }

    /// Current label; `None` until the first complete sample.
    #[must_use]
    pub const fn status(&self) -> Option<EnvironmentStatus> {
        self.status
    }

    /// Most recent complete reading.
    #[must_use]
    pub const fn last_reading(&self) -> Option<EnvironmentReading> {
        self.last_reading
    }

    /// Returns `false` only when a complete sample classified as non-ideal.
    #[must_use]
    pub fn is_ideal(&self) -> bool {
        self.status.is_none_or(EnvironmentStatus::is_ideal)
    }

    /// Feeds one sample, returning the new label when it changed.
    ///
    /// Incomplete samples keep the previous label and report nothing.
    pub fn sample(
        &mut self,
        temperature_c: Option<f32>,
        humidity_pct: Option<f32>,
        light_lux: Option<f32>,
    ) -> Option<EnvironmentStatus> {
        let Some(reading) = EnvironmentReading::from_channels(temperature_c, humidity_pct, light_lux)
        else {
            log::debug!("incomplete environment sample ignored");
            return None;
        };

        self.last_reading = Some(reading);
        let next = EnvironmentStatus::classify(reading);
        if self.status == Some(next) {
            return None;
        }

        log::info!(
            "environment {} -> {next}",
            self.status.map_or("unknown", EnvironmentStatus::label)
        );
        self.status = Some(next);
        Some(next)
    }
}
