use std::f64::consts::PI;
use std::time::{Duration, Instant};

use companion_core::device::{SensorSample, SensorSource};

const DAYLIGHT_LUX: f64 = 500.0;
const NIGHT_LUX: f64 = 60.0;

const SUNRISE_START: f64 = 0.23;
const SUNRISE_END: f64 = 0.25;
const SUNSET_START: f64 = 0.73;
const SUNSET_END: f64 = 0.75;

/// Ambient light over a day; `day_fraction` 0.0 is midnight.
#[must_use]
pub fn simulated_lux(day_fraction: f64) -> f64 {
    if (SUNRISE_START..=SUNSET_END).contains(&day_fraction) {
        if day_fraction <= SUNRISE_END {
            let ramp = (day_fraction - SUNRISE_START) / (SUNRISE_END - SUNRISE_START);
            NIGHT_LUX + (ramp * PI / 2.0).sin() * (DAYLIGHT_LUX - NIGHT_LUX)
        } else if day_fraction >= SUNSET_START {
            let ramp = (day_fraction - SUNSET_START) / (SUNSET_END - SUNSET_START);
            NIGHT_LUX + (ramp * PI / 2.0).cos() * (DAYLIGHT_LUX - NIGHT_LUX)
        } else {
            DAYLIGHT_LUX
        }
    } else {
        // Desk lamp only.
        NIGHT_LUX
    }
}

/// Relative humidity, drier through the afternoon.
#[must_use]
pub fn simulated_humidity(day_fraction: f64) -> f64 {
    let radians = day_fraction * 2.0 * PI;
    if (0.3..=0.7).contains(&day_fraction) {
        (55.0 - radians.sin().max(0.0) * 15.0).round()
    } else {
        (60.0 + radians.cos().max(0.0) * 15.0).round()
    }
}

/// Room temperature, coolest before dawn and warmest mid-afternoon.
#[must_use]
pub fn simulated_temperature(day_fraction: f64) -> f64 {
    let radians = (day_fraction - 0.35) * 2.0 * PI;
    ((23.0 + radians.sin() * 8.0) * 10.0).round() / 10.0
}

/// Sensor source following the simulated day, unless the operator pins a sample.
pub struct SimulatedSensors {
    started: Instant,
    day_length: Duration,
    pinned: Option<SensorSample>,
}

impl SimulatedSensors {
    #[must_use]
    pub fn new(day_length: Duration) -> Self {
        Self {
            started: Instant::now(),
            day_length,
            pinned: None,
        }
    }

    pub fn pin(&mut self, sample: SensorSample) {
        self.pinned = Some(sample);
    }

    pub fn resume(&mut self) {
        self.pinned = None;
    }

    #[must_use]
    pub fn day_fraction(&self) -> f64 {
        let day = self.day_length.as_secs_f64();
        (self.started.elapsed().as_secs_f64() % day) / day
    }
}

impl SensorSource for SimulatedSensors {
    #[allow(clippy::cast_possible_truncation)]
    fn read(&mut self) -> SensorSample {
        if let Some(sample) = self.pinned {
            return sample;
        }
        let fraction = self.day_fraction();
        SensorSample::new(
            simulated_temperature(fraction) as f32,
            simulated_humidity(fraction) as f32,
            simulated_lux(fraction) as f32,
        )
    }
}
