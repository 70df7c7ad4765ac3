#![no_std]

// Firmware core for the study companion device.
//
// Everything that decides what the device does lives here: the session phase
// state machine, configuration, hydration alarms, environment classification,
// actuator resolution and the publish/subscribe adapter. The crate avoids the
// standard library and any allocator so the same logic runs on a board and in
// the host emulator; platforms plug in through the `Transport`, `SensorSource`
// and `Actuators` traits and supply a `DeviceInstant` clock.

pub mod actuator;
pub mod config;
pub mod device;
pub mod environment;
pub mod error;
pub mod phase;
pub mod plan;
pub mod sync;
pub mod time;
pub mod water;
