//! Cooperative control loop.
//!
//! [`DeviceLoop`] owns every piece of device state and evaluates, in order,
//! transport I/O, timer-driven phase transitions, sensor sampling, publishing
//! and actuator output. Nothing in [`DeviceLoop::run_once`] waits; slow work is
//! paced by [`Cadence`]s instead.

use core::time::Duration;

use crate::actuator::{ActuatorDriver, ActuatorView, Actuators};
use crate::config::ConfigStore;
use crate::environment::EnvironmentMonitor;
use crate::error::CompanionError;
use crate::phase::PhaseMachine;
use crate::sync::encode::{self, Telemetry};
use crate::sync::{
    AlertEvent, DEFAULT_RECONNECT_INTERVAL, InboundEvent, InboundMessage, Link, Outbox, Topics,
    Transport, TransportEvent, decode,
};
use crate::time::{Cadence, DeviceInstant};
use crate::water::DEFAULT_FALLBACK_INTERVAL;

/// Upper bound on transport events handled by one iteration.
pub const MAX_EVENTS_PER_ITERATION: usize = 8;

/// Timing knobs for the control loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceSettings {
    pub loop_period: Duration,
    pub sample_interval: Duration,
    pub publish_interval: Duration,
    pub reconnect_interval: Duration,
    pub water_fallback_interval: Duration,
}

impl DeviceSettings {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            loop_period: Duration::from_millis(50),
            sample_interval: Duration::from_secs(1),
            publish_interval: Duration::from_secs(2),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            water_fallback_interval: DEFAULT_FALLBACK_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_loop_period(mut self, period: Duration) -> Self {
        self.loop_period = period;
        self
    }

    #[must_use]
    pub const fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_publish_interval(mut self, interval: Duration) -> Self {
        self.publish_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_water_fallback_interval(mut self, interval: Duration) -> Self {
        self.water_fallback_interval = interval;
        self
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// One sensor acquisition. Channels that failed to read are `None`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SensorSample {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    pub light_lux: Option<f32>,
}

impl SensorSample {
    #[must_use]
    pub const fn new(temperature_c: f32, humidity_pct: f32, light_lux: f32) -> Self {
        Self {
            temperature_c: Some(temperature_c),
            humidity_pct: Some(humidity_pct),
            light_lux: Some(light_lux),
        }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.temperature_c.is_some() && self.humidity_pct.is_some() && self.light_lux.is_some()
    }
}

/// Board-side sensor seam.
pub trait SensorSource {
    fn read(&mut self) -> SensorSample;
}

/// The device: configuration, phase machine, environment monitor, actuators
/// and sync adapter, driven by one cooperative loop.
pub struct DeviceLoop<I, T, S, A> {
    settings: DeviceSettings,
    topics: Topics,
    config: ConfigStore,
    machine: PhaseMachine<I>,
    environment: EnvironmentMonitor,
    driver: ActuatorDriver<I>,
    link: Link<I>,
    outbox: Outbox,
    sampling: Cadence<I>,
    publishing: Cadence<I>,
    transport: T,
    sensors: S,
    actuators: A,
}

impl<I, T, S, A> DeviceLoop<I, T, S, A>
where
    I: DeviceInstant,
    T: Transport,
    S: SensorSource,
    A: Actuators,
{
    /// Builds and boots the device. It starts in `WaitingForConfig`.
    #[must_use]
    pub fn new(
        settings: DeviceSettings,
        topics: Topics,
        transport: T,
        sensors: S,
        actuators: A,
    ) -> Self {
        let mut device = Self {
            settings,
            topics,
            config: ConfigStore::new(),
            machine: PhaseMachine::with_water_fallback(settings.water_fallback_interval),
            environment: EnvironmentMonitor::new(),
            driver: ActuatorDriver::new(),
            link: Link::new(settings.reconnect_interval),
            outbox: Outbox::new(),
            sampling: Cadence::new(settings.sample_interval),
            publishing: Cadence::new(settings.publish_interval),
            transport,
            sensors,
            actuators,
        };
        device.machine.boot(device.config.config());
        device
    }

    #[must_use]
    pub const fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    #[must_use]
    pub const fn topics(&self) -> &Topics {
        &self.topics
    }

    #[must_use]
    pub const fn config(&self) -> &ConfigStore {
        &self.config
    }

    #[must_use]
    pub const fn machine(&self) -> &PhaseMachine<I> {
        &self.machine
    }

    #[must_use]
    pub const fn environment(&self) -> &EnvironmentMonitor {
        &self.environment
    }

    #[must_use]
    pub const fn link(&self) -> &Link<I> {
        &self.link
    }

    #[must_use]
    pub const fn driver(&self) -> &ActuatorDriver<I> {
        &self.driver
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub fn actuators_mut(&mut self) -> &mut A {
        &mut self.actuators
    }

    /// Runs one loop iteration at `now`.
    pub fn run_once(&mut self, now: I) {
        self.service_transport(now);
        self.machine.tick(now, self.config.config());
        self.sample_sensors(now);
        self.stage_notices();
        self.stage_telemetry(now);
        self.flush();
        self.drive_actuators(now);
    }

    /// Applies a decoded event exactly as if it had arrived from the broker.
    pub fn apply(&mut self, event: InboundEvent, now: I) {
        match event {
            InboundEvent::Config(update) => {
                let change = self.config.apply(update);
                self.stage(encode::config(&self.topics, self.config.config()));
                if change.became_ready() {
                    self.machine.on_config_ready();
                }
            }
            InboundEvent::Control(command) => {
                self.machine
                    .handle_control(command, self.config.config(), now);
            }
            InboundEvent::Alert(AlertEvent::Break(signal)) => {
                self.machine.handle_break_alert(signal, now);
            }
            InboundEvent::Alert(AlertEvent::Water(signal)) => {
                self.machine.handle_water_alert(signal, now);
            }
        }
    }

    /// Routes and decodes a raw message, then applies it.
    pub fn receive(&mut self, message: &InboundMessage, now: I) {
        match decode(&self.topics, &message.topic, &message.payload) {
            Ok(Some(event)) => self.apply(event, now),
            Ok(None) => log::trace!("ignoring {}", message.topic),
            Err(err) => {
                log::debug!("{} on {}", CompanionError::from(err), message.topic);
            }
        }
    }

    fn service_transport(&mut self, now: I) {
        if self.link.should_attempt(now) {
            log::info!("connecting to broker");
            if let Err(err) = self.transport.connect() {
                log::warn!("{}: {err:?}", CompanionError::TransportUnavailable);
                self.link.mark_disconnected();
            }
        }

        for _ in 0..MAX_EVENTS_PER_ITERATION {
            let Some(event) = self.transport.poll() else {
                break;
            };
            match event {
                TransportEvent::Connected => self.on_connected(),
                TransportEvent::Disconnected => {
                    if self.link.is_connected() {
                        log::warn!("broker connection lost");
                    }
                    self.link.mark_disconnected();
                }
                TransportEvent::Message(message) => self.receive(&message, now),
            }
        }
    }

    fn on_connected(&mut self) {
        log::info!("broker connected");
        self.link.mark_connected();

        for filter in self.topics.subscriptions() {
            match filter {
                Ok(filter) => {
                    if let Err(err) = self.transport.subscribe(&filter) {
                        log::warn!("subscribe {filter} failed: {err:?}");
                    }
                }
                Err(err) => log::warn!("subscription skipped: {err}"),
            }
        }

        self.stage(encode::system_status(&self.topics, self.machine.system_status()));
        self.stage(encode::config(&self.topics, self.config.config()));
        self.stage(encode::phase(&self.topics, self.machine.phase()));
    }

    fn sample_sensors(&mut self, now: I) {
        if !self.sampling.try_fire(now) {
            return;
        }
        let sample = self.sensors.read();
        if !sample.is_complete() {
            log::debug!("{}", CompanionError::SensorReadFailure);
        }
        if let Some(status) =
            self.environment
                .sample(sample.temperature_c, sample.humidity_pct, sample.light_lux)
        {
            match encode::environment_change(&self.topics, status) {
                Ok(messages) => {
                    for message in messages {
                        self.outbox.push(message);
                    }
                }
                Err(err) => log::warn!("environment update not encoded: {err}"),
            }
        }
    }

    fn stage_notices(&mut self) {
        for notice in self.machine.drain_notices() {
            self.stage(encode::notice(&self.topics, notice));
        }
    }

    fn stage_telemetry(&mut self, now: I) {
        if !self.publishing.try_fire(now) {
            return;
        }
        let snapshot = Telemetry {
            reading: self.environment.last_reading(),
            study_elapsed_secs: self.machine.study_elapsed(now).as_secs(),
            progress_percent: self.machine.progress_percent(now, self.config.config()),
        };
        match encode::telemetry(&self.topics, &snapshot) {
            Ok(messages) => {
                for message in messages {
                    self.outbox.push(message);
                }
            }
            Err(err) => log::warn!("telemetry not encoded: {err}"),
        }
    }

    fn stage(&mut self, message: Result<encode::OutboundMessage, encode::EncodeError>) {
        match message {
            Ok(message) => {
                self.outbox.push(message);
            }
            Err(err) => log::warn!("message not encoded: {err}"),
        }
    }

    /// Publishes staged messages while connected; otherwise drops them.
    ///
    /// Retained state is re-staged on every connect, so nothing is queued
    /// across a disconnect.
    fn flush(&mut self) {
        let staged = self.outbox.take();
        if !self.link.is_connected() {
            if !staged.is_empty() {
                log::trace!("offline, dropped {} messages", staged.len());
            }
            return;
        }

        for message in &staged {
            if let Err(err) = self.transport.publish(message) {
                log::warn!(
                    "{} publishing {}: {err:?}",
                    CompanionError::TransportUnavailable,
                    message.topic
                );
                self.link.mark_disconnected();
                break;
            }
        }
    }

    fn drive_actuators(&mut self, now: I) {
        let view = ActuatorView {
            phase: self.machine.phase(),
            stop_reason: self.machine.stop_reason(),
            water_alarm_active: self.machine.alarms().any_active(),
            environment_ideal: self.environment.is_ideal(),
        };
        self.driver.update(view, now, &mut self.actuators);
    }
}
