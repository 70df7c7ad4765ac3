use core::ops::Add;
use core::time::Duration;
use std::collections::VecDeque;

use companion_core::actuator::{Actuators, BuzzerOutput, BuzzerPattern, LedColor, LedOutput};
use companion_core::config::ConfigUpdate;
use companion_core::device::{DeviceLoop, DeviceSettings, SensorSample, SensorSource};
use companion_core::phase::{ControlCommand, Phase};
use companion_core::sync::{
    InboundEvent, InboundMessage, OutboundMessage, Topics, Transport, TransportEvent,
};

#[test]
fn reconnect_attempts_respect_interval_and_resubscribe() {
    let mut device = build_device();

    device.run_once(MockInstant::millis(0));
    assert_eq!(device.transport_mut().connect_attempts, 1);

    for ms in (100..5_000).step_by(100) {
        device.run_once(MockInstant::millis(ms));
    }
    assert_eq!(
        device.transport_mut().connect_attempts,
        1,
        "no retry before the reconnect interval"
    );

    device.run_once(MockInstant::millis(5_000));
    assert_eq!(device.transport_mut().connect_attempts, 2);
    assert_eq!(device.link().last_attempt(), Some(MockInstant::millis(5_000)));

    device.transport_mut().events.push_back(TransportEvent::Connected);
    device.run_once(MockInstant::millis(5_100));
    assert!(device.link().is_connected());
    assert_eq!(
        device.transport_mut().subscriptions,
        vec!["swsc/config/#", "swsc/control/#", "swsc/alert/#"]
    );

    device.transport_mut().events.push_back(TransportEvent::Disconnected);
    device.run_once(MockInstant::millis(5_200));
    device.run_once(MockInstant::millis(9_900));
    assert_eq!(device.transport_mut().connect_attempts, 2);
    device.run_once(MockInstant::millis(10_000));
    assert_eq!(device.transport_mut().connect_attempts, 3);

    device.transport_mut().events.push_back(TransportEvent::Connected);
    device.run_once(MockInstant::millis(10_100));
    assert_eq!(device.transport_mut().subscriptions.len(), 6);
}

#[test]
fn connect_republishes_retained_state() {
    let mut device = build_device();
    connect(&mut device, 0);

    let retained: Vec<(String, String)> = device
        .transport_mut()
        .published
        .iter()
        .filter(|message| message.retain)
        .map(|message| (message.topic.to_string(), message.payload.to_string()))
        .collect();

    assert!(retained.contains(&("swsc/status/system".into(), "waiting_for_config".into())));
    assert!(retained.contains(&("swsc/status/phase".into(), "waiting_for_config".into())));
    assert!(retained.contains(&(
        "swsc/status/config".into(),
        "duration=0;break_interval=0;break_length=0;water_reminder=off".into()
    )));
}

#[test]
fn broker_messages_drive_the_session() {
    let mut device = build_device();
    connect(&mut device, 0);

    deliver(&mut device, "swsc/config/duration", "25");
    deliver(&mut device, "swsc/config/break_interval", "20");
    deliver(&mut device, "swsc/config/break_length", "5");
    device.run_once(MockInstant::millis(100));
    assert_eq!(device.machine().phase(), Phase::Ready);
    assert!(device.config().is_ready());

    deliver(&mut device, "swsc/control/start", "START");
    device.run_once(MockInstant::millis(200));
    assert_eq!(device.machine().phase(), Phase::Studying);
    assert!(device.transport_mut().saw("swsc/status/system", "active"));

    let twenty_minutes = 200 + 20 * 60_000;
    device.run_once(MockInstant::millis(twenty_minutes));
    assert_eq!(device.machine().phase(), Phase::OnBreak);
    assert!(device.transport_mut().saw("swsc/status/break", "START"));
}

#[test]
fn malformed_and_foreign_messages_are_dropped() {
    let mut device = build_device();
    connect(&mut device, 0);

    deliver(&mut device, "swsc/config/duration", "twenty");
    deliver(&mut device, "swsc/control/start", "GO");
    deliver(&mut device, "swsc/alert/environment", "too_hot");
    deliver(&mut device, "elsewhere/config/duration", "25");
    device.run_once(MockInstant::millis(100));

    assert_eq!(device.config().config().duration_minutes, 0);
    assert_eq!(device.machine().phase(), Phase::WaitingForConfig);
}

#[test]
fn duplicate_water_start_is_idempotent() {
    let mut device = build_device();
    connect(&mut device, 0);

    deliver(&mut device, "swsc/alert/water", "START:3");
    deliver(&mut device, "swsc/alert/water", "START:3");
    device.run_once(MockInstant::millis(100));
    assert_eq!(device.machine().alarms().active_count(), 1);
    assert_eq!(
        device.driver().led().map(|led| led.color),
        Some(LedColor::Blue)
    );
    assert_eq!(
        device.driver().buzzer().map(|buzzer| buzzer.pattern),
        Some(BuzzerPattern::WaterChirp)
    );

    deliver(&mut device, "swsc/alert/water", "STOP:3");
    deliver(&mut device, "swsc/alert/water", "STOP:99");
    device.run_once(MockInstant::millis(200));
    assert!(!device.machine().alarms().any_active());
}

#[test]
fn environment_changes_publish_once_per_transition() {
    let mut device = build_device();
    connect(&mut device, 0);

    device.sensors_mut().queue(SensorSample::new(32.0, 50.0, 500.0));
    device.sensors_mut().queue(SensorSample::new(32.5, 50.0, 500.0));
    device.sensors_mut().queue(SensorSample::new(25.0, 50.0, 500.0));
    device.sensors_mut().queue(SensorSample::new(25.0, 50.0, 500.0));
    for second in 1..=4 {
        device.run_once(MockInstant::millis(second * 1_000));
    }

    let labels: Vec<String> = device
        .transport_mut()
        .published
        .iter()
        .filter(|message| message.topic.as_str() == "swsc/alert/environment")
        .map(|message| message.payload.to_string())
        .collect();
    assert_eq!(labels, vec!["too_hot", "ideal"]);
}

#[test]
fn failed_sensor_read_keeps_previous_label() {
    let mut device = build_device();

    device.sensors_mut().queue(SensorSample::new(25.0, 50.0, 500.0));
    device.sensors_mut().queue(SensorSample {
        temperature_c: None,
        ..SensorSample::new(35.0, 50.0, 500.0)
    });
    device.run_once(MockInstant::millis(0));
    device.run_once(MockInstant::millis(1_000));

    assert!(device.environment().is_ideal());
}

#[test]
fn machine_keeps_running_while_offline() {
    let mut device = build_device();
    device.transport_mut().refuse_connect = true;
    device.run_once(MockInstant::millis(0));

    device.apply(
        InboundEvent::Config(ConfigUpdate::Duration(1)),
        MockInstant::millis(0),
    );
    device.apply(
        InboundEvent::Control(ControlCommand::Start),
        MockInstant::millis(0),
    );
    device.run_once(MockInstant::millis(10));
    assert_eq!(device.machine().phase(), Phase::Studying);

    device.run_once(MockInstant::millis(60_000));
    assert_eq!(device.machine().phase(), Phase::Stopped);
    assert!(device.transport_mut().published.is_empty());
    assert_eq!(
        device.actuators_mut().led.map(|led| led.color),
        Some(LedColor::Red)
    );
    assert_eq!(
        device.actuators_mut().buzzer.map(|buzzer| buzzer.pattern),
        Some(BuzzerPattern::CompletionTone)
    );
}

type TestDevice = DeviceLoop<MockInstant, MockTransport, MockSensors, MockActuators>;

fn build_device() -> TestDevice {
    DeviceLoop::new(
        DeviceSettings::new(),
        Topics::default(),
        MockTransport::default(),
        MockSensors::default(),
        MockActuators::default(),
    )
}

fn connect(device: &mut TestDevice, at_ms: u64) {
    device.transport_mut().events.push_back(TransportEvent::Connected);
    device.run_once(MockInstant::millis(at_ms));
}

fn deliver(device: &mut TestDevice, topic: &str, payload: &str) {
    let message = InboundMessage::new(topic, payload.as_bytes()).expect("fits");
    device
        .transport_mut()
        .events
        .push_back(TransportEvent::Message(message));
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
struct MockInstant(u64);

impl MockInstant {
    const fn millis(value: u64) -> Self {
        Self(value)
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_millis()).unwrap())
    }
}

impl companion_core::time::DeviceInstant for MockInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

#[derive(Default)]
struct MockTransport {
    refuse_connect: bool,
    connect_attempts: usize,
    subscriptions: Vec<String>,
    published: Vec<OutboundMessage>,
    events: VecDeque<TransportEvent>,
}

impl MockTransport {
    fn saw(&self, topic: &str, payload: &str) -> bool {
        self.published
            .iter()
            .any(|message| message.topic.as_str() == topic && message.payload.as_str() == payload)
    }
}

impl Transport for MockTransport {
    type Error = &'static str;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.connect_attempts += 1;
        if self.refuse_connect {
            Err("refused")
        } else {
            Ok(())
        }
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), Self::Error> {
        self.subscriptions.push(filter.to_string());
        Ok(())
    }

    fn publish(&mut self, message: &OutboundMessage) -> Result<(), Self::Error> {
        self.published.push(message.clone());
        Ok(())
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }
}

#[derive(Default)]
struct MockSensors {
    queued: VecDeque<SensorSample>,
}

impl MockSensors {
    fn queue(&mut self, sample: SensorSample) {
        self.queued.push_back(sample);
    }
}

impl SensorSource for MockSensors {
    fn read(&mut self) -> SensorSample {
        self.queued.pop_front().unwrap_or_default()
    }
}

#[derive(Default)]
struct MockActuators {
    led: Option<LedOutput>,
    buzzer: Option<BuzzerOutput>,
}

impl Actuators for MockActuators {
    fn set_led(&mut self, output: LedOutput) {
        self.led = Some(output);
    }

    fn set_buzzer(&mut self, output: BuzzerOutput) {
        self.buzzer = Some(output);
    }
}
