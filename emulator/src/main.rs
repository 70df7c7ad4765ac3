mod clock;
mod console;
mod display;
mod error;
mod sensors;
mod settings;
mod transport;

use std::env;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::mpsc::TryRecvError;
use std::thread;

use companion_core::device::DeviceLoop;
use companion_core::environment::EnvironmentStatus;
use companion_core::plan::StudyPlan;
use companion_core::sync::{InboundEvent, InboundMessage};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clock::HostInstant;
use console::{ConsoleCommand, HELP_TOPICS};
use display::TerminalActuators;
use error::EmulatorError;
use sensors::SimulatedSensors;
use settings::Settings;
use transport::MqttTransport;

type Device = DeviceLoop<HostInstant, MqttTransport, SimulatedSensors, TerminalActuators>;

fn main() -> Result<(), EmulatorError> {
    let config_path = parse_config_path()?;
    let settings = Settings::load(config_path.as_deref())?;
    init_tracing(&settings);

    let device_settings = settings.device_settings();
    let mut device: Device = DeviceLoop::new(
        device_settings,
        settings.topics()?,
        MqttTransport::new(&settings.broker)?,
        SimulatedSensors::new(settings.day_length()),
        TerminalActuators::new(),
    );
    let commands = console::spawn()?;

    info!("device prefix `{}`", device.topics().prefix());
    println!("Study companion emulator ready. Type `help` for commands or `exit` to quit.");

    'run: loop {
        let now = HostInstant::now();
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if handle(&mut device, command, now).is_break() {
                        break 'run;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'run,
            }
        }

        device.run_once(now);
        thread::sleep(device_settings.loop_period);
    }

    println!("Session closed.");
    Ok(())
}

fn init_tracing(settings: &Settings) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            let level = settings.logger.level.as_str();

            format!("{app_name}={level},companion_core={level}").into()
        }))
        .init();
}

fn parse_config_path() -> Result<Option<PathBuf>, EmulatorError> {
    let mut args = env::args().skip(1);
    let Some(arg) = args.next() else {
        return Ok(None);
    };
    let path = if let Some(value) = arg.strip_prefix("--config=") {
        value.to_string()
    } else if arg == "--config" {
        args.next().ok_or(EmulatorError::Usage)?
    } else {
        return Err(EmulatorError::Usage);
    };
    Ok(Some(PathBuf::from(path)))
}

fn handle(device: &mut Device, command: ConsoleCommand, now: HostInstant) -> ControlFlow<()> {
    match command {
        ConsoleCommand::Inject { topic, payload } => inject(device, &topic, &payload, now),
        ConsoleCommand::Sensors(sample) => {
            device.sensors_mut().pin(sample);
            println!("sensors pinned");
        }
        ConsoleCommand::SensorsAuto => {
            device.sensors_mut().resume();
            println!(
                "sensors following simulated day ({:.0}% through)",
                device.sensors_mut().day_fraction() * 100.0
            );
        }
        ConsoleCommand::Plan(minutes) => apply_plan(device, minutes, now),
        ConsoleCommand::Status => print_status(device, now),
        ConsoleCommand::Help => {
            for (_, detail) in HELP_TOPICS {
                println!("{detail}");
            }
        }
        ConsoleCommand::Exit => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

/// Delivers a console message through the same path as broker traffic.
fn inject(device: &mut Device, topic: &str, payload: &str, now: HostInstant) {
    let topics = device.topics();
    let resolved = if topics.route(topic).is_some() {
        Some(topic.to_string())
    } else {
        topics
            .full(topic)
            .ok()
            .filter(|full| topics.route(full).is_some())
            .map(|full| full.to_string())
    };
    let Some(resolved) = resolved else {
        println!("unknown topic `{topic}`");
        return;
    };

    match InboundMessage::new(&resolved, payload.as_bytes()) {
        Some(message) => device.receive(&message, now),
        None => println!("message on `{resolved}` is too long"),
    }
}

fn apply_plan(device: &mut Device, minutes: i32, now: HostInstant) {
    let plan = StudyPlan::for_duration(minutes);
    for update in plan.config_updates() {
        device.apply(InboundEvent::Config(update), now);
    }
    println!(
        "plan: {} min, {} breaks of {} min every {} min, {} ml water over {} milestones",
        plan.duration_minutes,
        plan.break_count,
        plan.break_length_minutes,
        plan.break_interval_minutes,
        plan.water_total_ml,
        plan.water_milestones.len(),
    );
}

fn print_status(device: &Device, now: HostInstant) {
    let machine = device.machine();
    let config = device.config().config();
    let alarms: Vec<String> = machine
        .alarms()
        .iter()
        .map(|id| id.get().to_string())
        .collect();

    println!("phase: {} ({})", machine.phase(), machine.system_status());
    println!("config: {config}");
    println!(
        "environment: {}",
        device
            .environment()
            .status()
            .map_or("unknown", EnvironmentStatus::label)
    );
    println!("link: {:?}", device.link().state());
    println!(
        "water alarms: {}",
        if alarms.is_empty() {
            "none".to_string()
        } else {
            alarms.join(",")
        }
    );
    println!(
        "studied: {}s ({}%)",
        machine.study_elapsed(now).as_secs(),
        machine.progress_percent(now, config)
    );
}
