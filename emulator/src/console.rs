//! Operator console.
//!
//! Lines typed on stdin are parsed on a reader thread and handed to the
//! control loop over a channel, so the loop never blocks on input.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use companion_core::device::SensorSample;
use winnow::ModalResult;
use winnow::ascii::{Caseless, dec_int, float, space1};
use winnow::combinator::{alt, cut_err, eof, opt, preceded, terminated};
use winnow::prelude::*;
use winnow::token::{literal, rest, take_till};

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "topic",
        "<topic> [payload]             - inject a message as if the broker sent it",
    ),
    (
        "sensors",
        "sensors <temp> <hum> <lux>    - pin the sensor readings",
    ),
    (
        "sensors",
        "sensors auto                  - follow the simulated day again",
    ),
    (
        "plan",
        "plan <minutes>                - apply the study plan for a duration",
    ),
    (
        "status",
        "status                        - display device state",
    ),
    (
        "help",
        "help                          - show this list",
    ),
    (
        "exit",
        "exit                          - stop the emulator",
    ),
];

#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleCommand {
    /// Topic as typed: a full topic or a suffix under the device prefix.
    Inject { topic: String, payload: String },
    Sensors(SensorSample),
    SensorsAuto,
    Plan(i32),
    Status,
    Help,
    Exit,
}

impl ConsoleCommand {
    /// Parses one trimmed, non-empty console line.
    pub fn parse(line: &str) -> Option<Self> {
        command.parse(line).ok()
    }
}

/// Spawns the stdin reader. End of input is reported as [`ConsoleCommand::Exit`].
pub fn spawn() -> io::Result<Receiver<ConsoleCommand>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match ConsoleCommand::parse(trimmed) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            return;
                        }
                    }
                    None => println!("unrecognized command `{trimmed}`; type `help`"),
                }
            }
            let _ = tx.send(ConsoleCommand::Exit);
        })?;
    Ok(rx)
}

fn command(input: &mut &str) -> ModalResult<ConsoleCommand> {
    alt((
        terminated(literal(Caseless("exit")), eof).value(ConsoleCommand::Exit),
        terminated(literal(Caseless("quit")), eof).value(ConsoleCommand::Exit),
        terminated(literal(Caseless("help")), eof).value(ConsoleCommand::Help),
        terminated(literal(Caseless("status")), eof).value(ConsoleCommand::Status),
        preceded((literal(Caseless("sensors")), space1), cut_err(sensors)),
        preceded((literal(Caseless("plan")), space1), cut_err(dec_int)).map(ConsoleCommand::Plan),
        inject,
    ))
    .parse_next(input)
}

fn sensors(input: &mut &str) -> ModalResult<ConsoleCommand> {
    alt((
        terminated(literal(Caseless("auto")), eof).value(ConsoleCommand::SensorsAuto),
        (float, preceded(space1, float), preceded(space1, float)).map(
            |(temperature, humidity, lux): (f32, f32, f32)| {
                ConsoleCommand::Sensors(SensorSample::new(temperature, humidity, lux))
            },
        ),
    ))
    .parse_next(input)
}

fn inject(input: &mut &str) -> ModalResult<ConsoleCommand> {
    let topic = take_till(1.., [' ', '\t']).parse_next(input)?;
    let payload = opt(preceded(space1, rest)).parse_next(input)?;
    Ok(ConsoleCommand::Inject {
        topic: topic.to_string(),
        payload: payload.unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_and_arguments() {
        assert_eq!(ConsoleCommand::parse("EXIT"), Some(ConsoleCommand::Exit));
        assert_eq!(ConsoleCommand::parse("status"), Some(ConsoleCommand::Status));
        assert_eq!(ConsoleCommand::parse("plan 90"), Some(ConsoleCommand::Plan(90)));
        assert_eq!(
            ConsoleCommand::parse("sensors 31.5 45 300"),
            Some(ConsoleCommand::Sensors(SensorSample::new(31.5, 45.0, 300.0)))
        );
        assert_eq!(
            ConsoleCommand::parse("sensors auto"),
            Some(ConsoleCommand::SensorsAuto)
        );
    }

    #[test]
    fn anything_else_is_an_injected_message() {
        assert_eq!(
            ConsoleCommand::parse("alert/water START:3"),
            Some(ConsoleCommand::Inject {
                topic: "alert/water".into(),
                payload: "START:3".into(),
            })
        );
        assert_eq!(
            ConsoleCommand::parse("swsc/control/start"),
            Some(ConsoleCommand::Inject {
                topic: "swsc/control/start".into(),
                payload: String::new(),
            })
        );
        assert_eq!(
            ConsoleCommand::parse("statusx"),
            Some(ConsoleCommand::Inject {
                topic: "statusx".into(),
                payload: String::new(),
            })
        );
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        assert_eq!(ConsoleCommand::parse("sensors 25 50"), None);
        assert_eq!(ConsoleCommand::parse("sensors 25 50 300 40"), None);
        assert_eq!(ConsoleCommand::parse("plan long"), None);
    }
}
