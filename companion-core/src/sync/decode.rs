//! Inbound payload decoding.
//!
//! Topics are routed by [`Topics::route`]; the payload grammar for each topic
//! is a small `winnow` parser over the trimmed UTF-8 text. Unknown topics are
//! not an error and decode to `Ok(None)`.

use core::fmt;

use winnow::ModalResult;
use winnow::ascii::{Caseless, dec_int, dec_uint};
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;
use winnow::token::literal;

use super::topics::{InboundTopic, Topics};
use crate::config::ConfigUpdate;
use crate::phase::{BreakSignal, ControlCommand, WaterSignal};
use crate::water::WaterAlarmSet;

/// Decoded inbound message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InboundEvent {
    Config(ConfigUpdate),
    Control(ControlCommand),
    Alert(AlertEvent),
}

/// Alerts published by the remote controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AlertEvent {
    Break(BreakSignal),
    Water(WaterSignal),
}

/// Reasons a payload on a known topic was rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DecodeError {
    NotUtf8,
    InvalidInteger(InboundTopic),
    InvalidFlag,
    UnexpectedControlToken(ControlCommand),
    InvalidBreakSignal,
    InvalidWaterCommand,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NotUtf8 => f.write_str("payload is not UTF-8"),
            DecodeError::InvalidInteger(topic) => {
                write!(f, "{} expects a signed integer", topic.suffix())
            }
            DecodeError::InvalidFlag => {
                f.write_str("config/water_reminder expects on|off|true|false|1|0")
            }
            DecodeError::UnexpectedControlToken(command) => {
                write!(f, "control payload must be empty or {}", command.token())
            }
            DecodeError::InvalidBreakSignal => f.write_str("alert/break expects START or END"),
            DecodeError::InvalidWaterCommand => {
                f.write_str("alert/water expects START:<id>, STOP:<id> or PING:<id>,...")
            }
        }
    }
}

/// Decodes a message received on `topic`.
///
/// Returns `Ok(None)` for topics outside the inbound set.
///
/// # Errors
///
/// Returns [`DecodeError`] when a routed payload does not match its grammar.
pub fn decode(
    topics: &Topics,
    topic: &str,
    payload: &[u8],
) -> Result<Option<InboundEvent>, DecodeError> {
    let Some(route) = topics.route(topic) else {
        return Ok(None);
    };
    let text = core::str::from_utf8(payload)
        .map_err(|_| DecodeError::NotUtf8)?
        .trim();

    let event = match route {
        InboundTopic::ConfigDuration => {
            InboundEvent::Config(ConfigUpdate::Duration(integer(route, text)?))
        }
        InboundTopic::ConfigBreakInterval => {
            InboundEvent::Config(ConfigUpdate::BreakInterval(integer(route, text)?))
        }
        InboundTopic::ConfigBreakLength => {
            InboundEvent::Config(ConfigUpdate::BreakLength(integer(route, text)?))
        }
        InboundTopic::ConfigWaterReminder => InboundEvent::Config(ConfigUpdate::WaterReminder(
            flag.parse(text).map_err(|_| DecodeError::InvalidFlag)?,
        )),
        InboundTopic::ControlStart => InboundEvent::Control(control(ControlCommand::Start, text)?),
        InboundTopic::ControlStop => InboundEvent::Control(control(ControlCommand::Stop, text)?),
        InboundTopic::ControlReset => InboundEvent::Control(control(ControlCommand::Reset, text)?),
        InboundTopic::AlertBreak => InboundEvent::Alert(AlertEvent::Break(
            break_signal
                .parse(text)
                .map_err(|_| DecodeError::InvalidBreakSignal)?,
        )),
        InboundTopic::AlertWater => InboundEvent::Alert(AlertEvent::Water(
            water_signal
                .parse(text)
                .map_err(|_| DecodeError::InvalidWaterCommand)?,
        )),
    };

    Ok(Some(event))
}

fn integer(route: InboundTopic, text: &str) -> Result<i32, DecodeError> {
    signed.parse(text).map_err(|_| DecodeError::InvalidInteger(route))
}

/// Control topics fire on an empty payload or on their own token.
fn control(command: ControlCommand, text: &str) -> Result<ControlCommand, DecodeError> {
    if text.is_empty() || text.eq_ignore_ascii_case(command.token()) {
        Ok(command)
    } else {
        Err(DecodeError::UnexpectedControlToken(command))
    }
}

fn signed(input: &mut &str) -> ModalResult<i32> {
    dec_int.parse_next(input)
}

fn flag(input: &mut &str) -> ModalResult<bool> {
    alt((
        literal(Caseless("true")).value(true),
        literal(Caseless("false")).value(false),
        literal(Caseless("off")).value(false),
        literal(Caseless("on")).value(true),
        literal("1").value(true),
        literal("0").value(false),
    ))
    .parse_next(input)
}

fn break_signal(input: &mut &str) -> ModalResult<BreakSignal> {
    alt((
        literal(Caseless("START")).value(BreakSignal::Start),
        literal(Caseless("END")).value(BreakSignal::End),
    ))
    .parse_next(input)
}

fn water_signal(input: &mut &str) -> ModalResult<WaterSignal> {
    alt((
        preceded(literal(Caseless("START:")), alarm_id).map(WaterSignal::Start),
        preceded(literal(Caseless("STOP:")), alarm_id).map(WaterSignal::Stop),
        preceded(literal(Caseless("PING:")), alarm_list).map(WaterSignal::Ping),
    ))
    .parse_next(input)
}

fn alarm_id(input: &mut &str) -> ModalResult<u32> {
    dec_uint.parse_next(input)
}

/// Comma separated ids; an empty list and out-of-range ids are tolerated.
fn alarm_list(input: &mut &str) -> ModalResult<WaterAlarmSet> {
    let mut set = WaterAlarmSet::new();
    let Some(first) = opt(alarm_id).parse_next(input)? else {
        return Ok(set);
    };
    set.activate_raw(first);
    while let Some(next) = opt(preceded(',', alarm_id)).parse_next(input)? {
        set.activate_raw(next);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(topic: &str, payload: &str) -> Result<Option<InboundEvent>, DecodeError> {
        decode(&Topics::default(), topic, payload.as_bytes())
    }

    #[test]
    fn decodes_signed_config_values() {
        assert_eq!(
            run("swsc/config/duration", " 25\n"),
            Ok(Some(InboundEvent::Config(ConfigUpdate::Duration(25))))
        );
        assert_eq!(
            run("swsc/config/break_length", "-5"),
            Ok(Some(InboundEvent::Config(ConfigUpdate::BreakLength(-5))))
        );
        assert_eq!(
            run("swsc/config/break_interval", "20min"),
            Err(DecodeError::InvalidInteger(InboundTopic::ConfigBreakInterval))
        );
    }

    #[test]
    fn water_reminder_flag_is_case_insensitive() {
        for (payload, expected) in [("ON", true), ("off", false), ("True", true), ("0", false)] {
            assert_eq!(
                run("swsc/config/water_reminder", payload),
                Ok(Some(InboundEvent::Config(ConfigUpdate::WaterReminder(
                    expected
                ))))
            );
        }
        assert_eq!(
            run("swsc/config/water_reminder", "maybe"),
            Err(DecodeError::InvalidFlag)
        );
    }

    #[test]
    fn control_fires_on_empty_or_matching_token() {
        let start = Ok(Some(InboundEvent::Control(ControlCommand::Start)));
        assert_eq!(run("swsc/control/start", ""), start);
        assert_eq!(run("swsc/control/start", "START"), start);
        assert_eq!(
            run("swsc/control/start", "STOP"),
            Err(DecodeError::UnexpectedControlToken(ControlCommand::Start))
        );
    }

    #[test]
    fn water_commands_parse_ids() {
        assert_eq!(
            run("swsc/alert/water", "START:3"),
            Ok(Some(InboundEvent::Alert(AlertEvent::Water(WaterSignal::Start(3)))))
        );
        assert_eq!(
            run("swsc/alert/water", "STOP:99"),
            Ok(Some(InboundEvent::Alert(AlertEvent::Water(WaterSignal::Stop(99)))))
        );

        let Ok(Some(InboundEvent::Alert(AlertEvent::Water(WaterSignal::Ping(set))))) =
            run("swsc/alert/water", "PING:0,2,40")
        else {
            panic!("expected ping");
        };
        assert_eq!(set.active_count(), 2);

        assert_eq!(
            run("swsc/alert/water", "START:"),
            Err(DecodeError::InvalidWaterCommand)
        );
    }

    #[test]
    fn unknown_topics_are_dropped() {
        assert_eq!(run("swsc/alert/environment", "too_hot"), Ok(None));
        assert_eq!(run("swsc/status/system", "active"), Ok(None));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert_eq!(
            decode(&Topics::default(), "swsc/alert/break", &[0xff, 0xfe]),
            Err(DecodeError::NotUtf8)
        );
    }
}
