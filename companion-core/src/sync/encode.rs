//! Outbound message construction.

use core::fmt::{self, Write as _};

use heapless::{String, Vec};

use super::topics::{MAX_TOPIC_LEN, OutboundTopic, TopicError, Topics};
use crate::config::SessionConfig;
use crate::environment::{EnvironmentReading, EnvironmentStatus};
use crate::phase::{Notice, Phase, SystemStatus};

/// Longest payload the device publishes.
pub const MAX_PAYLOAD_LEN: usize = 96;

/// Message ready for the transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutboundMessage {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: String<MAX_PAYLOAD_LEN>,
    pub retain: bool,
}

/// Errors raised while formatting an outbound message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EncodeError {
    Topic(TopicError),
    PayloadTooLong,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Topic(err) => err.fmt(f),
            EncodeError::PayloadTooLong => write!(f, "payload exceeds {MAX_PAYLOAD_LEN} bytes"),
        }
    }
}

impl From<TopicError> for EncodeError {
    fn from(err: TopicError) -> Self {
        EncodeError::Topic(err)
    }
}

impl OutboundMessage {
    /// Formats `payload` for `topic`, taking the retain flag from the topic.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the topic or the formatted payload does not fit.
    pub fn new(
        topics: &Topics,
        topic: OutboundTopic,
        payload: fmt::Arguments<'_>,
    ) -> Result<Self, EncodeError> {
        let mut text = String::new();
        text.write_fmt(payload)
            .map_err(|_| EncodeError::PayloadTooLong)?;
        Ok(Self {
            topic: topics.full(topic.suffix())?,
            payload: text,
            retain: topic.retained(),
        })
    }
}

/// Retained `status/system` token.
///
/// # Errors
///
/// Returns [`EncodeError`] when the topic or payload exceeds its buffer.
pub fn system_status(topics: &Topics, status: SystemStatus) -> Result<OutboundMessage, EncodeError> {
    OutboundMessage::new(topics, OutboundTopic::StatusSystem, format_args!("{status}"))
}

/// Retained `status/phase` label.
///
/// # Errors
///
/// Returns [`EncodeError`] when the topic or payload exceeds its buffer.
pub fn phase(topics: &Topics, phase: Phase) -> Result<OutboundMessage, EncodeError> {
    OutboundMessage::new(topics, OutboundTopic::StatusPhase, format_args!("{phase}"))
}

/// Retained `status/config` summary.
///
/// # Errors
///
/// Returns [`EncodeError`] when the topic or payload exceeds its buffer.
pub fn config(topics: &Topics, config: &SessionConfig) -> Result<OutboundMessage, EncodeError> {
    OutboundMessage::new(topics, OutboundTopic::StatusConfig, format_args!("{config}"))
}

/// Message announcing a phase machine notice.
///
/// # Errors
///
/// Returns [`EncodeError`] when the topic or payload exceeds its buffer.
pub fn notice(topics: &Topics, notice: Notice) -> Result<OutboundMessage, EncodeError> {
    let message = match notice {
        Notice::Status(status) => system_status(topics, status)?,
        Notice::PhaseChanged(next) => phase(topics, next)?,
        Notice::BreakStarted => {
            OutboundMessage::new(topics, OutboundTopic::StatusBreak, format_args!("START"))?
        }
        Notice::BreakEnded => {
            OutboundMessage::new(topics, OutboundTopic::StatusBreak, format_args!("END"))?
        }
        Notice::WaterReminder(id) => OutboundMessage::new(
            topics,
            OutboundTopic::StatusWater,
            format_args!("START:{}", id.get()),
        )?,
        Notice::AlarmsSilenced(_) => {
            OutboundMessage::new(topics, OutboundTopic::StatusWater, format_args!("CLEAR"))?
        }
    };
    Ok(message)
}

/// Edge notification for a new environment label.
///
/// # Errors
///
/// Returns [`EncodeError`] when the topic or payload exceeds its buffer.
pub fn environment_change(
    topics: &Topics,
    status: EnvironmentStatus,
) -> Result<Vec<OutboundMessage, 2>, EncodeError> {
    let mut messages = Vec::new();
    for topic in [OutboundTopic::StatusEnvironment, OutboundTopic::AlertEnvironment] {
        let message = OutboundMessage::new(topics, topic, format_args!("{status}"))?;
        // Capacity matches the topic list.
        let _ = messages.push(message);
    }
    Ok(messages)
}

/// Periodic telemetry snapshot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Telemetry {
    pub reading: Option<EnvironmentReading>,
    pub study_elapsed_secs: u64,
    pub progress_percent: u8,
}

/// Non-retained `data/*` messages for one publish interval.
///
/// # Errors
///
/// Returns [`EncodeError`] when the topic or payload exceeds its buffer.
pub fn telemetry(
    topics: &Topics,
    snapshot: &Telemetry,
) -> Result<Vec<OutboundMessage, 5>, EncodeError> {
    let mut messages = Vec::new();
    if let Some(reading) = snapshot.reading {
        for (topic, value) in [
            (OutboundTopic::DataTemperature, reading.temperature_c),
            (OutboundTopic::DataHumidity, reading.humidity_pct),
            (OutboundTopic::DataLight, reading.light_lux),
        ] {
            let _ = messages.push(OutboundMessage::new(topics, topic, format_args!("{value:.1}"))?);
        }
    }
    let _ = messages.push(OutboundMessage::new(
        topics,
        OutboundTopic::DataElapsed,
        format_args!("{}", snapshot.study_elapsed_secs),
    )?);
    let _ = messages.push(OutboundMessage::new(
        topics,
        OutboundTopic::DataProgress,
        format_args!("{}", snapshot.progress_percent),
    )?);
    Ok(messages)
}
