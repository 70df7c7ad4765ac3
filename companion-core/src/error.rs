//! Error taxonomy shared by the control loop and its platform adapters.

use core::fmt;

use crate::sync::decode::DecodeError;

/// Conditions the device detects and recovers from locally.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompanionError {
    /// The message channel is down or refused an operation; retried on cadence.
    TransportUnavailable,
    /// A session start was requested without a positive duration.
    InvalidConfig,
    /// The sensor source could not produce a complete sample.
    SensorReadFailure,
    /// An inbound message on a known topic could not be decoded.
    MalformedEventPayload(DecodeError),
}

impl fmt::Display for CompanionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompanionError::TransportUnavailable => f.write_str("transport unavailable"),
            CompanionError::InvalidConfig => f.write_str("invalid session configuration"),
            CompanionError::SensorReadFailure => f.write_str("sensor read failure"),
            CompanionError::MalformedEventPayload(err) => write!(f, "malformed payload: {err}"),
        }
    }
}

impl From<DecodeError> for CompanionError {
    fn from(err: DecodeError) -> Self {
        CompanionError::MalformedEventPayload(err)
    }
}
