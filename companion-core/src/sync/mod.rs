//! Sync channel adapter.
//!
//! Bridges the publish/subscribe transport and the rest of the core: inbound
//! messages are routed and decoded into [`InboundEvent`]s, outbound facts are
//! formatted into [`OutboundMessage`]s and staged in an [`Outbox`], and the
//! [`Link`] tracks connectivity and paces reconnect attempts.

pub mod decode;
pub mod encode;
pub mod topics;

use core::fmt;
use core::time::Duration;

use heapless::{String, Vec};

pub use self::decode::{AlertEvent, DecodeError, InboundEvent, decode};
pub use self::encode::{MAX_PAYLOAD_LEN, OutboundMessage};
pub use self::topics::{MAX_TOPIC_LEN, Topics};
use crate::time::{Cadence, DeviceInstant};

/// Default interval between connection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Messages staged between two transport flushes.
pub const OUTBOX_CAPACITY: usize = 40;

/// Raw message handed over by the transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InboundMessage {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundMessage {
    /// Copies a topic and payload, returning `None` when either exceeds capacity.
    #[must_use]
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let mut owned_topic = String::new();
        owned_topic.push_str(topic).ok()?;
        let owned_payload = Vec::from_slice(payload).ok()?;
        Some(Self {
            topic: owned_topic,
            payload: owned_payload,
        })
    }
}

/// Events surfaced by a transport when polled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Message(InboundMessage),
}

/// Publish/subscribe transport seam.
///
/// Every method must return promptly. `connect` only begins an attempt; its
/// outcome is reported later through [`Transport::poll`].
pub trait Transport {
    type Error: fmt::Debug;

    /// Begins a connection attempt.
    ///
    /// # Errors
    ///
    /// Returns an error when the attempt cannot even be started.
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error when the request cannot be queued.
    fn subscribe(&mut self, filter: &str) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error when the message cannot be queued; the loop then
    /// treats the link as down.
    fn publish(&mut self, message: &OutboundMessage) -> Result<(), Self::Error>;

    /// Returns the next pending event, if any.
    fn poll(&mut self) -> Option<TransportEvent>;
}

/// Connectivity as seen by the control loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Connection state plus the fixed-interval reconnect pacing.
#[derive(Copy, Clone, Debug)]
pub struct Link<I> {
    state: LinkState,
    attempts: Cadence<I>,
}

impl<I: DeviceInstant> Link<I> {
    #[must_use]
    pub const fn new(reconnect_interval: Duration) -> Self {
        Self {
            state: LinkState::Disconnected,
            attempts: Cadence::new(reconnect_interval),
        }
    }

    #[must_use]
    pub const fn state(&self) -> LinkState {
        self.state
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, LinkState::Connected)
    }

    /// Instant of the most recent connection attempt.
    #[must_use]
    pub const fn last_attempt(&self) -> Option<I> {
        self.attempts.last()
    }

    /// Returns `true` when a connection attempt should be made at `now`.
    ///
    /// An attempt still pending after a full interval counts as failed.
    pub fn should_attempt(&mut self, now: I) -> bool {
        if self.is_connected() || !self.attempts.try_fire(now) {
            return false;
        }
        self.state = LinkState::Connecting;
        true
    }

    pub fn mark_connected(&mut self) {
        self.state = LinkState::Connected;
    }

    /// Drops back to disconnected; the next attempt still honours the interval.
    pub fn mark_disconnected(&mut self) {
        self.state = LinkState::Disconnected;
    }
}

/// Bounded staging area for outbound messages.
///
/// Messages pushed while full are dropped.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    messages: Vec<OutboundMessage, OUTBOX_CAPACITY>,
}

impl Outbox {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Stages `message`; returns `false` when it was dropped.
    pub fn push(&mut self, message: OutboundMessage) -> bool {
        match self.messages.push(message) {
            Ok(()) => true,
            Err(dropped) => {
                log::warn!("outbox full, dropping {}", dropped.topic);
                false
            }
        }
    }

    /// Removes every staged message in push order.
    pub fn take(&mut self) -> Vec<OutboundMessage, OUTBOX_CAPACITY> {
        core::mem::take(&mut self.messages)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_message_rejects_oversized_topic() {
        let long = [b'a'; MAX_TOPIC_LEN + 1];
        let topic = core::str::from_utf8(&long).unwrap();
        assert!(InboundMessage::new(topic, b"1").is_none());
        assert!(InboundMessage::new("swsc/config/duration", b"25").is_some());
    }

    #[test]
    fn outbox_drops_overflow() {
        let topics = Topics::default();
        let mut outbox = Outbox::new();
        let status = encode::system_status(&topics, crate::phase::SystemStatus::Active).unwrap();
        for _ in 0..OUTBOX_CAPACITY {
            assert!(outbox.push(status.clone()));
        }
        assert!(!outbox.push(encode::notice(&topics, crate::phase::Notice::BreakStarted).unwrap()));
        assert_eq!(outbox.len(), OUTBOX_CAPACITY);

        let staged = outbox.take();
        assert!(staged.iter().all(|message| message.retain));
        assert!(outbox.is_empty());
    }
}
