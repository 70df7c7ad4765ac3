//! Topic namespace shared by the device and the remote controller.

use core::fmt::{self, Write as _};

use heapless::String;

/// Default namespace prefix.
pub const DEFAULT_PREFIX: &str = "swsc";

/// Longest accepted prefix.
pub const MAX_PREFIX_LEN: usize = 24;
/// Longest full topic handled by the adapter.
pub const MAX_TOPIC_LEN: usize = 64;

/// Subscription filters, relative to the prefix, re-issued on every connect.
pub const SUBSCRIPTIONS: [&str; 3] = ["config/#", "control/#", "alert/#"];

/// Inbound topics the device understands, relative to the prefix.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InboundTopic {
    ConfigDuration,
    ConfigBreakInterval,
    ConfigBreakLength,
    ConfigWaterReminder,
    ControlStart,
    ControlStop,
    ControlReset,
    AlertBreak,
    AlertWater,
}

impl InboundTopic {
    const ALL: [InboundTopic; 9] = [
        InboundTopic::ConfigDuration,
        InboundTopic::ConfigBreakInterval,
        InboundTopic::ConfigBreakLength,
        InboundTopic::ConfigWaterReminder,
        InboundTopic::ControlStart,
        InboundTopic::ControlStop,
        InboundTopic::ControlReset,
        InboundTopic::AlertBreak,
        InboundTopic::AlertWater,
    ];

    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            InboundTopic::ConfigDuration => "config/duration",
            InboundTopic::ConfigBreakInterval => "config/break_interval",
            InboundTopic::ConfigBreakLength => "config/break_length",
            InboundTopic::ConfigWaterReminder => "config/water_reminder",
            InboundTopic::ControlStart => "control/start",
            InboundTopic::ControlStop => "control/stop",
            InboundTopic::ControlReset => "control/reset",
            InboundTopic::AlertBreak => "alert/break",
            InboundTopic::AlertWater => "alert/water",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.suffix() == suffix)
    }
}

/// Outbound topics published by the device, relative to the prefix.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutboundTopic {
    StatusSystem,
    StatusConfig,
    StatusPhase,
    StatusBreak,
    StatusWater,
    StatusEnvironment,
    AlertEnvironment,
    DataTemperature,
    DataHumidity,
    DataLight,
    DataElapsed,
    DataProgress,
}

impl OutboundTopic {
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            OutboundTopic::StatusSystem => "status/system",
            OutboundTopic::StatusConfig => "status/config",
            OutboundTopic::StatusPhase => "status/phase",
            OutboundTopic::StatusBreak => "status/break",
            OutboundTopic::StatusWater => "status/water",
            OutboundTopic::StatusEnvironment => "status/environment",
            OutboundTopic::AlertEnvironment => "alert/environment",
            OutboundTopic::DataTemperature => "data/temperature",
            OutboundTopic::DataHumidity => "data/humidity",
            OutboundTopic::DataLight => "data/light",
            OutboundTopic::DataElapsed => "data/elapsed",
            OutboundTopic::DataProgress => "data/progress",
        }
    }

    /// Whether the broker should keep the last value for late subscribers.
    #[must_use]
    pub const fn retained(self) -> bool {
        matches!(
            self,
            OutboundTopic::StatusSystem | OutboundTopic::StatusConfig | OutboundTopic::StatusPhase
        )
    }
}

/// Errors raised while building topic strings.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TopicError {
    PrefixTooLong,
    InvalidPrefix,
    TopicTooLong,
}

impl fmt::Display for TopicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicError::PrefixTooLong => write!(f, "prefix exceeds {MAX_PREFIX_LEN} bytes"),
            TopicError::InvalidPrefix => f.write_str("prefix must be non-empty without wildcards"),
            TopicError::TopicTooLong => write!(f, "topic exceeds {MAX_TOPIC_LEN} bytes"),
        }
    }
}

/// Prefix-aware topic builder and router.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Topics {
    prefix: String<MAX_PREFIX_LEN>,
}

impl Topics {
    /// Builds a namespace rooted at `prefix` (without trailing slash).
    ///
    /// # Errors
    ///
    /// Rejects empty or wildcard prefixes and prefixes longer than [`MAX_PREFIX_LEN`].
    pub fn new(prefix: &str) -> Result<Self, TopicError> {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() || prefix.contains(['#', '+']) {
            return Err(TopicError::InvalidPrefix);
        }
        let mut owned = String::new();
        owned
            .push_str(prefix)
            .map_err(|_| TopicError::PrefixTooLong)?;
        Ok(Self { prefix: owned })
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full topic for `suffix` under this prefix.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::TopicTooLong`] past [`MAX_TOPIC_LEN`] bytes.
    pub fn full(&self, suffix: &str) -> Result<String<MAX_TOPIC_LEN>, TopicError> {
        let mut topic = String::new();
        write!(topic, "{}/{suffix}", self.prefix).map_err(|_| TopicError::TopicTooLong)?;
        Ok(topic)
    }

    /// Full subscription filters, in subscription order.
    pub fn subscriptions(
        &self,
    ) -> impl Iterator<Item = Result<String<MAX_TOPIC_LEN>, TopicError>> + '_ {
        SUBSCRIPTIONS.into_iter().map(|filter| self.full(filter))
    }

    /// Maps a received topic onto a known inbound topic.
    ///
    /// Foreign namespaces, unknown suffixes and outbound topics echoed back by
    /// the `alert/#` filter all yield `None`.
    #[must_use]
    pub fn route(&self, topic: &str) -> Option<InboundTopic> {
        let suffix = topic
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('/')?;
        InboundTopic::from_suffix(suffix)
    }
}

impl Default for Topics {
    fn default() -> Self {
        let mut prefix = String::new();
        // DEFAULT_PREFIX always fits.
        let _ = prefix.push_str(DEFAULT_PREFIX);
        Self { prefix }
    }
}
