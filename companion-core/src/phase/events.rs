use core::fmt;

use crate::water::{AlarmId, WaterAlarmSet};

/// Session phase. Exactly one is current at any instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Constructed, not yet booted.
    Idle,
    WaitingForConfig,
    Ready,
    Studying,
    OnBreak,
    Stopped,
}

impl Phase {
    /// Wire label used on `status/phase`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::WaitingForConfig => "waiting_for_config",
            Phase::Ready => "ready",
            Phase::Studying => "studying",
            Phase::OnBreak => "on_break",
            Phase::Stopped => "stopped",
        }
    }

    /// Returns `true` while a session clock is running.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Phase::Studying | Phase::OnBreak)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Token published on `status/system`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SystemStatus {
    Ready,
    Active,
    Stopped,
    Completed,
    WaitingForConfig,
    ConfigError,
}

impl SystemStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            SystemStatus::Ready => "ready",
            SystemStatus::Active => "active",
            SystemStatus::Stopped => "stopped",
            SystemStatus::Completed => "completed",
            SystemStatus::WaitingForConfig => "waiting_for_config",
            SystemStatus::ConfigError => "config_error",
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why the machine entered [`Phase::Stopped`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StopReason {
    Command,
    Completed,
}

/// Commands received on `control/*`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControlCommand {
    Start,
    Stop,
    Reset,
}

impl ControlCommand {
    /// Payload token that fires the command.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            ControlCommand::Start => "START",
            ControlCommand::Stop => "STOP",
            ControlCommand::Reset => "RESET",
        }
    }
}

/// External break override received on `alert/break`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BreakSignal {
    Start,
    End,
}

impl BreakSignal {
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            BreakSignal::Start => "START",
            BreakSignal::End => "END",
        }
    }
}

/// Hydration alarm command received on `alert/water`.
///
/// Ids outside the alarm capacity are kept raw so the machine can log and
/// ignore them; `Ping` carries the already-filtered set.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WaterSignal {
    Start(u32),
    Stop(u32),
    Ping(WaterAlarmSet),
}

/// Outward fact produced by the phase machine during one evaluation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Notice {
    Status(SystemStatus),
    PhaseChanged(Phase),
    /// Break started by the local timer.
    BreakStarted,
    /// Break ended by the local timer.
    BreakEnded,
    /// Local fallback reminder raised on the given slot.
    WaterReminder(AlarmId),
    /// Alarms forced inactive by stop or completion; carries how many were active.
    AlarmsSilenced(u32),
}
