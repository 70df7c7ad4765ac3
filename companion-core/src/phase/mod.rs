//! Session phase state machine.
//!
//! The machine owns the phase, the session and phase clocks, the accumulated
//! study time and the hydration alarms. It is advanced by inbound events and by
//! [`PhaseMachine::tick`], and reports everything observable as [`Notice`]s
//! collected into a bounded buffer that the caller drains after each
//! evaluation.
//!
//! Study time accumulates only while [`Phase::Studying`]; breaks extend the
//! wall-clock length of a session. Timer-driven transitions are placed on the
//! exact boundary instant rather than on the instant the tick observed them,
//! so a late tick catches up without drifting the schedule.

mod events;

use core::time::Duration;

use heapless::Vec;

pub use self::events::{
    BreakSignal, ControlCommand, Notice, Phase, StopReason, SystemStatus, WaterSignal,
};
use crate::config::SessionConfig;
use crate::error::CompanionError;
use crate::time::{DeviceInstant, minutes};
use crate::water::{AlarmId, DEFAULT_FALLBACK_INTERVAL, WaterAlarmSet, WaterFallback};

/// Notices buffered between drains; overflow is dropped with a warning.
pub const MAX_NOTICES: usize = 32;

/// Upper bound on boundaries resolved by a single tick.
pub const MAX_CATCH_UP_STEPS: usize = 16;

/// Session phase state machine.
pub struct PhaseMachine<I> {
    phase: Phase,
    session_started_at: Option<I>,
    phase_started_at: Option<I>,
    study_elapsed: Duration,
    stop_reason: Option<StopReason>,
    override_pending: bool,
    alarms: WaterAlarmSet,
    fallback: WaterFallback<I>,
    notices: Vec<Notice, MAX_NOTICES>,
}

impl<I: DeviceInstant> PhaseMachine<I> {
    /// Creates an idle machine with the default water fallback interval.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_water_fallback(DEFAULT_FALLBACK_INTERVAL)
    }

    /// Creates an idle machine with a custom fallback interval. Zero disables it.
    #[must_use]
    pub const fn with_water_fallback(interval: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            session_started_at: None,
            phase_started_at: None,
            study_elapsed: Duration::ZERO,
            stop_reason: None,
            override_pending: false,
            alarms: WaterAlarmSet::new(),
            fallback: WaterFallback::new(interval),
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Status token describing the current phase, as re-published on reconnect.
    #[must_use]
    pub const fn system_status(&self) -> SystemStatus {
        match self.phase {
            Phase::Idle | Phase::WaitingForConfig => SystemStatus::WaitingForConfig,
            Phase::Ready => SystemStatus::Ready,
            Phase::Studying | Phase::OnBreak => SystemStatus::Active,
            Phase::Stopped => match self.stop_reason {
                Some(StopReason::Completed) => SystemStatus::Completed,
                _ => SystemStatus::Stopped,
            },
        }
    }

    #[must_use]
    pub const fn alarms(&self) -> &WaterAlarmSet {
        &self.alarms
    }

    #[must_use]
    pub const fn session_started_at(&self) -> Option<I> {
        self.session_started_at
    }

    /// Returns `true` when an external break override is waiting to be honoured.
    #[must_use]
    pub const fn override_pending(&self) -> bool {
        self.override_pending
    }

    /// Study time accumulated up to `now`.
    #[must_use]
    pub fn study_elapsed(&self, now: I) -> Duration {
        match (self.phase, self.phase_started_at) {
            (Phase::Studying, Some(started)) => {
                self.study_elapsed + now.saturating_duration_since(started)
            }
            _ => self.study_elapsed,
        }
    }

    /// Study progress in whole percent of the configured duration.
    #[must_use]
    pub fn progress_percent(&self, now: I, config: &SessionConfig) -> u8 {
        let total = minutes(config.duration_minutes).as_millis();
        if total == 0 {
            return 0;
        }
        let done = self.study_elapsed(now).as_millis().min(total);
        u8::try_from(done * 100 / total).unwrap_or(100)
    }

    /// Removes and returns the notices produced since the last drain.
    pub fn drain_notices(&mut self) -> Vec<Notice, MAX_NOTICES> {
        core::mem::take(&mut self.notices)
    }

    /// Leaves [`Phase::Idle`]; lands on `Ready` when a configuration was retained.
    pub fn boot(&mut self, config: &SessionConfig) {
        if self.phase != Phase::Idle {
            return;
        }
        if config.is_ready() {
            self.enter(Phase::Ready);
            self.push(Notice::Status(SystemStatus::Ready));
        } else {
            self.enter(Phase::WaitingForConfig);
            self.push(Notice::Status(SystemStatus::WaitingForConfig));
        }
    }

    /// Reacts to the configuration store reporting that `ready` became true.
    pub fn on_config_ready(&mut self) {
        if self.phase == Phase::Idle || self.phase.is_running() {
            return;
        }
        if self.phase != Phase::Ready {
            self.stop_reason = None;
            self.enter(Phase::Ready);
        }
        self.push(Notice::Status(SystemStatus::Ready));
    }

    /// Applies a `control/*` command.
    pub fn handle_control(&mut self, command: ControlCommand, config: &SessionConfig, now: I) {
        match command {
            ControlCommand::Start => self.start(config, now),
            ControlCommand::Stop => self.stop(now),
            ControlCommand::Reset => self.reset(config),
        }
    }

    /// Applies an external break override. The controller is authoritative.
    pub fn handle_break_alert(&mut self, signal: BreakSignal, now: I) {
        if !self.phase.is_running() {
            log::debug!("break {} ignored in {}", signal.token(), self.phase);
            return;
        }
        self.override_pending = true;

        match (signal, self.phase) {
            (BreakSignal::Start, Phase::Studying) => {
                self.fold_study_block(now);
                self.enter_at(Phase::OnBreak, now);
            }
            (BreakSignal::End, Phase::OnBreak) => {
                self.enter_at(Phase::Studying, now);
            }
            _ => log::debug!("break {} already in effect", signal.token()),
        }
    }

    /// Applies an `alert/water` command.
    pub fn handle_water_alert(&mut self, signal: WaterSignal, now: I) {
        match signal {
            WaterSignal::Start(raw) => {
                let Some(id) = AlarmId::new(raw) else {
                    log::debug!("water START:{raw} out of range");
                    return;
                };
                if self.alarms.activate(id) {
                    log::info!("water alarm {raw} active");
                } else {
                    log::debug!("water alarm {raw} already active");
                }
                self.fallback.restart(now);
            }
            WaterSignal::Stop(raw) => {
                if self.alarms.deactivate_raw(raw) {
                    log::info!("water alarm {raw} cleared");
                } else {
                    log::debug!("water STOP:{raw} ignored");
                }
            }
            WaterSignal::Ping(listed) => {
                for id in listed.iter() {
                    self.alarms.activate(id);
                }
                if listed.any_active() {
                    self.fallback.restart(now);
                }
            }
        }
    }

    /// Advances timer-driven transitions and the local water fallback to `now`.
    pub fn tick(&mut self, now: I, config: &SessionConfig) {
        let breaks_allowed = !core::mem::take(&mut self.override_pending);

        let mut steps = 0;
        while steps < MAX_CATCH_UP_STEPS && self.advance(now, config, breaks_allowed) {
            steps += 1;
        }

        self.poll_water_fallback(now, config);
    }

    fn start(&mut self, config: &SessionConfig, now: I) {
        if self.phase == Phase::Idle {
            log::warn!("start ignored before boot");
            return;
        }
        if self.phase.is_running() {
            self.push(Notice::Status(SystemStatus::Active));
            return;
        }
        if config.duration_minutes < 0 {
            log::warn!(
                "start rejected: {} (duration {})",
                CompanionError::InvalidConfig,
                config.duration_minutes
            );
            self.push(Notice::Status(SystemStatus::ConfigError));
            return;
        }
        if !config.is_ready() {
            log::info!("start rejected: waiting for config");
            self.push(Notice::Status(SystemStatus::WaitingForConfig));
            return;
        }

        self.alarms.clear();
        self.study_elapsed = Duration::ZERO;
        self.stop_reason = None;
        self.override_pending = false;
        self.session_started_at = Some(now);
        self.fallback.restart(now);
        self.enter_at(Phase::Studying, now);
        self.push(Notice::Status(SystemStatus::Active));
    }

    fn stop(&mut self, now: I) {
        if self.phase == Phase::Idle {
            log::warn!("stop ignored before boot");
            return;
        }
        self.fold_study_block(now);
        self.finish(StopReason::Command);
        self.push(Notice::Status(SystemStatus::Stopped));
    }

    fn reset(&mut self, config: &SessionConfig) {
        if self.phase == Phase::Idle {
            log::warn!("reset ignored before boot");
            return;
        }
        let silenced = self.alarms.clear().active_count();
        if silenced > 0 {
            self.push(Notice::AlarmsSilenced(silenced));
        }
        self.fallback.disarm();
        self.study_elapsed = Duration::ZERO;
        self.stop_reason = None;
        self.override_pending = false;
        self.session_started_at = None;

        if config.is_ready() {
            self.enter(Phase::Ready);
            self.push(Notice::Status(SystemStatus::Ready));
        } else {
            self.enter(Phase::WaitingForConfig);
            self.push(Notice::Status(SystemStatus::WaitingForConfig));
        }
    }

    /// Resolves at most one boundary; returns `true` when another may follow.
    fn advance(&mut self, now: I, config: &SessionConfig, breaks_allowed: bool) -> bool {
        let Some(started) = self.phase_started_at else {
            return false;
        };

        match self.phase {
            Phase::Studying => {
                let total = minutes(config.duration_minutes);
                let remaining = total.saturating_sub(self.study_elapsed);
                let block = if breaks_allowed && config.has_breaks() {
                    remaining.min(minutes(config.break_interval_minutes))
                } else {
                    remaining
                };

                let boundary = started + block;
                if now < boundary {
                    return false;
                }

                self.study_elapsed += block;
                if self.study_elapsed >= total {
                    self.complete();
                    return false;
                }

                self.enter_at(Phase::OnBreak, boundary);
                self.push(Notice::BreakStarted);
                true
            }
            Phase::OnBreak => {
                if self.study_elapsed >= minutes(config.duration_minutes) {
                    self.complete();
                    return false;
                }
                // Zero-length breaks only end on an external END.
                if !breaks_allowed || config.break_length_minutes <= 0 {
                    return false;
                }
                let boundary = started + minutes(config.break_length_minutes);
                if now < boundary {
                    return false;
                }

                self.enter_at(Phase::Studying, boundary);
                self.push(Notice::BreakEnded);
                true
            }
            _ => false,
        }
    }

    fn poll_water_fallback(&mut self, now: I, config: &SessionConfig) {
        if !config.water_reminder_enabled || !self.phase.is_running() {
            return;
        }
        if !self.fallback.is_due(now) {
            return;
        }

        self.fallback.restart(now);
        match self.alarms.first_free() {
            Some(id) => {
                self.alarms.activate(id);
                log::info!("local water reminder on slot {}", id.get());
                self.push(Notice::WaterReminder(id));
            }
            None => log::warn!("local water reminder skipped: all slots active"),
        }
    }

    fn fold_study_block(&mut self, now: I) {
        if let (Phase::Studying, Some(started)) = (self.phase, self.phase_started_at) {
            self.study_elapsed += now.saturating_duration_since(started);
            self.phase_started_at = Some(now);
        }
    }

    fn complete(&mut self) {
        log::info!("session completed after {}s of study", self.study_elapsed.as_secs());
        self.finish(StopReason::Completed);
        self.push(Notice::Status(SystemStatus::Completed));
    }

    fn finish(&mut self, reason: StopReason) {
        let silenced = self.alarms.clear().active_count();
        self.fallback.disarm();
        self.override_pending = false;
        self.stop_reason = Some(reason);
        self.enter(Phase::Stopped);
        if silenced > 0 {
            self.push(Notice::AlarmsSilenced(silenced));
        }
    }

    fn enter(&mut self, phase: Phase) {
        if phase != Phase::Studying && phase != Phase::OnBreak {
            self.phase_started_at = None;
        }
        self.transition(phase);
    }

    fn enter_at(&mut self, phase: Phase, at: I) {
        self.phase_started_at = Some(at);
        self.transition(phase);
    }

    fn transition(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        log::info!("phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.push(Notice::PhaseChanged(phase));
    }

    fn push(&mut self, notice: Notice) {
        if self.notices.push(notice).is_err() {
            log::warn!("notice buffer full, dropping {notice:?}");
        }
    }
}

impl<I: DeviceInstant> Default for PhaseMachine<I> {
    fn default() -> Self {
        Self::new()
    }
}
