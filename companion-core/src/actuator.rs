//! Actuator driver: LED color and buzzer cadence.
//!
//! [`resolve`] is a pure mapping from the machine's observable state to an LED
//! target and a buzzer pattern. [`ActuatorDriver`] turns that target into
//! concrete on/off levels using free-running cooperative timers and forwards
//! only changes to the board through [`Actuators`].
//!
//! | Condition                         | LED            | Buzzer             |
//! |-----------------------------------|----------------|--------------------|
//! | water alarm active                | blue, blinking | water chirp        |
//! | on break                          | yellow         | break chime once   |
//! | stopped after completion          | red            | completion tone    |
//! | stopped by command                | red            | silent             |
//! | studying, environment ideal       | green          | silent             |
//! | studying, environment not ideal   | orange         | environment beep   |
//! | ready                             | green, blinking| silent             |
//! | waiting for config / idle         | blue, blinking | silent             |

use core::time::Duration;

use crate::phase::{Phase, StopReason};
use crate::time::DeviceInstant;

/// Blink half-period.
pub const BLINK_PERIOD: Duration = Duration::from_millis(500);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LedColor {
    Green,
    Blue,
    Yellow,
    Orange,
    Red,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LedMode {
    Solid,
    Blink,
}

/// Desired LED appearance before blink timing is applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LedTarget {
    pub color: LedColor,
    pub mode: LedMode,
}

impl LedTarget {
    const fn solid(color: LedColor) -> Self {
        Self {
            color,
            mode: LedMode::Solid,
        }
    }

    const fn blink(color: LedColor) -> Self {
        Self {
            color,
            mode: LedMode::Blink,
        }
    }
}

/// Buzzer cadences. All timings are evaluated cooperatively.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuzzerPattern {
    Silent,
    /// 200 ms on, 300 ms off, repeating.
    WaterChirp,
    /// Three 150 ms pulses separated by 150 ms gaps, once.
    BreakChime,
    /// One 1 s tone, once.
    CompletionTone,
    /// 100 ms beep every 2 s.
    EnvironmentBeep,
}

impl BuzzerPattern {
    /// Returns whether the buzzer sounds `elapsed` after the pattern was armed.
    #[must_use]
    pub fn is_sounding(self, elapsed: Duration) -> bool {
        let ms = elapsed.as_millis();
        match self {
            BuzzerPattern::Silent => false,
            BuzzerPattern::WaterChirp => ms % 500 < 200,
            BuzzerPattern::BreakChime => ms < 900 && (ms / 150) % 2 == 0,
            BuzzerPattern::CompletionTone => ms < 1_000,
            BuzzerPattern::EnvironmentBeep => ms % 2_000 < 100,
        }
    }

    /// Returns `true` for patterns that sound once per phase entry.
    #[must_use]
    pub const fn plays_once(self) -> bool {
        matches!(self, BuzzerPattern::BreakChime | BuzzerPattern::CompletionTone)
    }
}

/// Inputs to [`resolve`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ActuatorView {
    pub phase: Phase,
    pub stop_reason: Option<StopReason>,
    pub water_alarm_active: bool,
    pub environment_ideal: bool,
}

/// Maps machine state to actuator targets.
///
/// Priority: water alarm > break > stopped > running > ready > waiting.
#[must_use]
pub fn resolve(view: ActuatorView) -> (LedTarget, BuzzerPattern) {
    if view.water_alarm_active {
        return (LedTarget::blink(LedColor::Blue), BuzzerPattern::WaterChirp);
    }

    match view.phase {
        Phase::OnBreak => (LedTarget::solid(LedColor::Yellow), BuzzerPattern::BreakChime),
        Phase::Stopped => {
            let buzzer = if view.stop_reason == Some(StopReason::Completed) {
                BuzzerPattern::CompletionTone
            } else {
                BuzzerPattern::Silent
            };
            (LedTarget::solid(LedColor::Red), buzzer)
        }
        Phase::Studying if view.environment_ideal => {
            (LedTarget::solid(LedColor::Green), BuzzerPattern::Silent)
        }
        Phase::Studying => (
            LedTarget::solid(LedColor::Orange),
            BuzzerPattern::EnvironmentBeep,
        ),
        Phase::Ready => (LedTarget::blink(LedColor::Green), BuzzerPattern::Silent),
        Phase::WaitingForConfig | Phase::Idle => {
            (LedTarget::blink(LedColor::Blue), BuzzerPattern::Silent)
        }
    }
}

/// Free-running blink phase, independent of every other timer.
#[derive(Copy, Clone, Debug)]
pub struct BlinkClock<I> {
    origin: Option<I>,
}

impl<I: DeviceInstant> BlinkClock<I> {
    #[must_use]
    pub const fn new() -> Self {
        Self { origin: None }
    }

    /// Returns `true` during the lit half of the blink cycle.
    pub fn is_lit(&mut self, now: I) -> bool {
        let origin = *self.origin.get_or_insert(now);
        let halves = now.saturating_duration_since(origin).as_millis() / BLINK_PERIOD.as_millis();
        halves % 2 == 0
    }
}

impl<I: DeviceInstant> Default for BlinkClock<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Buzzer pattern armed at an instant.
///
/// One-shot patterns are timed from the entry into the current phase, so a
/// pattern that is preempted and later resumed within the same phase does not
/// play again.
#[derive(Copy, Clone, Debug)]
pub struct BuzzerCadence<I> {
    pattern: BuzzerPattern,
    armed_at: Option<I>,
    entry: Option<(Phase, I)>,
}

impl<I: DeviceInstant> BuzzerCadence<I> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pattern: BuzzerPattern::Silent,
            armed_at: None,
            entry: None,
        }
    }

    #[must_use]
    pub const fn pattern(&self) -> BuzzerPattern {
        self.pattern
    }

    /// Selects `pattern` while in `phase`, restarting its timeline only when it differs.
    pub fn select(&mut self, pattern: BuzzerPattern, phase: Phase, now: I) {
        let entered_at = match self.entry {
            Some((current, at)) if current == phase => at,
            _ => {
                self.entry = Some((phase, now));
                now
            }
        };

        if self.pattern != pattern || self.armed_at.is_none() {
            self.pattern = pattern;
            self.armed_at = Some(if pattern.plays_once() { entered_at } else { now });
        }
    }

    #[must_use]
    pub fn is_sounding(&self, now: I) -> bool {
        self.armed_at.is_some_and(|armed| {
            self.pattern
                .is_sounding(now.saturating_duration_since(armed))
        })
    }
}

impl<I: DeviceInstant> Default for BuzzerCadence<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// Concrete LED level written to the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LedOutput {
    pub color: LedColor,
    pub lit: bool,
}

/// Concrete buzzer level written to the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BuzzerOutput {
    pub pattern: BuzzerPattern,
    pub sounding: bool,
}

/// Board-side output seam.
pub trait Actuators {
    fn set_led(&mut self, output: LedOutput);
    fn set_buzzer(&mut self, output: BuzzerOutput);
}

/// Drives [`Actuators`] from [`ActuatorView`]s, writing only on change.
#[derive(Debug)]
pub struct ActuatorDriver<I> {
    blink: BlinkClock<I>,
    buzzer: BuzzerCadence<I>,
    last_led: Option<LedOutput>,
    last_buzzer: Option<BuzzerOutput>,
}

impl<I: DeviceInstant> ActuatorDriver<I> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            blink: BlinkClock::new(),
            buzzer: BuzzerCadence::new(),
            last_led: None,
            last_buzzer: None,
        }
    }

    /// Last LED level written.
    #[must_use]
    pub const fn led(&self) -> Option<LedOutput> {
        self.last_led
    }

    /// Last buzzer level written.
    #[must_use]
    pub const fn buzzer(&self) -> Option<BuzzerOutput> {
        self.last_buzzer
    }

    /// Evaluates the view at `now` and pushes any changed level to `outputs`.
    pub fn update<A: Actuators>(&mut self, view: ActuatorView, now: I, outputs: &mut A) {
        let (target, pattern) = resolve(view);

        let lit = match target.mode {
            LedMode::Solid => true,
            LedMode::Blink => self.blink.is_lit(now),
        };
        let led = LedOutput {
            color: target.color,
            lit,
        };
        if self.last_led != Some(led) {
            outputs.set_led(led);
            self.last_led = Some(led);
        }

        self.buzzer.select(pattern, view.phase, now);
        let buzzer = BuzzerOutput {
            pattern,
            sounding: self.buzzer.is_sounding(now),
        };
        if self.last_buzzer != Some(buzzer) {
            outputs.set_buzzer(buzzer);
            self.last_buzzer = Some(buzzer);
        }
    }
}

impl<I: DeviceInstant> Default for ActuatorDriver<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(phase: Phase) -> ActuatorView {
        ActuatorView {
            phase,
            stop_reason: None,
            water_alarm_active: false,
            environment_ideal: true,
        }
    }

    #[test]
    fn water_alarm_outranks_everything() {
        for phase in [Phase::Studying, Phase::OnBreak, Phase::Stopped, Phase::Ready] {
            let (led, buzzer) = resolve(ActuatorView {
                water_alarm_active: true,
                ..view(phase)
            });
            assert_eq!(led, LedTarget::blink(LedColor::Blue));
            assert_eq!(buzzer, BuzzerPattern::WaterChirp);
        }
    }

    #[test]
    fn studying_color_follows_environment() {
        assert_eq!(resolve(view(Phase::Studying)).0.color, LedColor::Green);
        let (led, buzzer) = resolve(ActuatorView {
            environment_ideal: false,
            ..view(Phase::Studying)
        });
        assert_eq!(led.color, LedColor::Orange);
        assert_eq!(buzzer, BuzzerPattern::EnvironmentBeep);
    }

    #[test]
    fn completion_tone_only_after_completed_session() {
        let stopped = resolve(view(Phase::Stopped));
        assert_eq!(stopped.1, BuzzerPattern::Silent);
        let completed = resolve(ActuatorView {
            stop_reason: Some(StopReason::Completed),
            ..view(Phase::Stopped)
        });
        assert_eq!(completed.1, BuzzerPattern::CompletionTone);
    }

    #[test]
    fn chime_and_tone_play_once() {
        let chime = BuzzerPattern::BreakChime;
        assert!(chime.is_sounding(Duration::from_millis(0)));
        assert!(!chime.is_sounding(Duration::from_millis(200)));
        assert!(chime.is_sounding(Duration::from_millis(650)));
        assert!(!chime.is_sounding(Duration::from_millis(900)));
        assert!(!chime.is_sounding(Duration::from_secs(60)));

        assert!(BuzzerPattern::CompletionTone.is_sounding(Duration::from_millis(999)));
        assert!(!BuzzerPattern::CompletionTone.is_sounding(Duration::from_millis(1_000)));
    }

    #[test]
    fn water_chirp_repeats() {
        let chirp = BuzzerPattern::WaterChirp;
        assert!(chirp.is_sounding(Duration::from_millis(100)));
        assert!(!chirp.is_sounding(Duration::from_millis(300)));
        assert!(chirp.is_sounding(Duration::from_millis(10_050)));
    }

    #[test]
    fn blink_toggles_every_half_period() {
        let mut blink = BlinkClock::new();
        assert!(blink.is_lit(Ms(0)));
        assert!(blink.is_lit(Ms(499)));
        assert!(!blink.is_lit(Ms(500)));
        assert!(!blink.is_lit(Ms(999)));
        assert!(blink.is_lit(Ms(1_000)));
    }

    #[test]
    fn reselecting_a_pattern_keeps_its_timeline() {
        let mut cadence = BuzzerCadence::new();
        cadence.select(BuzzerPattern::WaterChirp, Phase::Studying, Ms(0));
        cadence.select(BuzzerPattern::WaterChirp, Phase::Studying, Ms(250));
        assert!(!cadence.is_sounding(Ms(250)), "chirp still timed from 0 ms");
        assert!(cadence.is_sounding(Ms(500)));
    }

    #[test]
    fn driver_writes_only_on_change() {
        let mut driver = ActuatorDriver::new();
        let mut outputs = CountingActuators::default();

        for ms in (0..=300).step_by(100) {
            driver.update(view(Phase::Studying), Ms(ms), &mut outputs);
        }
        assert_eq!((outputs.led_writes, outputs.buzzer_writes), (1, 1));

        let mut driver = ActuatorDriver::new();
        let mut outputs = CountingActuators::default();
        for ms in (0..=1_000).step_by(100) {
            driver.update(view(Phase::Ready), Ms(ms), &mut outputs);
        }
        assert_eq!(outputs.led_writes, 3, "lit, dark, lit");
        assert_eq!(outputs.buzzer_writes, 1);
    }

    #[test]
    fn break_chime_does_not_replay_after_water_alarm_clears() {
        let mut driver = ActuatorDriver::new();
        let mut outputs = CountingActuators::default();

        driver.update(view(Phase::OnBreak), Ms(0), &mut outputs);
        assert_eq!(
            driver.buzzer(),
            Some(BuzzerOutput {
                pattern: BuzzerPattern::BreakChime,
                sounding: true,
            })
        );

        let alarmed = ActuatorView {
            water_alarm_active: true,
            ..view(Phase::OnBreak)
        };
        driver.update(alarmed, Ms(2_000), &mut outputs);
        assert_eq!(
            driver.buzzer().map(|buzzer| buzzer.pattern),
            Some(BuzzerPattern::WaterChirp)
        );

        driver.update(view(Phase::OnBreak), Ms(3_000), &mut outputs);
        assert_eq!(
            driver.buzzer(),
            Some(BuzzerOutput {
                pattern: BuzzerPattern::BreakChime,
                sounding: false,
            })
        );

        // A fresh break entry chimes again.
        driver.update(view(Phase::Studying), Ms(4_000), &mut outputs);
        driver.update(view(Phase::OnBreak), Ms(5_000), &mut outputs);
        assert_eq!(driver.buzzer().map(|buzzer| buzzer.sounding), Some(true));
    }

    #[derive(Default)]
    struct CountingActuators {
        led_writes: usize,
        buzzer_writes: usize,
    }

    impl Actuators for CountingActuators {
        fn set_led(&mut self, _output: LedOutput) {
            self.led_writes += 1;
        }

        fn set_buzzer(&mut self, _output: BuzzerOutput) {
            self.buzzer_writes += 1;
        }
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct Ms(u64);

    impl core::ops::Add<Duration> for Ms {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self {
            Self(self.0 + u64::try_from(rhs.as_millis()).unwrap())
        }
    }

    impl DeviceInstant for Ms {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_millis(self.0.saturating_sub(earlier.0))
        }
    }
}
