use std::io::{self, Write};

use companion_core::actuator::{Actuators, BuzzerOutput, BuzzerPattern, LedColor, LedOutput};
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use tracing::warn;

/// Renders the LED and buzzer on the terminal.
///
/// Blink and beep timing is not drawn; a line is printed whenever the LED
/// color or the buzzer pattern changes.
#[derive(Default)]
pub struct TerminalActuators {
    color: Option<LedColor>,
    pattern: Option<BuzzerPattern>,
}

impl TerminalActuators {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn render(&self, line: &str, color: Color) {
        let mut stdout = io::stdout().lock();
        let result = queue!(
            stdout,
            SetForegroundColor(color),
            Print("\u{25cf} "),
            ResetColor,
            Print(line),
            Print("\n"),
        )
        .and_then(|()| stdout.flush());
        if let Err(err) = result {
            warn!("terminal output failed: {err}");
        }
    }
}

impl Actuators for TerminalActuators {
    fn set_led(&mut self, output: LedOutput) {
        if self.color == Some(output.color) {
            return;
        }
        self.color = Some(output.color);
        self.render(&format!("led {}", led_label(output.color)), led_color(output.color));
    }

    fn set_buzzer(&mut self, output: BuzzerOutput) {
        if self.pattern == Some(output.pattern) {
            return;
        }
        self.pattern = Some(output.pattern);
        let color = self.color.map_or(Color::Grey, led_color);
        self.render(&format!("buzzer {}", buzzer_label(output.pattern)), color);
    }
}

fn led_color(color: LedColor) -> Color {
    match color {
        LedColor::Green => Color::Green,
        LedColor::Blue => Color::Blue,
        LedColor::Yellow => Color::Yellow,
        LedColor::Orange => Color::Rgb {
            r: 255,
            g: 140,
            b: 0,
        },
        LedColor::Red => Color::Red,
    }
}

fn led_label(color: LedColor) -> &'static str {
    match color {
        LedColor::Green => "green",
        LedColor::Blue => "blue",
        LedColor::Yellow => "yellow",
        LedColor::Orange => "orange",
        LedColor::Red => "red",
    }
}

fn buzzer_label(pattern: BuzzerPattern) -> &'static str {
    match pattern {
        BuzzerPattern::Silent => "silent",
        BuzzerPattern::WaterChirp => "water chirp",
        BuzzerPattern::BreakChime => "break chime",
        BuzzerPattern::CompletionTone => "completion tone",
        BuzzerPattern::EnvironmentBeep => "environment beep",
    }
}
