//! Front-panel buttons.
//!
//! The three M5Stack buttons are active low. A press is reported when the
//! button is released: a short press selects views 1-3, holding longer than
//! [`LONG_PRESS`] selects views 4-6.

use embassy_time::{Duration, Instant};
use log::debug;

use crate::command::Command;
use crate::views::ViewKind;

/// Hold time after which a press counts as long.
pub const LONG_PRESS: Duration = Duration::from_secs(2);

/// How often button tasks sample their GPIO.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Short,
    Long,
}

impl Button {
    pub const ALL: [Button; 3] = [Button::A, Button::B, Button::C];

    /// View selected by a press of this button.
    pub fn view(self, press: PressKind) -> ViewKind {
        match (self, press) {
            (Button::A, PressKind::Short) => ViewKind::Today,
            (Button::B, PressKind::Short) => ViewKind::WeatherState,
            (Button::C, PressKind::Short) => ViewKind::Temperature,
            (Button::A, PressKind::Long) => ViewKind::Image,
            (Button::B, PressKind::Long) => ViewKind::Wind,
            (Button::C, PressKind::Long) => ViewKind::PressureHumidity,
        }
    }
}

/// Edge detector for one button, fed with polled GPIO levels.
#[derive(Debug, Clone)]
pub struct ButtonMonitor {
    button: Button,
    pressed_at: Option<Instant>,
}

impl ButtonMonitor {
    pub fn new(button: Button) -> Self {
        Self {
            button,
            pressed_at: None,
        }
    }

    pub fn button(&self) -> Button {
        self.button
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    /// Feed one sample. `level_high` is the raw pin level (high = released).
    ///
    /// Returns the command to send when the button has just been released.
    pub fn sample(&mut self, level_high: bool, now: Instant) -> Option<Command> {
        match (self.pressed_at, level_high) {
            (None, false) => {
                self.pressed_at = Some(now);
                None
            }
            (Some(start), true) => {
                self.pressed_at = None;
                let held = now.saturating_duration_since(start);
                let press = if held > LONG_PRESS {
                    PressKind::Long
                } else {
                    PressKind::Short
                };
                debug!("Button {:?} held {} ms", self.button, held.as_millis());
                Some(Command::Show(self.button.view(press)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_short_press_on_release() {
        let mut monitor = ButtonMonitor::new(Button::A);
        assert_eq!(monitor.sample(true, at(0)), None);
        assert_eq!(monitor.sample(false, at(10)), None);
        assert!(monitor.is_pressed());
        assert_eq!(monitor.sample(false, at(500)), None);
        assert_eq!(
            monitor.sample(true, at(510)),
            Some(Command::Show(ViewKind::Today))
        );
        assert!(!monitor.is_pressed());
        assert_eq!(monitor.sample(true, at(520)), None);
    }

    #[test]
    fn test_long_press_selects_second_row() {
        let mut monitor = ButtonMonitor::new(Button::C);
        monitor.sample(false, at(1_000));
        assert_eq!(
            monitor.sample(true, at(3_010)),
            Some(Command::Show(ViewKind::PressureHumidity))
        );
    }

    #[test]
    fn test_exactly_threshold_is_short() {
        let mut monitor = ButtonMonitor::new(Button::B);
        monitor.sample(false, at(0));
        assert_eq!(
            monitor.sample(true, at(2_000)),
            Some(Command::Show(ViewKind::WeatherState))
        );
    }

    #[test]
    fn test_button_view_mapping() {
        let views: [ViewKind; 6] = [
            Button::A.view(PressKind::Short),
            Button::B.view(PressKind::Short),
            Button::C.view(PressKind::Short),
            Button::A.view(PressKind::Long),
            Button::B.view(PressKind::Long),
            Button::C.view(PressKind::Long),
        ];
        assert_eq!(views, ViewKind::ALL);
    }
}
