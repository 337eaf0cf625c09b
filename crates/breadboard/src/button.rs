//! Momentary and latching buttons.
//!
//! Buttons drive every one of their S-pins to 255 while active and 0
//! otherwise, once per tick. The editor collaborator sets their
//! state; headless tests call the same methods directly.

use crate::bus::{SBus, SBUS_MAX};

/// Momentary push button: active only while held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressButton {
    pressed: bool,
}

impl PressButton {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn tick(&mut self, sbuses: &mut [SBus]) {
        drive(sbuses, self.pressed);
    }

    pub fn reset(&mut self) {
        self.pressed = false;
    }
}

/// Latching button: each press flips the held state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleButton {
    on: bool,
}

impl ToggleButton {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One press-and-release: flips the latch.
    pub fn press(&mut self) {
        self.on = !self.on;
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn tick(&mut self, sbuses: &mut [SBus]) {
        drive(sbuses, self.on);
    }

    pub fn reset(&mut self) {
        self.on = false;
    }
}

fn drive(sbuses: &mut [SBus], active: bool) {
    let level = if active { SBUS_MAX } else { 0 };
    for pin in sbuses {
        pin.write(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Direction, Position};

    fn pins() -> Vec<SBus> {
        vec![SBus::new("s0", Position::new(0, 0), Direction::Right)]
    }

    #[test]
    fn press_button_follows_state() {
        let mut button = PressButton::new();
        let mut sbuses = pins();
        button.tick(&mut sbuses);
        assert_eq!(sbuses[0].value(), 0);

        button.set_pressed(true);
        button.tick(&mut sbuses);
        assert_eq!(sbuses[0].value(), 255);

        button.set_pressed(false);
        button.tick(&mut sbuses);
        assert_eq!(sbuses[0].value(), 0);
    }

    #[test]
    fn toggle_button_latches() {
        let mut button = ToggleButton::new();
        let mut sbuses = pins();
        button.press();
        button.tick(&mut sbuses);
        assert_eq!(sbuses[0].value(), 255);

        // Stays latched across ticks until pressed again.
        button.tick(&mut sbuses);
        assert_eq!(sbuses[0].value(), 255);

        button.press();
        button.tick(&mut sbuses);
        assert_eq!(sbuses[0].value(), 0);
    }
}
