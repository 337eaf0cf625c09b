//! LED indicator.

use crate::bus::SBUS_MAX;

/// An LED lit by the strongest signal on any of its S-pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Led {
    /// `0xRRGGBB` render hint for the canvas collaborator.
    pub color: u32,
    value: i64,
}

impl Led {
    #[must_use]
    pub fn new(color: u32) -> Self {
        Self { color, value: 0 }
    }

    /// Current brightness, 0-255.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Sample the net level of each S-pin and keep the maximum.
    pub fn tick(&mut self, net_levels: &[i64]) {
        self.value = net_levels
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .clamp(0, SBUS_MAX);
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }
}
