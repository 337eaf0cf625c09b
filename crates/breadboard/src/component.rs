//! Placeable components: shared footprint/pin fields plus a tagged
//! variant payload per device.

use std::collections::HashSet;

use crate::bus::{SBus, XBus};
use crate::button::{PressButton, ToggleButton};
use crate::display::{BitmapDisplay, NumericDisplay, TextDisplay};
use crate::error::SimError;
use crate::grid::{Direction, Position};
use crate::led::Led;
use crate::mcu::Mcu;
use crate::memory::Memory;

/// Device-specific state, one variant per placeable device.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    PressButton(PressButton),
    ToggleButton(ToggleButton),
    Led(Led),
    NumericDisplay(NumericDisplay),
    TextDisplay(TextDisplay),
    BitmapDisplay(BitmapDisplay),
    Memory(Memory),
    MicroController(Mcu),
}

/// A rectangular device anchored at its top-left cell, carrying
/// typed pins on the footprint boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Top-left cell on the board.
    pub position: Position,
    pub width: i32,
    pub height: i32,
    pub sbuses: Vec<SBus>,
    pub xbuses: Vec<XBus>,
    pub kind: ComponentKind,
}

impl Component {
    #[must_use]
    pub fn new(kind: ComponentKind, position: Position, width: i32, height: i32) -> Self {
        Self {
            position,
            width,
            height,
            sbuses: Vec::new(),
            xbuses: Vec::new(),
            kind,
        }
    }

    /// Add an S-pin at a tile-local position. Builder-style, used
    /// while assembling a board.
    #[must_use]
    pub fn with_sbus(
        mut self,
        address: impl Into<String>,
        local: Position,
        direction: Direction,
    ) -> Self {
        self.sbuses.push(SBus::new(address, local, direction));
        self
    }

    /// Add an X-pin at a tile-local position.
    #[must_use]
    pub fn with_xbus(
        mut self,
        address: impl Into<String>,
        local: Position,
        direction: Direction,
    ) -> Self {
        self.xbuses.push(XBus::new(address, local, direction));
        self
    }

    /// Add a register to a microcontroller. No-op for other kinds.
    #[must_use]
    pub fn with_register(mut self, address: impl Into<String>) -> Self {
        if let ComponentKind::MicroController(mcu) = &mut self.kind {
            mcu.add_register(address);
        }
        self
    }

    /// Set a microcontroller's program text. No-op for other kinds.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        if let ComponentKind::MicroController(mcu) = &mut self.kind {
            mcu.set_source(source);
        }
        self
    }

    /// Whether the footprint covers `p`.
    #[must_use]
    pub fn footprint_contains(&self, p: Position) -> bool {
        p.x >= self.position.x
            && p.x < self.position.x + self.width
            && p.y >= self.position.y
            && p.y < self.position.y + self.height
    }

    /// Whether the whole footprint lies inside a `board_width` x
    /// `board_height` grid.
    #[must_use]
    pub fn in_bounds(&self, board_width: i32, board_height: i32) -> bool {
        self.width >= 1
            && self.height >= 1
            && self.position.x >= 0
            && self.position.y >= 0
            && self.position.x + self.width <= board_width
            && self.position.y + self.height <= board_height
    }

    /// Whether two footprints share any cell.
    #[must_use]
    pub fn overlaps(&self, other: &Component) -> bool {
        self.position.x < other.position.x + other.width
            && other.position.x < self.position.x + self.width
            && self.position.y < other.position.y + other.height
            && other.position.y < self.position.y + self.height
    }

    /// Absolute board position of a tile-local pin position.
    #[must_use]
    pub fn port(&self, local: Position) -> Position {
        Position::new(self.position.x + local.x, self.position.y + local.y)
    }

    /// Every pin as `(absolute port, facing)`, S-pins first.
    pub fn ports(&self) -> impl Iterator<Item = (Position, Direction)> + '_ {
        self.sbuses
            .iter()
            .map(|s| (self.port(s.position), s.direction))
            .chain(
                self.xbuses
                    .iter()
                    .map(|x| (self.port(x.position), x.direction)),
            )
    }

    /// Whether some pin sits at absolute `p` facing `toward`.
    #[must_use]
    pub fn has_aligned_port(&self, p: Position, toward: Position) -> bool {
        self.ports()
            .any(|(port, direction)| port == p && port.shifted(direction) == toward)
    }

    /// Check that every pin address (plus microcontroller register
    /// addresses) is unique within this component.
    ///
    /// # Errors
    ///
    /// `SimError::DuplicateAddress` naming the first clash.
    pub fn validate_addresses(&self) -> Result<(), SimError> {
        let mut seen = HashSet::new();
        let registers = match &self.kind {
            ComponentKind::MicroController(mcu) => mcu.register_addresses().collect(),
            _ => Vec::new(),
        };
        let addresses = self
            .sbuses
            .iter()
            .map(|s| s.address.as_str())
            .chain(self.xbuses.iter().map(|x| x.address.as_str()))
            .chain(registers);
        for address in addresses {
            if !seen.insert(address) {
                return Err(SimError::DuplicateAddress {
                    address: address.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The microcontroller payload, if this component is one.
    #[must_use]
    pub fn mcu(&self) -> Option<&Mcu> {
        match &self.kind {
            ComponentKind::MicroController(mcu) => Some(mcu),
            _ => None,
        }
    }

    #[must_use]
    pub fn mcu_mut(&mut self) -> Option<&mut Mcu> {
        match &mut self.kind {
            ComponentKind::MicroController(mcu) => Some(mcu),
            _ => None,
        }
    }

    /// Return the component to its default state: pins released,
    /// displays cleared, memory zeroed, program rewound.
    pub fn reset(&mut self) {
        for pin in &mut self.sbuses {
            pin.reset();
        }
        for pin in &mut self.xbuses {
            pin.reset();
        }
        match &mut self.kind {
            ComponentKind::PressButton(b) => b.reset(),
            ComponentKind::ToggleButton(b) => b.reset(),
            ComponentKind::Led(l) => l.reset(),
            ComponentKind::NumericDisplay(d) => d.reset(),
            ComponentKind::TextDisplay(d) => d.reset(),
            ComponentKind::BitmapDisplay(d) => d.reset(),
            ComponentKind::Memory(m) => m.reset(),
            ComponentKind::MicroController(m) => m.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn led_at(x: i32, y: i32, w: i32, h: i32) -> Component {
        Component::new(ComponentKind::Led(Led::new(0xFF0000)), Position::new(x, y), w, h)
    }

    #[test]
    fn footprint_and_bounds() {
        let c = led_at(1, 1, 2, 2);
        assert!(c.footprint_contains(Position::new(1, 1)));
        assert!(c.footprint_contains(Position::new(2, 2)));
        assert!(!c.footprint_contains(Position::new(3, 1)));
        assert!(c.in_bounds(4, 4));
        assert!(!c.in_bounds(2, 4));
    }

    #[test]
    fn overlap_detection() {
        let a = led_at(0, 0, 2, 2);
        assert!(a.overlaps(&led_at(1, 1, 2, 2)));
        assert!(!a.overlaps(&led_at(2, 0, 2, 2)));
    }

    #[test]
    fn aligned_port_lookup() {
        let c = led_at(2, 0, 1, 1).with_sbus("s0", Position::new(0, 0), Direction::Left);
        assert!(c.has_aligned_port(Position::new(2, 0), Position::new(1, 0)));
        assert!(!c.has_aligned_port(Position::new(2, 0), Position::new(3, 0)));
    }

    #[test]
    fn duplicate_pin_address_rejected() {
        let c = led_at(0, 0, 1, 1)
            .with_sbus("s0", Position::new(0, 0), Direction::Left)
            .with_sbus("s0", Position::new(0, 0), Direction::Right);
        assert!(matches!(
            c.validate_addresses(),
            Err(SimError::DuplicateAddress { .. })
        ));
    }
}
