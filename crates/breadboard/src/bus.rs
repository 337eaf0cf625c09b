//! Component pins: signal buses and message buses.
//!
//! An `SBus` carries a saturated 0-255 signal; a reader samples the
//! maximum across its net each tick. An `XBus` carries a blocking
//! request/response message protocol. Every protocol transition
//! lives in this module:
//!
//! ```text
//!             set_reading             receive (delivery sweep)
//!   Idle ───────────────▶ Reading ─────────────────▶ ReadComplete
//!     │                                                   │
//!     │ begin_write                      take_delivered   │
//!     ▼                                                   ▼
//!   Writing ──────────────▶ WriteComplete ──────────────▶ Idle
//!          complete_write           acknowledge_write
//! ```
//!
//! `ReadingWriting` is the always-armed state memory pins hold: the
//! pin both offers its value and accepts a delivery, and the sweep
//! moves it to `ReadComplete` or `WriteComplete` like any other pin.

use crate::grid::{Direction, Position};

/// Highest signal level an SBus can carry.
pub const SBUS_MAX: i64 = 255;

/// A simple analog-style signal pin.
#[derive(Debug, Clone, PartialEq)]
pub struct SBus {
    /// Identifier, unique within the owning component.
    pub address: String,
    /// Tile-local position inside the component footprint.
    pub position: Position,
    /// Facing; the pin wires to the cable one tile that way.
    pub direction: Direction,
    value: i64,
}

impl SBus {
    #[must_use]
    pub fn new(address: impl Into<String>, position: Position, direction: Direction) -> Self {
        Self {
            address: address.into(),
            position,
            direction,
            value: 0,
        }
    }

    /// Raw driven level of this pin (not the net maximum).
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Drive a level; saturates to `[0, 255]`.
    pub fn write(&mut self, value: i64) {
        self.value = value.clamp(0, SBUS_MAX);
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }
}

/// XBus protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XBusState {
    Idle,
    Reading,
    Writing,
    ReadingWriting,
    WriteComplete,
    ReadComplete,
}

/// A message-protocol pin.
#[derive(Debug, Clone, PartialEq)]
pub struct XBus {
    /// Identifier, unique within the owning component.
    pub address: String,
    /// Tile-local position inside the component footprint.
    pub position: Position,
    /// Facing; the pin wires to the cable one tile that way.
    pub direction: Direction,
    value: i64,
    state: XBusState,
}

impl XBus {
    #[must_use]
    pub fn new(address: impl Into<String>, position: Position, direction: Direction) -> Self {
        Self {
            address: address.into(),
            position,
            direction,
            value: 0,
            state: XBusState::Idle,
        }
    }

    /// Current 64-bit payload.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }

    #[must_use]
    pub fn state(&self) -> XBusState {
        self.state
    }

    /// Announce read intent. Displays re-arm this unconditionally
    /// each tick; a microcontroller only does so from `Idle`.
    pub fn set_reading(&mut self) {
        self.state = XBusState::Reading;
    }

    /// Arm the pin to both offer `value()` and accept a delivery.
    /// Memory pins re-enter this state every tick.
    pub fn set_read_write(&mut self) {
        self.state = XBusState::ReadingWriting;
    }

    /// Offer `value` and announce write intent.
    pub fn begin_write(&mut self, value: i64) {
        self.value = value;
        self.state = XBusState::Writing;
    }

    /// Replace the offered payload without touching protocol state.
    pub fn set_value(&mut self, value: i64) {
        self.value = value;
    }

    /// Consume a completed read: returns the delivered payload and
    /// idles the pin, or `None` while no delivery has arrived.
    pub fn take_delivered(&mut self) -> Option<i64> {
        if self.state == XBusState::ReadComplete {
            self.state = XBusState::Idle;
            Some(self.value)
        } else {
            None
        }
    }

    /// Consume a completed write, idling the pin.
    pub fn acknowledge_write(&mut self) {
        debug_assert_eq!(self.state, XBusState::WriteComplete);
        self.state = XBusState::Idle;
    }

    /// Whether the delivery sweep should treat this pin as a writer.
    #[must_use]
    pub fn offers_value(&self) -> bool {
        matches!(self.state, XBusState::Writing | XBusState::ReadingWriting)
    }

    /// Whether the delivery sweep may hand this pin a payload.
    #[must_use]
    pub fn accepts_value(&self) -> bool {
        matches!(self.state, XBusState::Reading | XBusState::ReadingWriting)
    }

    /// Delivery-sweep transition on the reading peer.
    pub(crate) fn receive(&mut self, value: i64) {
        self.value = value;
        self.state = XBusState::ReadComplete;
    }

    /// Delivery-sweep transition on the writer.
    pub(crate) fn complete_write(&mut self) {
        self.state = XBusState::WriteComplete;
    }

    pub fn reset(&mut self) {
        self.value = 0;
        self.state = XBusState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Direction, Position};

    fn xbus() -> XBus {
        XBus::new("x0", Position::new(0, 0), Direction::Right)
    }

    #[test]
    fn sbus_write_saturates() {
        let mut s = SBus::new("s0", Position::new(0, 0), Direction::Left);
        s.write(300);
        assert_eq!(s.value(), 255);
        s.write(-12);
        assert_eq!(s.value(), 0);
        s.write(42);
        assert_eq!(s.value(), 42);
    }

    #[test]
    fn write_handshake() {
        let mut writer = xbus();
        let mut reader = xbus();
        writer.begin_write(99);
        reader.set_reading();
        assert!(writer.offers_value());
        assert!(reader.accepts_value());

        reader.receive(writer.value());
        writer.complete_write();
        assert_eq!(writer.state(), XBusState::WriteComplete);
        assert_eq!(reader.take_delivered(), Some(99));
        assert_eq!(reader.state(), XBusState::Idle);
        writer.acknowledge_write();
        assert_eq!(writer.state(), XBusState::Idle);
    }

    #[test]
    fn read_write_pin_is_both_sides() {
        let mut pin = xbus();
        pin.set_read_write();
        assert!(pin.offers_value());
        assert!(pin.accepts_value());
    }

    #[test]
    fn take_delivered_only_after_delivery() {
        let mut pin = xbus();
        pin.set_reading();
        assert_eq!(pin.take_delivered(), None);
        assert_eq!(pin.state(), XBusState::Reading);
    }
}
