//! Discrete-event simulator for a grid breadboard.
//!
//! A [`Board`] is a fixed grid populated with components — buttons,
//! LEDs, numeric/text/bitmap displays, memories and programmable
//! [`Mcu`] microcontrollers — wired together by solder and bridge
//! cables. Pins come in two kinds: S-buses carry a saturated 0-255
//! signal read as the maximum across a net; X-buses carry a blocking
//! request/response message protocol.
//!
//! # Tick loop
//!
//! After `initialise()` freezes pin connectivity, each `tick()`:
//! 1. runs every component once, in placement order
//! 2. sweeps the connectivity cache and completes at most one X-bus
//!    handshake per announcing writer
//!
//! Boards round-trip through the `.bbd` document format; loading
//! replays every record through the ordinary placement rules.

mod bbd;
mod board;
mod bus;
mod button;
mod cable;
mod component;
mod display;
mod error;
mod grid;
mod led;
mod mcu;
mod memory;
mod net;

pub use bbd::LoadOutcome;
pub use board::{Board, BusId, CacheEntry, PinId};
pub use bus::{SBus, XBus, XBusState, SBUS_MAX};
pub use button::{PressButton, ToggleButton};
pub use cable::{Cable, CableKind};
pub use component::{Component, ComponentKind};
pub use display::{BitmapDisplay, NumericDisplay, TextDisplay, BITMAP_MAX_DIM};
pub use error::SimError;
pub use grid::{Direction, Position};
pub use led::Led;
pub use mcu::{Mcu, Register, ACC};
pub use memory::{Memory, MEMORY_MAX_CELLS};
pub use net::NetGraph;

// Re-export the contracts and the format error so downstream users
// need only this crate.
pub use breadboard_core::{Observable, Tickable, Value};
pub use format_bbd::{BbdError, EXTENSION};
