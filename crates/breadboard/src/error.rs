//! Fatal simulation errors.
//!
//! Placement failures are not errors — `Board::add_component` and
//! `Board::add_cable` return `false` and leave the board unchanged.
//! Everything here aborts the current `tick` (or `initialise`); the
//! caller is expected to stop the simulation, and `reset()` clears
//! the fault.

use thiserror::Error;

/// A fatal fault raised during `initialise` or `tick`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A microcontroller program fault. `line` is the 1-based source
    /// line of the offending instruction or label.
    #[error("Line {line} - {reason}")]
    Program { line: usize, reason: String },

    /// Two data locations of one component share an address.
    #[error("duplicate data location address '{address}'")]
    DuplicateAddress { address: String },

    /// A memory pointer pin has no unique data partner.
    #[error("memory pointer pin '{address}' has {found} matching data pins (expected exactly 1)")]
    MemoryPairing { address: String, found: usize },

    /// A memory pointer moved outside the cell array.
    #[error("memory pointer {value} out of range (capacity {capacity})")]
    MemoryPointer { value: i64, capacity: usize },

    /// `tick` was called before `initialise`.
    #[error("board has not been initialised")]
    NotInitialised,
}

impl SimError {
    /// Build a program fault for the given 1-based source line.
    pub(crate) fn program(line: usize, reason: impl Into<String>) -> Self {
        SimError::Program {
            line,
            reason: reason.into(),
        }
    }
}
