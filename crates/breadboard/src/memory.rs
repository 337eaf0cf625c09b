//! Random-access memory component.
//!
//! Memory exposes its cells through pointer/data pin pairs. A pin
//! whose address starts with `xp` is a pointer; it must have exactly
//! one partner starting with `xd` and sharing the suffix (`xp0` /
//! `xd0`). Writing a cell is a handshake into the data pin; reading
//! one is a handshake out of it, at the cell the pointer pin last
//! received.

use crate::bus::{XBus, XBusState};
use crate::error::SimError;

/// Cell-count cap.
pub const MEMORY_MAX_CELLS: usize = 2048;

/// A pointer-addressed cell array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<i64>,
    /// `(pointer, data)` indices into the component's X-pin array,
    /// resolved at initialise.
    pairs: Vec<(usize, usize)>,
}

impl Memory {
    /// Capacity clamps to `[0, 2048]`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![0; capacity.min(MEMORY_MAX_CELLS)],
            pairs: Vec::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Cell contents, or `None` outside the array.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<i64> {
        self.cells.get(index).copied()
    }

    /// Resolve pointer/data pin pairs by address suffix.
    ///
    /// # Errors
    ///
    /// `SimError::MemoryPairing` when a pointer pin has zero or
    /// several matching data pins. Data pins without a pointer are
    /// left unpaired and never ticked.
    pub fn pair_pins(&mut self, xbuses: &[XBus]) -> Result<(), SimError> {
        self.pairs.clear();
        for (pi, pointer) in xbuses.iter().enumerate() {
            let Some(suffix) = pointer.address.strip_prefix("xp") else {
                continue;
            };
            let matches: Vec<usize> = xbuses
                .iter()
                .enumerate()
                .filter(|(_, data)| data.address.strip_prefix("xd") == Some(suffix))
                .map(|(di, _)| di)
                .collect();
            match matches[..] {
                [di] => self.pairs.push((pi, di)),
                _ => {
                    return Err(SimError::MemoryPairing {
                        address: pointer.address.clone(),
                        found: matches.len(),
                    })
                }
            }
        }
        Ok(())
    }

    /// One simulation step over every pin pair.
    ///
    /// # Errors
    ///
    /// `SimError::MemoryPointer` when a pointer pin holds a value
    /// outside `[0, capacity)`.
    pub fn tick(&mut self, xbuses: &mut [XBus]) -> Result<(), SimError> {
        for &(pi, di) in &self.pairs {
            let pointer = xbuses[pi].value();
            if pointer < 0 || pointer as usize >= self.cells.len() {
                return Err(SimError::MemoryPointer {
                    value: pointer,
                    capacity: self.cells.len(),
                });
            }
            let cell = pointer as usize;

            xbuses[pi].set_read_write();
            if xbuses[di].state() == XBusState::ReadComplete {
                self.cells[cell] = xbuses[di].value();
            }
            xbuses[di].set_read_write();
            // Offer the addressed cell so a peer can handshake it out.
            xbuses[di].set_value(self.cells[cell]);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.cells.fill(0);
    }
}
