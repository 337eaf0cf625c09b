//! Core traits for the BreadBoard simulator.
//!
//! Everything on a board advances in lockstep simulation ticks. All
//! component behaviour derives from the tick. No exceptions.

mod observable;
mod tickable;

pub use observable::{Observable, Value};
pub use tickable::Tickable;
