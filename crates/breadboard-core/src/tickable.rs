//! Trait for state that advances by simulation ticks.

/// A simulation that can be advanced by discrete ticks.
///
/// One tick is the atomic scheduling step: every component takes its
/// per-tick action exactly once, in a deterministic order. A tick can
/// fail — a program fault inside a component aborts the step and
/// surfaces as `Error`.
pub trait Tickable {
    /// The fatal-fault type a tick can surface.
    type Error;

    /// Advance the simulation by one tick.
    ///
    /// # Errors
    ///
    /// Returns the first fatal fault raised during the step. State
    /// mutated before the fault is left as-is; the caller decides
    /// whether to stop or reset.
    fn tick(&mut self) -> Result<(), Self::Error>;

    /// Advance by `count` ticks, stopping at the first fault.
    ///
    /// Default implementation calls `tick()` in a loop. Implementors
    /// may override, but must produce identical results.
    fn tick_n(&mut self, count: u64) -> Result<(), Self::Error> {
        for _ in 0..count {
            self.tick()?;
        }
        Ok(())
    }
}
