//! State-machine trait for lifecycle models.

/// Deterministic state machine split into decision and evolution.
///
/// - **Decision logic**: `handle(&self, cmd)` validates a command against the
///   current state and returns the events it produces.
/// - **State mutation**: `apply(&mut self, event)` evolves state from one event.
///
/// Implementations must not perform IO or schedule timers. Callers own side
/// effects and feed their outcomes back in as commands.
pub trait Aggregate {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Monotonically increasing count of applied events.
    fn version(&self) -> u64;

    /// Evolve in-memory state from a single event.
    ///
    /// Implementations increment `version()` by one per applied event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
