use shopfront_core::Aggregate;

/// Execute a command against a state machine: decide, then apply.
///
/// 1. **Decide**: `aggregate.handle(command)` returns events without mutating.
/// 2. **Evolve**: each event is applied in order.
///
/// If `handle` rejects the command, the aggregate is left untouched, so a
/// faulted transition never leaves a half-applied state behind.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
