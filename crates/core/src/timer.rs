//! Cancellable one-shot timers for a cooperative, single-threaded event loop.
//!
//! Nothing here spawns threads or sleeps. The host loop asks the queue which
//! timers are due at a given instant (`pop_due`) and dispatches their payloads
//! itself, so every callback runs on the caller's thread in deadline order.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

/// Handle to a scheduled timer. Cancelling consumes nothing and is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    deadline: DateTime<Utc>,
}

impl TimerHandle {
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }
}

/// Deadline-ordered queue of pending timers carrying a payload `T`.
///
/// Timers sharing a deadline fire in scheduling order.
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    pending: BTreeMap<(DateTime<Utc>, u64), T>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire at `deadline`.
    pub fn schedule_at(&mut self, deadline: DateTime<Utc>, payload: T) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert((deadline, id), payload);
        TimerHandle { id, deadline }
    }

    /// Schedule `payload` to fire `delay` after `now`.
    pub fn schedule_after(&mut self, now: DateTime<Utc>, delay: Duration, payload: T) -> TimerHandle {
        self.schedule_at(now + delay, payload)
    }

    /// Cancel a pending timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.pending.remove(&(handle.deadline, handle.id)).is_some()
    }

    /// Remove and return the earliest timer whose deadline is `<= now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(TimerHandle, T)> {
        let (&(deadline, id), _) = self.pending.first_key_value()?;
        if deadline > now {
            return None;
        }
        self.pending
            .remove(&(deadline, id))
            .map(|payload| (TimerHandle { id, deadline }, payload))
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.first_key_value().map(|(&(deadline, _), _)| deadline)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
