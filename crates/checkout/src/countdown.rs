//! Recurring promotional countdown anchored in the session region.

use chrono::{DateTime, Duration, Utc};

use shopfront_storage::{PersistedStore, RecordKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleCountdown {
    duration: Duration,
}

impl SaleCountdown {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left in the current window.
    ///
    /// A missing or unreadable anchor, or one whose window has run out,
    /// starts a new window at `now`.
    pub fn remaining(&self, store: &PersistedStore, now: DateTime<Utc>) -> Duration {
        let anchor: Option<i64> = store.get_optional(RecordKey::CountdownAnchor);
        let elapsed = anchor
            .and_then(|started| now.timestamp().checked_sub(started))
            .and_then(Duration::try_seconds);
        if let Some(elapsed) = elapsed {
            if elapsed >= Duration::zero() && elapsed < self.duration {
                return self.duration - elapsed;
            }
        }

        if let Err(err) = store.set(RecordKey::CountdownAnchor, &now.timestamp()) {
            tracing::warn!("sale countdown anchor not saved: {err}");
        }
        self.duration
    }

    /// `HH:MM:SS`
    pub fn label(remaining: Duration) -> String {
        let secs = remaining.num_seconds().max(0);
        format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
    }
}
