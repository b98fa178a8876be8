//! Payment-Wait Monitor.
//!
//! Infers settlement while the shopper is (maybe) paying in another app.
//! Two timers race for a single settlement:
//!
//! - **fallback**: armed on entry, fires after `fallback_timeout` no matter what
//! - **return grace**: armed when the page becomes visible after having been
//!   hidden, fires after `return_grace`; hiding the page again cancels it and
//!   the next return arms a fresh one
//!
//! The first to fire sets the guard and cancels everything else. A visible
//! countdown ticks once per second for display and never settles anything.
//!
//! All timers live in one [`TimerQueue`] and are driven by [`poll`](PaymentWaitMonitor::poll).

use chrono::{DateTime, Duration, Utc};

use shopfront_core::{TimerHandle, TimerQueue};

use crate::config::MonitorConfig;
use crate::lifecycle::SettlementReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Fallback,
    ReturnGrace,
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MonitorTimer {
    attempt: u64,
    kind: TimerKind,
}

/// Output of [`PaymentWaitMonitor::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorSignal {
    /// The visible countdown moved.
    Tick { remaining_secs: u32 },
    /// A settlement heuristic fired for `attempt`.
    Settle {
        attempt: u64,
        reason: SettlementReason,
    },
}

/// Snapshot of the visible countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitCountdown {
    pub remaining_secs: u32,
    pub total_secs: u32,
}

impl WaitCountdown {
    /// `MM:SS`
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }

    /// Share of the window still remaining, `0..=100`, for the progress ring.
    pub fn percentage(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        f64::from(self.remaining_secs) / f64::from(self.total_secs) * 100.0
    }
}

/// Every timer handle of one armed wait, so teardown is one call.
#[derive(Debug, Default)]
struct PaymentTimers {
    fallback: Option<TimerHandle>,
    grace: Option<TimerHandle>,
    tick: Option<TimerHandle>,
}

impl PaymentTimers {
    fn cancel_all(&mut self, queue: &mut TimerQueue<MonitorTimer>) {
        for handle in [self.fallback.take(), self.grace.take(), self.tick.take()]
            .into_iter()
            .flatten()
        {
            queue.cancel(handle);
        }
    }
}

#[derive(Debug)]
struct ArmedWait {
    attempt: u64,
    started_at: DateTime<Utc>,
    timers: PaymentTimers,
    visible: bool,
    was_hidden: bool,
    remaining_secs: u32,
    /// Set by whichever heuristic fires first.
    settled: bool,
}

#[derive(Debug)]
pub struct PaymentWaitMonitor {
    config: MonitorConfig,
    queue: TimerQueue<MonitorTimer>,
    armed: Option<ArmedWait>,
}

impl PaymentWaitMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            queue: TimerQueue::new(),
            armed: None,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start waiting for `attempt`. Anything armed for an earlier attempt is
    /// cancelled first.
    pub fn arm(&mut self, attempt: u64, now: DateTime<Utc>) {
        self.disarm();

        let total = window_secs(self.config.payment_window);
        let fallback = self.queue.schedule_after(
            now,
            self.config.fallback_timeout,
            MonitorTimer {
                attempt,
                kind: TimerKind::Fallback,
            },
        );
        let tick = (total > 0).then(|| {
            self.queue.schedule_after(
                now,
                Duration::seconds(1),
                MonitorTimer {
                    attempt,
                    kind: TimerKind::Tick,
                },
            )
        });

        tracing::debug!(attempt, fallback_at = %fallback.deadline(), "payment wait armed");
        self.armed = Some(ArmedWait {
            attempt,
            started_at: now,
            timers: PaymentTimers {
                fallback: Some(fallback),
                grace: None,
                tick,
            },
            visible: true,
            was_hidden: false,
            remaining_secs: total,
            settled: false,
        });
    }

    /// Cancel every pending timer and forget the armed wait.
    pub fn disarm(&mut self) {
        if let Some(mut wait) = self.armed.take() {
            wait.timers.cancel_all(&mut self.queue);
            tracing::debug!(attempt = wait.attempt, "payment wait disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Attempt currently being waited on, if not yet settled.
    pub fn armed_attempt(&self) -> Option<u64> {
        self.armed
            .as_ref()
            .filter(|w| !w.settled)
            .map(|w| w.attempt)
    }

    pub fn pending_timers(&self) -> usize {
        self.queue.len()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.queue.next_deadline()
    }

    /// Visible countdown of the armed wait.
    pub fn countdown(&self) -> Option<WaitCountdown> {
        self.armed.as_ref().map(|w| WaitCountdown {
            remaining_secs: w.remaining_secs,
            total_secs: window_secs(self.config.payment_window),
        })
    }

    /// Page visibility changed.
    pub fn on_visibility_change(&mut self, visible: bool, now: DateTime<Utc>) {
        let Some(wait) = self.armed.as_mut() else {
            return;
        };
        if wait.settled || wait.visible == visible {
            return;
        }
        wait.visible = visible;

        if !visible {
            wait.was_hidden = true;
            if let Some(grace) = wait.timers.grace.take() {
                self.queue.cancel(grace);
                tracing::debug!(attempt = wait.attempt, "page hidden again; return grace cancelled");
            }
            return;
        }

        if wait.was_hidden {
            let grace = self.queue.schedule_after(
                now,
                self.config.return_grace,
                MonitorTimer {
                    attempt: wait.attempt,
                    kind: TimerKind::ReturnGrace,
                },
            );
            tracing::debug!(attempt = wait.attempt, settle_at = %grace.deadline(), "page returned; return grace armed");
            wait.timers.grace = Some(grace);
        }
    }

    /// Fire every timer due at `now`, in deadline order.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<MonitorSignal> {
        let mut signals = Vec::new();
        while let Some((handle, timer)) = self.queue.pop_due(now) {
            if let Some(signal) = self.fire(handle, timer) {
                signals.push(signal);
            }
        }
        signals
    }

    fn fire(&mut self, handle: TimerHandle, timer: MonitorTimer) -> Option<MonitorSignal> {
        let Some(wait) = self.armed.as_mut() else {
            tracing::debug!(?timer, "timer fired with nothing armed; ignored");
            return None;
        };
        if wait.attempt != timer.attempt || wait.settled {
            tracing::debug!(?timer, "stale timer ignored");
            return None;
        }

        match timer.kind {
            TimerKind::Tick => {
                wait.timers.tick = None;
                let total = window_secs(self.config.payment_window);
                let elapsed = (handle.deadline() - wait.started_at).num_seconds().max(0);
                wait.remaining_secs = total.saturating_sub(u32::try_from(elapsed).unwrap_or(u32::MAX));
                if wait.remaining_secs > 0 {
                    wait.timers.tick = Some(self.queue.schedule_at(
                        handle.deadline() + Duration::seconds(1),
                        timer,
                    ));
                }
                Some(MonitorSignal::Tick {
                    remaining_secs: wait.remaining_secs,
                })
            }
            TimerKind::Fallback | TimerKind::ReturnGrace => {
                let reason = match timer.kind {
                    TimerKind::Fallback => {
                        wait.timers.fallback = None;
                        SettlementReason::FallbackTimeout
                    }
                    _ => {
                        wait.timers.grace = None;
                        SettlementReason::ReturnedFromPaymentApp
                    }
                };
                wait.settled = true;
                wait.timers.cancel_all(&mut self.queue);
                tracing::debug!(attempt = wait.attempt, ?reason, "settlement heuristic fired");
                Some(MonitorSignal::Settle {
                    attempt: wait.attempt,
                    reason,
                })
            }
        }
    }
}

fn window_secs(window: Duration) -> u32 {
    u32::try_from(window.num_seconds().max(0)).unwrap_or(u32::MAX)
}
