//! Publish/subscribe abstraction (mechanics only).
//!
//! A bus decouples the component that mutates state from every place that
//! displays it. Publishers never know who listens; each subscriber owns a
//! queue and drains it on its own schedule.
//!
//! Delivery order per subscriber equals publish order. Messages are delivered
//! only to subscriptions that exist at publish time.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

/// A subscription to a message stream.
///
/// Each subscription receives its own copy of every message published after
/// it was created (broadcast semantics). Dropping the subscription
/// unsubscribes it; the bus prunes it on the next publish.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Take every message queued so far, oldest first.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }

    /// Discard queued messages and report whether there were any.
    ///
    /// Suited to payload-less change signals where N queued notifications
    /// mean the same thing as one.
    pub fn take_changed(&self) -> bool {
        self.receiver.try_iter().count() > 0
    }
}

/// Domain-agnostic message bus.
///
/// ```text
/// UI action -> manager -> store write -> bus.publish -> subscribers re-read
/// ```
///
/// Publishers must only publish after the state change the message announces
/// has been durably written, so any subscriber reacting to it reads
/// consistent state.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Deliver `message` to every live subscriber. Returns how many received it.
    fn publish(&self, message: M) -> Result<usize, Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
