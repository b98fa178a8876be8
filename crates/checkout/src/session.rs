//! Checkout driver: owns the flow, its timers and its side effects.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use shopfront_cart::CartManager;
use shopfront_core::{Aggregate, Clock, DomainError, TimerHandle, TimerQueue};
use shopfront_events::{EventBus, InMemoryEventBus, Subscription, execute};
use shopfront_storage::PersistedStore;

use crate::config::CheckoutConfig;
use crate::countdown::SaleCountdown;
use crate::error::CheckoutError;
use crate::lifecycle::{
    AbandonHandoff, CheckoutCommand, CheckoutEvent, CheckoutFlow, CheckoutState, InitiatePayment,
    PlaceOrder, Settle,
};
use crate::monitor::{MonitorSignal, PaymentWaitMonitor, WaitCountdown};
use crate::order::Order;
use crate::payment::{HandoffError, PaymentAttempt, PaymentLauncher, UpiApp, build_payment_uri, is_valid_upi_uri};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Housekeeping {
    ClearCart,
}

/// Single-threaded checkout session.
///
/// Nothing runs on its own: the host calls [`advance`](Self::advance) from its
/// event loop (at least by [`next_deadline`](Self::next_deadline)) and
/// forwards visibility changes. Lifecycle events are broadcast after the
/// state change they describe.
pub struct CheckoutSession<C, L> {
    config: CheckoutConfig,
    clock: C,
    launcher: L,
    store: PersistedStore,
    cart: CartManager,
    flow: CheckoutFlow,
    monitor: PaymentWaitMonitor,
    housekeeping: TimerQueue<Housekeeping>,
    pending_clear: Option<TimerHandle>,
    events: Arc<InMemoryEventBus<CheckoutEvent>>,
}

impl<C, L> core::fmt::Debug for CheckoutSession<C, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CheckoutSession")
            .field("state", self.flow.state())
            .field("monitor", &self.monitor)
            .field("pending_clear", &self.pending_clear)
            .finish_non_exhaustive()
    }
}

impl<C, L> CheckoutSession<C, L>
where
    C: Clock,
    L: PaymentLauncher,
{
    /// Open a session over `store`, restoring the lifecycle from the
    /// persisted order record.
    pub fn open(config: CheckoutConfig, store: PersistedStore, clock: C, launcher: L) -> Self {
        let cart = CartManager::new(store.clone(), config.fees);
        Self::with_cart(config, store, cart, clock, launcher)
    }

    /// Like [`open`](Self::open) with an existing cart manager, so cart
    /// observers keep their subscriptions.
    pub fn with_cart(
        config: CheckoutConfig,
        store: PersistedStore,
        cart: CartManager,
        clock: C,
        launcher: L,
    ) -> Self {
        let flow = CheckoutFlow::restore(Order::load(&store).as_ref());
        tracing::debug!(state = flow.state().name(), "checkout session opened");
        Self {
            monitor: PaymentWaitMonitor::new(config.monitor),
            config,
            clock,
            launcher,
            store,
            cart,
            flow,
            housekeeping: TimerQueue::new(),
            pending_clear: None,
            events: Arc::new(InMemoryEventBus::new()),
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub fn cart(&self) -> &CartManager {
        &self.cart
    }

    pub fn state(&self) -> &CheckoutState {
        self.flow.state()
    }

    /// The persisted current order, if any.
    pub fn current_order(&self) -> Option<Order> {
        Order::load(&self.store)
    }

    pub fn subscribe_events(&self) -> Subscription<CheckoutEvent> {
        self.events.subscribe()
    }

    /// Visible payment countdown while a payment is awaited.
    pub fn payment_countdown(&self) -> Option<WaitCountdown> {
        self.monitor.countdown()
    }

    pub fn sale_countdown(&self) -> chrono::Duration {
        SaleCountdown::new(self.config.sale_countdown).remaining(&self.store, self.clock.now())
    }

    /// Earliest instant at which [`advance`](Self::advance) has work to do.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        match (self.monitor.next_deadline(), self.housekeeping.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Number of live timers (payment wait and placement housekeeping).
    pub fn pending_timers(&self) -> usize {
        self.monitor.pending_timers() + self.housekeeping.len()
    }

    /// Snapshot the cart into a new order and persist it.
    ///
    /// The cart is cleared only after the record is written, and only once
    /// the placement delay has elapsed. If the write fails the state and the
    /// cart are left as they were.
    pub fn place_order(&mut self) -> Result<Order, CheckoutError> {
        let now = self.clock.now();
        let order = Order::from_cart(self.cart.items(), now, &mut rand::thread_rng())?;

        let command = CheckoutCommand::PlaceOrder(PlaceOrder {
            order_id: order.order_id.clone(),
            line_count: order.products.len(),
            occurred_at: now,
        });
        let events = self.flow.handle(&command)?;

        order.save(&self.store).inspect_err(|err| {
            tracing::error!(order_id = %order.order_id, "order not placed: {err}");
        })?;
        for event in &events {
            self.flow.apply(event);
        }

        self.monitor.disarm();
        if let Some(previous) = self.pending_clear.take() {
            self.housekeeping.cancel(previous);
        }
        self.pending_clear = Some(self.housekeeping.schedule_after(
            now,
            self.config.placement_clear_delay,
            Housekeeping::ClearCart,
        ));

        tracing::info!(
            order_id = %order.order_id,
            lines = order.products.len(),
            total_discount = %order.total_discount,
            "order placed"
        );
        self.publish(&events);
        Ok(order)
    }

    /// Hand the payment link for the current order to `method`'s app and
    /// start waiting for settlement.
    ///
    /// The transition to `AwaitingPayment` happens when the handoff is
    /// attempted. A failed handoff rolls back to `Placed` with no timers armed.
    pub fn initiate_payment(&mut self, method: UpiApp) -> Result<PaymentAttempt, CheckoutError> {
        let now = self.clock.now();
        let events = self.flow.handle(&CheckoutCommand::InitiatePayment(InitiatePayment {
            method,
            occurred_at: now,
        }))?;

        let order = self
            .current_order()
            .filter(|o| self.flow.state().order_id() == Some(&o.order_id))
            .ok_or_else(DomainError::not_found)?;
        let amount = order.totals(&self.config.fees).final_amount;
        let uri = build_payment_uri(method, &self.config.merchant_payload, amount);
        if !is_valid_upi_uri(&uri) {
            return Err(HandoffError::InvalidUri(uri).into());
        }

        for event in &events {
            self.flow.apply(event);
        }
        let attempt = self
            .flow
            .live_attempt()
            .ok_or_else(|| DomainError::invariant("payment initiated without a live attempt"))?;
        self.monitor.arm(attempt, now);

        let record = PaymentAttempt {
            attempt,
            order_id: order.order_id.clone(),
            method,
            amount,
            uri,
            timestamp: now,
        };
        tracing::info!(
            order_id = %record.order_id,
            attempt,
            method = %method,
            amount = %record.amount.upi_amount(),
            "payment handoff attempted"
        );
        self.publish(&events);

        if let Err(err) = self.launcher.open(&record.uri) {
            tracing::warn!(order_id = %record.order_id, attempt, "payment handoff failed: {err}");
            self.monitor.disarm();
            match execute(
                &mut self.flow,
                &CheckoutCommand::AbandonHandoff(AbandonHandoff {
                    attempt,
                    reason: err.to_string(),
                    occurred_at: now,
                }),
            ) {
                Ok(rollback) => self.publish(&rollback),
                Err(rollback_err) => {
                    tracing::error!(attempt, "handoff rollback rejected: {rollback_err}");
                }
            }
            return Err(err.into());
        }

        Ok(record)
    }

    /// Forward a page visibility change.
    pub fn on_visibility_change(&mut self, visible: bool) {
        self.monitor.on_visibility_change(visible, self.clock.now());
    }

    /// Run every timer due at the clock's current instant. Returns the
    /// lifecycle events that resulted.
    ///
    /// A transition rejected by the state machine is logged and dropped;
    /// the flow stays where it was.
    pub fn advance(&mut self) -> Vec<CheckoutEvent> {
        let now = self.clock.now();
        let mut emitted = Vec::new();

        while let Some((_, task)) = self.housekeeping.pop_due(now) {
            match task {
                Housekeeping::ClearCart => {
                    self.pending_clear = None;
                    match self.cart.clear() {
                        Ok(()) => tracing::debug!("cart cleared after placement"),
                        Err(err) => tracing::error!("cart not cleared after placement: {err}"),
                    }
                }
            }
        }

        for signal in self.monitor.poll(now) {
            let MonitorSignal::Settle { attempt, reason } = signal else {
                continue;
            };
            let command = CheckoutCommand::Settle(Settle {
                attempt,
                reason,
                occurred_at: now,
            });
            match execute(&mut self.flow, &command) {
                Ok(events) => {
                    tracing::info!(
                        order_id = ?self.flow.state().order_id(),
                        attempt,
                        ?reason,
                        "payment settled"
                    );
                    self.monitor.disarm();
                    emitted.extend(events);
                }
                Err(err) => {
                    tracing::warn!(attempt, ?reason, "settlement ignored: {err}");
                }
            }
        }

        self.publish(&emitted);
        emitted
    }

    /// Cancel every timer the session owns.
    pub fn teardown(&mut self) {
        self.monitor.disarm();
        if let Some(handle) = self.pending_clear.take() {
            self.housekeeping.cancel(handle);
        }
        tracing::debug!(state = self.flow.state().name(), "checkout session torn down");
    }

    fn publish(&self, events: &[CheckoutEvent]) {
        for event in events {
            if let Err(err) = self.events.publish(event.clone()) {
                tracing::warn!(?err, "checkout event not delivered");
            }
        }
    }
}
