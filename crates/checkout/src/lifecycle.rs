//! Order Lifecycle State Machine.
//!
//! ```text
//! Shopping --PlaceOrder--> Placed --InitiatePayment--> AwaitingPayment --Settle--> Settled
//!                            ^                              |
//!                            +-------- HandoffFailed -------+
//! ```
//!
//! `InitiatePayment` is also accepted while already awaiting payment; the new
//! attempt supersedes the old one and a `Settle` for a superseded attempt is
//! rejected. Timers and persistence live in [`CheckoutSession`]; this type
//! only decides and applies.
//!
//! [`CheckoutSession`]: crate::session::CheckoutSession

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{Aggregate, DomainError, OrderId};
use shopfront_events::Event;

use crate::order::Order;
use crate::payment::UpiApp;

/// Lifecycle state. `Shopping` means no order is in play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Shopping,
    Placed { order_id: OrderId },
    AwaitingPayment { order_id: OrderId, attempt: u64 },
    Settled { order_id: OrderId },
}

impl CheckoutState {
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            CheckoutState::Shopping => None,
            CheckoutState::Placed { order_id }
            | CheckoutState::AwaitingPayment { order_id, .. }
            | CheckoutState::Settled { order_id } => Some(order_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Shopping => "shopping",
            CheckoutState::Placed { .. } => "placed",
            CheckoutState::AwaitingPayment { .. } => "awaiting_payment",
            CheckoutState::Settled { .. } => "settled",
        }
    }
}

/// What triggered settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementReason {
    /// The page came back to the foreground and the grace window elapsed.
    ReturnedFromPaymentApp,
    /// The unconditional fallback timeout elapsed.
    FallbackTimeout,
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub line_count: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Command: InitiatePayment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatePayment {
    pub method: UpiApp,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AbandonHandoff (the external app could not be opened).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbandonHandoff {
    pub attempt: u64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settle {
    pub attempt: u64,
    pub reason: SettlementReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutCommand {
    PlaceOrder(PlaceOrder),
    InitiatePayment(InitiatePayment),
    AbandonHandoff(AbandonHandoff),
    Settle(Settle),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub line_count: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentInitiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiated {
    pub order_id: OrderId,
    pub attempt: u64,
    pub method: UpiApp,
    pub occurred_at: DateTime<Utc>,
}

/// Event: HandoffFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffFailed {
    pub order_id: OrderId,
    pub attempt: u64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentSettled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettled {
    pub order_id: OrderId,
    pub attempt: u64,
    pub reason: SettlementReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutEvent {
    OrderPlaced(OrderPlaced),
    PaymentInitiated(PaymentInitiated),
    HandoffFailed(HandoffFailed),
    PaymentSettled(PaymentSettled),
}

impl Event for CheckoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CheckoutEvent::OrderPlaced(_) => "checkout.order.placed",
            CheckoutEvent::PaymentInitiated(_) => "checkout.payment.initiated",
            CheckoutEvent::HandoffFailed(_) => "checkout.payment.handoff_failed",
            CheckoutEvent::PaymentSettled(_) => "checkout.payment.settled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CheckoutEvent::OrderPlaced(e) => e.occurred_at,
            CheckoutEvent::PaymentInitiated(e) => e.occurred_at,
            CheckoutEvent::HandoffFailed(e) => e.occurred_at,
            CheckoutEvent::PaymentSettled(e) => e.occurred_at,
        }
    }
}

/// The checkout flow of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutFlow {
    state: CheckoutState,
    /// Number of payment handoffs for the current order.
    attempts: u64,
    version: u64,
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self {
            state: CheckoutState::Shopping,
            attempts: 0,
            version: 0,
        }
    }
}

impl CheckoutFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from what was durably persisted: `Placed` when an order record
    /// exists, `Shopping` otherwise. Never `AwaitingPayment` or `Settled`.
    pub fn restore(order: Option<&Order>) -> Self {
        match order {
            Some(order) => Self {
                state: CheckoutState::Placed {
                    order_id: order.order_id.clone(),
                },
                ..Self::default()
            },
            None => Self::default(),
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Attempt number of the live handoff, if payment is being awaited.
    pub fn live_attempt(&self) -> Option<u64> {
        match self.state {
            CheckoutState::AwaitingPayment { attempt, .. } => Some(attempt),
            _ => None,
        }
    }
}

impl Aggregate for CheckoutFlow {
    type Command = CheckoutCommand;
    type Event = CheckoutEvent;
    type Error = DomainError;

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CheckoutEvent::OrderPlaced(e) => {
                self.state = CheckoutState::Placed {
                    order_id: e.order_id.clone(),
                };
                self.attempts = 0;
            }
            CheckoutEvent::PaymentInitiated(e) => {
                self.state = CheckoutState::AwaitingPayment {
                    order_id: e.order_id.clone(),
                    attempt: e.attempt,
                };
                self.attempts = e.attempt;
            }
            CheckoutEvent::HandoffFailed(e) => {
                self.state = CheckoutState::Placed {
                    order_id: e.order_id.clone(),
                };
            }
            CheckoutEvent::PaymentSettled(e) => {
                self.state = CheckoutState::Settled {
                    order_id: e.order_id.clone(),
                };
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CheckoutCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            CheckoutCommand::InitiatePayment(cmd) => self.handle_initiate(cmd),
            CheckoutCommand::AbandonHandoff(cmd) => self.handle_abandon(cmd),
            CheckoutCommand::Settle(cmd) => self.handle_settle(cmd),
        }
    }
}

impl CheckoutFlow {
    fn ensure_live_attempt(&self, attempt: u64) -> Result<&OrderId, DomainError> {
        match &self.state {
            CheckoutState::AwaitingPayment {
                order_id,
                attempt: live,
            } if *live == attempt => Ok(order_id),
            CheckoutState::AwaitingPayment { attempt: live, .. } => Err(DomainError::conflict(
                format!("payment attempt {attempt} was superseded by attempt {live}"),
            )),
            other => Err(DomainError::conflict(format!(
                "no payment is awaited (state: {})",
                other.name()
            ))),
        }
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<CheckoutEvent>, DomainError> {
        if let CheckoutState::AwaitingPayment { .. } = self.state {
            return Err(DomainError::conflict(
                "cannot place a new order while a payment is awaited",
            ));
        }
        if cmd.line_count == 0 {
            return Err(DomainError::validation("cannot place an order without lines"));
        }
        Ok(vec![CheckoutEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id.clone(),
            line_count: cmd.line_count,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_initiate(&self, cmd: &InitiatePayment) -> Result<Vec<CheckoutEvent>, DomainError> {
        let order_id = match &self.state {
            CheckoutState::Placed { order_id } | CheckoutState::AwaitingPayment { order_id, .. } => {
                order_id.clone()
            }
            CheckoutState::Shopping => return Err(DomainError::not_found()),
            CheckoutState::Settled { .. } => {
                return Err(DomainError::conflict("order is already settled"));
            }
        };
        Ok(vec![CheckoutEvent::PaymentInitiated(PaymentInitiated {
            order_id,
            attempt: self.attempts + 1,
            method: cmd.method,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_abandon(&self, cmd: &AbandonHandoff) -> Result<Vec<CheckoutEvent>, DomainError> {
        let order_id = self.ensure_live_attempt(cmd.attempt)?;
        Ok(vec![CheckoutEvent::HandoffFailed(HandoffFailed {
            order_id: order_id.clone(),
            attempt: cmd.attempt,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_settle(&self, cmd: &Settle) -> Result<Vec<CheckoutEvent>, DomainError> {
        let order_id = self.ensure_live_attempt(cmd.attempt)?;
        Ok(vec![CheckoutEvent::PaymentSettled(PaymentSettled {
            order_id: order_id.clone(),
            attempt: cmd.attempt,
            reason: cmd.reason,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shopfront_events::execute;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn place(flow: &mut CheckoutFlow, id: &str) {
        execute(
            flow,
            &CheckoutCommand::PlaceOrder(PlaceOrder {
                order_id: OrderId::from(id),
                line_count: 1,
                occurred_at: at(0),
            }),
        )
        .unwrap();
    }

    fn initiate(flow: &mut CheckoutFlow) -> u64 {
        let events = execute(
            flow,
            &CheckoutCommand::InitiatePayment(InitiatePayment {
                method: UpiApp::PhonePe,
                occurred_at: at(1),
            }),
        )
        .unwrap();
        match &events[..] {
            [CheckoutEvent::PaymentInitiated(e)] => e.attempt,
            other => panic!("unexpected events: {other:?}"),
        }
    }

    fn settle(attempt: u64) -> CheckoutCommand {
        CheckoutCommand::Settle(Settle {
            attempt,
            reason: SettlementReason::FallbackTimeout,
            occurred_at: at(123),
        })
    }

    #[test]
    fn happy_path_walks_every_state() {
        let mut flow = CheckoutFlow::new();
        assert_eq!(flow.state(), &CheckoutState::Shopping);

        place(&mut flow, "OD1");
        assert_eq!(flow.state().name(), "placed");

        let attempt = initiate(&mut flow);
        assert_eq!(flow.live_attempt(), Some(attempt));

        let events = execute(&mut flow, &settle(attempt)).unwrap();
        assert_eq!(events[0].event_type(), "checkout.payment.settled");
        assert_eq!(
            flow.state(),
            &CheckoutState::Settled {
                order_id: OrderId::from("OD1")
            }
        );
        assert_eq!(flow.version(), 3);
    }

    #[test]
    fn settling_twice_is_rejected_and_leaves_state() {
        let mut flow = CheckoutFlow::new();
        place(&mut flow, "OD1");
        let attempt = initiate(&mut flow);
        execute(&mut flow, &settle(attempt)).unwrap();
        let before = flow.clone();

        let err = execute(&mut flow, &settle(attempt)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(flow, before);
    }

    #[test]
    fn superseded_attempt_cannot_settle() {
        let mut flow = CheckoutFlow::new();
        place(&mut flow, "OD1");
        let first = initiate(&mut flow);
        let second = initiate(&mut flow);
        assert!(second > first);

        assert!(execute(&mut flow, &settle(first)).is_err());
        assert_eq!(flow.live_attempt(), Some(second));
        assert!(execute(&mut flow, &settle(second)).is_ok());
    }

    #[test]
    fn failed_handoff_returns_to_placed() {
        let mut flow = CheckoutFlow::new();
        place(&mut flow, "OD1");
        let attempt = initiate(&mut flow);

        execute(
            &mut flow,
            &CheckoutCommand::AbandonHandoff(AbandonHandoff {
                attempt,
                reason: "no handler".into(),
                occurred_at: at(2),
            }),
        )
        .unwrap();

        assert_eq!(flow.state().name(), "placed");
        assert!(execute(&mut flow, &settle(attempt)).is_err());
        // A retry gets a fresh attempt number.
        assert_eq!(initiate(&mut flow), attempt + 1);
    }

    #[test]
    fn cannot_pay_without_an_order() {
        let mut flow = CheckoutFlow::new();
        let err = execute(
            &mut flow,
            &CheckoutCommand::InitiatePayment(InitiatePayment {
                method: UpiApp::Paytm,
                occurred_at: at(0),
            }),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn placing_while_awaiting_payment_is_a_conflict() {
        let mut flow = CheckoutFlow::new();
        place(&mut flow, "OD1");
        initiate(&mut flow);

        let err = execute(
            &mut flow,
            &CheckoutCommand::PlaceOrder(PlaceOrder {
                order_id: OrderId::from("OD2"),
                line_count: 1,
                occurred_at: at(5),
            }),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn new_order_after_settlement_resets_attempts() {
        let mut flow = CheckoutFlow::new();
        place(&mut flow, "OD1");
        let attempt = initiate(&mut flow);
        execute(&mut flow, &settle(attempt)).unwrap();

        place(&mut flow, "OD2");
        assert_eq!(flow.state().order_id(), Some(&OrderId::from("OD2")));
        assert_eq!(initiate(&mut flow), 1);
    }

    #[test]
    fn restore_never_fabricates_settlement() {
        assert_eq!(CheckoutFlow::restore(None).state(), &CheckoutState::Shopping);
    }
}
