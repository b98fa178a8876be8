use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

use shopfront_cart::{FeePolicy, VariantSelection};
use shopfront_catalog::{Product, StaticCatalog, VariantOptions};
use shopfront_checkout::{
    CheckoutConfig, CheckoutError, CheckoutEvent, CheckoutSession, CheckoutState, HandoffError,
    PaymentLauncher, SettlementReason, UpiApp,
};
use shopfront_core::{DomainError, ManualClock, Money, ProductId};
use shopfront_events::Event;
use shopfront_storage::{MemoryBackend, PersistedStore, RecordKey, StorageBackend, StorageError};

#[derive(Debug, Default, Clone)]
struct RecordingLauncher {
    opened: Rc<RefCell<Vec<String>>>,
    fail: Rc<RefCell<bool>>,
}

impl PaymentLauncher for RecordingLauncher {
    fn open(&mut self, uri: &str) -> Result<(), HandoffError> {
        if *self.fail.borrow() {
            return Err(HandoffError::LaunchFailed("no handler for scheme".into()));
        }
        self.opened.borrow_mut().push(uri.to_string());
        Ok(())
    }
}

/// Memory backend whose writes can be switched off.
#[derive(Debug, Default)]
struct FlakyBackend {
    inner: MemoryBackend,
    reject_writes: AtomicBool,
}

impl StorageBackend for FlakyBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::backend("quota exceeded"));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

struct Harness {
    start: DateTime<Utc>,
    clock: ManualClock,
    launcher: RecordingLauncher,
    backend: Arc<FlakyBackend>,
    store: PersistedStore,
    session: CheckoutSession<ManualClock, RecordingLauncher>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(CheckoutConfig::default())
    }

    fn with_config(config: CheckoutConfig) -> Self {
        shopfront_observability::init();

        let start = Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let launcher = RecordingLauncher::default();
        let backend = Arc::new(FlakyBackend::default());
        let store = PersistedStore::new(backend.clone(), Arc::new(MemoryBackend::new()));
        let session = CheckoutSession::open(config, store.clone(), clock.clone(), launcher.clone());
        Self {
            start,
            clock,
            launcher,
            backend,
            store,
            session,
        }
    }

    fn fill_cart(&self) {
        let catalog = StaticCatalog::new(vec![
            product("P1", 1000, 800, "mobile"),
            product("P2", 500, 450, "cloth"),
        ]);
        let cart = self.session.cart();
        cart.add_product(&catalog, &ProductId::from("P1"), VariantSelection::color_storage("Black", "128 GB"), 2)
            .unwrap();
        cart.add_product(&catalog, &ProductId::from("P2"), VariantSelection::size("M"), 1)
            .unwrap();
    }

    /// Step the clock one second at a time up to `secs` after start,
    /// running due timers at every step like a host event loop.
    fn run_until(&mut self, secs: i64) -> Vec<CheckoutEvent> {
        let mut events = Vec::new();
        while self.clock_secs() < secs {
            self.clock.advance(Duration::seconds(1));
            events.extend(self.session.advance());
        }
        events
    }

    fn clock_secs(&self) -> i64 {
        use shopfront_core::Clock;
        (self.clock.now() - self.start).num_seconds()
    }

    fn settlements(events: &[CheckoutEvent]) -> Vec<(u64, SettlementReason)> {
        events
            .iter()
            .filter_map(|e| match e {
                CheckoutEvent::PaymentSettled(s) => Some((s.attempt, s.reason)),
                _ => None,
            })
            .collect()
    }
}

fn product(id: &str, mrp: i64, sale: i64, category: &str) -> Product {
    Product {
        id: ProductId::from(id),
        name: format!("Product {id}"),
        brand: "Acme".into(),
        category: category.into(),
        mrp: Money::rupees(mrp),
        sale_price: Money::rupees(sale),
        variants: VariantOptions::default(),
        images: vec![format!("/img/{id}.webp")],
        delivery_days: 2,
    }
}

#[test]
fn placing_an_order_persists_before_clearing_the_cart() {
    let mut h = Harness::new();
    h.fill_cart();
    let lines_before = h.session.cart().items().len();

    let order = h.session.place_order().unwrap();

    assert_eq!(order.products.len(), lines_before);
    assert_eq!(order.total_discount, Money::rupees(450));
    assert_eq!(h.session.current_order(), Some(order.clone()));
    assert_eq!(
        h.session.state(),
        &CheckoutState::Placed {
            order_id: order.order_id.clone()
        }
    );

    // Confirmation view still sees the pre-clear cart.
    h.run_until(2);
    assert_eq!(h.session.cart().item_count(), 3);

    h.run_until(3);
    assert!(h.session.cart().cart().is_empty());
    assert!(h.session.cart().cart_exists());
    assert_eq!(h.session.current_order(), Some(order));
}

#[test]
fn failed_order_write_leaves_cart_and_state_untouched() {
    let mut h = Harness::new();
    h.fill_cart();
    h.backend.reject_writes.store(true, Ordering::SeqCst);

    let err = h.session.place_order().unwrap_err();

    assert!(matches!(err, CheckoutError::Storage(_)));
    assert_eq!(h.session.state(), &CheckoutState::Shopping);
    assert_eq!(h.session.current_order(), None);
    assert_eq!(h.session.pending_timers(), 0);

    h.backend.reject_writes.store(false, Ordering::SeqCst);
    h.run_until(60);
    assert_eq!(h.session.cart().item_count(), 3);
}

#[test]
fn empty_cart_cannot_be_placed() {
    let mut h = Harness::new();
    let err = h.session.place_order().unwrap_err();
    assert!(matches!(err, CheckoutError::Domain(DomainError::Validation(_))));
}

#[test]
fn payment_link_carries_the_order_amount() {
    let mut config = CheckoutConfig::default();
    config.fees = FeePolicy::new(Money::rupees(40), Money::ZERO);
    let mut h = Harness::with_config(config);
    h.fill_cart();
    h.session.place_order().unwrap();
    h.run_until(5);
    assert!(h.session.cart().cart().is_empty());

    let attempt = h.session.initiate_payment(UpiApp::PhonePe).unwrap();

    // 2 x 800 + 450 + 40, computed from the order after the cart was cleared.
    assert_eq!(attempt.amount, Money::rupees(2_090));
    assert_eq!(attempt.attempt, 1);
    let opened = h.launcher.opened.borrow();
    assert_eq!(opened.len(), 1);
    assert!(opened[0].starts_with("phonepe://pay?"));
    assert!(opened[0].ends_with("&am=2090.00"));
}

#[test]
fn no_visibility_change_settles_at_fallback_not_before() {
    let mut h = Harness::new();
    h.fill_cart();
    h.session.place_order().unwrap();
    h.session.initiate_payment(UpiApp::GooglePay).unwrap();

    let early = h.run_until(122);
    assert!(Harness::settlements(&early).is_empty());
    assert!(matches!(h.session.state(), CheckoutState::AwaitingPayment { .. }));

    let events = h.run_until(123);
    assert_eq!(
        Harness::settlements(&events),
        vec![(1, SettlementReason::FallbackTimeout)]
    );
    assert!(matches!(h.session.state(), CheckoutState::Settled { .. }));
    assert_eq!(h.session.pending_timers(), 0);
}

#[test]
fn return_from_payment_app_settles_after_grace() {
    let mut h = Harness::new();
    h.fill_cart();
    h.session.place_order().unwrap();
    h.run_until(3);
    h.session.initiate_payment(UpiApp::Paytm).unwrap();

    h.run_until(10);
    h.session.on_visibility_change(false);
    h.run_until(40);
    h.session.on_visibility_change(true);

    assert!(Harness::settlements(&h.run_until(67)).is_empty());
    assert_eq!(
        Harness::settlements(&h.run_until(68)),
        vec![(1, SettlementReason::ReturnedFromPaymentApp)]
    );
    assert!(Harness::settlements(&h.run_until(300)).is_empty());
}

#[test]
fn flicker_then_leaving_again_settles_exactly_once() {
    let mut h = Harness::new();
    h.fill_cart();
    h.session.place_order().unwrap();
    h.session.initiate_payment(UpiApp::PhonePe).unwrap();

    h.run_until(5);
    h.session.on_visibility_change(false);
    h.run_until(6);
    h.session.on_visibility_change(true);
    h.run_until(20);
    h.session.on_visibility_change(false);

    let events = h.run_until(400);
    let settled = Harness::settlements(&events);
    assert_eq!(settled, vec![(1, SettlementReason::FallbackTimeout)]);
}

#[test]
fn reentering_payment_cancels_previous_timers() {
    let mut h = Harness::new();
    h.fill_cart();
    h.session.place_order().unwrap();
    h.session.initiate_payment(UpiApp::PhonePe).unwrap();

    h.session.on_visibility_change(false);
    h.run_until(2);
    h.session.on_visibility_change(true);
    h.run_until(10);

    // Back on the payment page, a different app.
    let second = h.session.initiate_payment(UpiApp::Paytm).unwrap();
    assert_eq!(second.attempt, 2);

    // First attempt's grace (t=30) and fallback (t=123) must not fire.
    assert!(Harness::settlements(&h.run_until(132)).is_empty());
    assert_eq!(
        Harness::settlements(&h.run_until(133)),
        vec![(2, SettlementReason::FallbackTimeout)]
    );
    assert!(Harness::settlements(&h.run_until(600)).is_empty());
}

#[test]
fn failed_handoff_resets_and_allows_retry() {
    let mut h = Harness::new();
    h.fill_cart();
    let order = h.session.place_order().unwrap();
    *h.launcher.fail.borrow_mut() = true;

    let err = h.session.initiate_payment(UpiApp::PhonePe).unwrap_err();

    assert!(matches!(err, CheckoutError::Handoff(HandoffError::LaunchFailed(_))));
    assert_eq!(
        h.session.state(),
        &CheckoutState::Placed {
            order_id: order.order_id.clone()
        }
    );
    assert!(h.session.payment_countdown().is_none());
    assert!(Harness::settlements(&h.run_until(500)).is_empty());

    *h.launcher.fail.borrow_mut() = false;
    let retry = h.session.initiate_payment(UpiApp::PhonePe).unwrap();
    assert_eq!(retry.attempt, 2);
}

#[test]
fn teardown_cancels_every_timer() {
    let mut h = Harness::new();
    h.fill_cart();
    h.session.place_order().unwrap();
    h.session.initiate_payment(UpiApp::OtherUpi).unwrap();
    h.session.on_visibility_change(false);
    h.session.on_visibility_change(true);
    assert!(h.session.pending_timers() > 0);

    h.session.teardown();

    assert_eq!(h.session.pending_timers(), 0);
    assert!(h.run_until(1_000).is_empty());
    assert!(matches!(h.session.state(), CheckoutState::AwaitingPayment { .. }));
    // The cart-clear was cancelled with the placement view.
    assert_eq!(h.session.cart().item_count(), 3);
}

#[test]
fn reload_while_awaiting_payment_restores_placed() {
    let mut h = Harness::new();
    h.fill_cart();
    let order = h.session.place_order().unwrap();
    h.session.initiate_payment(UpiApp::PhonePe).unwrap();

    let reopened = CheckoutSession::open(
        CheckoutConfig::default(),
        h.store.clone(),
        h.clock.clone(),
        RecordingLauncher::default(),
    );

    assert_eq!(
        reopened.state(),
        &CheckoutState::Placed {
            order_id: order.order_id
        }
    );
    assert_eq!(reopened.pending_timers(), 0);
}

#[test]
fn corrupt_order_record_opens_in_shopping() {
    let h = Harness::new();
    h.store.set_raw(RecordKey::CurrentOrder, "not an order").unwrap();

    let reopened = CheckoutSession::open(
        CheckoutConfig::default(),
        h.store.clone(),
        h.clock.clone(),
        RecordingLauncher::default(),
    );
    assert_eq!(reopened.state(), &CheckoutState::Shopping);
}

#[test]
fn new_order_is_refused_while_payment_is_awaited() {
    let mut h = Harness::new();
    h.fill_cart();
    h.session.place_order().unwrap();
    h.session.initiate_payment(UpiApp::PhonePe).unwrap();

    let err = h.session.place_order().unwrap_err();
    assert!(matches!(err, CheckoutError::Domain(DomainError::Conflict(_))));
}

#[test]
fn lifecycle_events_are_broadcast_in_order() {
    let mut h = Harness::new();
    let events = h.session.subscribe_events();
    h.fill_cart();
    h.session.place_order().unwrap();
    h.session.initiate_payment(UpiApp::PhonePe).unwrap();
    h.run_until(123);

    let types: Vec<&str> = events.drain().iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        vec![
            "checkout.order.placed",
            "checkout.payment.initiated",
            "checkout.payment.settled",
        ]
    );
}

#[test]
fn visible_countdown_runs_during_the_wait() {
    let mut h = Harness::new();
    h.fill_cart();
    h.session.place_order().unwrap();
    h.session.initiate_payment(UpiApp::PhonePe).unwrap();

    assert_eq!(h.session.payment_countdown().unwrap().label(), "05:00");
    h.run_until(75);
    assert_eq!(h.session.payment_countdown().unwrap().label(), "03:45");

    h.run_until(123);
    assert!(h.session.payment_countdown().is_none());
}

#[test]
fn cart_observers_hear_the_post_placement_clear() {
    let mut h = Harness::new();
    h.fill_cart();
    let changes = h.session.cart().subscribe();
    h.session.place_order().unwrap();
    assert!(!changes.take_changed());

    h.run_until(3);
    assert!(changes.take_changed());
    assert_eq!(h.session.cart().item_count(), 0);
}
