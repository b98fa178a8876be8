//! Checkout core: order placement, the order lifecycle, UPI handoff and the
//! payment-wait heuristics.
//!
//! ```text
//! CartManager --place_order--> Order (persisted) --initiate_payment--> UPI app
//!                                                         |
//!                          PaymentWaitMonitor (fallback | return grace) --> Settled
//! ```

pub mod config;
pub mod countdown;
pub mod error;
pub mod lifecycle;
pub mod monitor;
pub mod order;
pub mod payment;
pub mod session;

pub use config::{CheckoutConfig, MonitorConfig};
pub use countdown::SaleCountdown;
pub use error::CheckoutError;
pub use lifecycle::{CheckoutCommand, CheckoutEvent, CheckoutFlow, CheckoutState, SettlementReason};
pub use monitor::{MonitorSignal, PaymentWaitMonitor, WaitCountdown};
pub use order::{Order, StepStatus, TrackingStep};
pub use payment::{HandoffError, PaymentAttempt, PaymentLauncher, UpiApp, build_payment_uri, is_valid_upi_uri};
pub use session::CheckoutSession;
