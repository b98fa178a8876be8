//! `shopfront-core`: storefront foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no storage, no platform
//! hooks): identifiers, money, the state-machine trait, and the clock/timer
//! primitives the checkout flow is driven by.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod id;
pub mod money;
pub mod timer;
pub mod value_object;

pub use aggregate::Aggregate;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId};
pub use money::Money;
pub use timer::{TimerHandle, TimerQueue};
pub use value_object::ValueObject;
