//! Events and change notification.
//!
//! - `Event`: facts emitted by state machines
//! - `EventBus` / `InMemoryEventBus`: broadcast to independent observers
//! - `execute`: run a command through an `Aggregate`

pub mod bus;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
