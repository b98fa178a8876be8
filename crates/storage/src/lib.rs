//! Persisted Store.
//!
//! Key/value persistence scoped to the device, holding the cart, the current
//! order and the sale-countdown anchor. Keys and payloads are obfuscated, and
//! reads are fail-open: a storage or parse fault must never stop the shopper.

pub mod backend;
pub mod codec;
pub mod error;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use codec::Decoded;
pub use error::StorageError;
pub use store::{PersistedStore, RecordKey, StoreRegion};
