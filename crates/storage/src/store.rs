//! Typed, fail-open record store over two storage regions.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::{MemoryBackend, StorageBackend};
use crate::codec::{self, Decoded};
use crate::error::StorageError;

/// Lifetime scope of a storage region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreRegion {
    /// Long-lived device storage (cart, current order).
    Local,
    /// Medium-lived storage (promotional countdown anchor).
    Session,
}

/// The records the storefront persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Cart,
    CurrentOrder,
    CountdownAnchor,
}

impl RecordKey {
    /// Human-readable name, used in logs only.
    pub fn semantic_name(&self) -> &'static str {
        match self {
            RecordKey::Cart => "shopfront_cart_2025",
            RecordKey::CurrentOrder => "shopfront_current_order_2025",
            RecordKey::CountdownAnchor => "sale_countdown_start",
        }
    }

    pub fn region(&self) -> StoreRegion {
        match self {
            RecordKey::Cart | RecordKey::CurrentOrder => StoreRegion::Local,
            RecordKey::CountdownAnchor => StoreRegion::Session,
        }
    }

    /// Opaque key actually written to the backend.
    pub fn storage_key(&self) -> String {
        codec::obfuscate_key(self.semantic_name())
    }
}

/// Persisted Store.
///
/// - `get` never fails: missing or unreadable data is reported as
///   `Decoded::Empty` / `Decoded::Fault` and callers collapse it to a default.
/// - `set` and `clear` report backend failures so callers can refuse to
///   proceed (e.g. not clearing the cart when an order failed to persist).
///
/// Cheap to clone; clones share the backends. Last writer wins.
#[derive(Clone)]
pub struct PersistedStore {
    local: Arc<dyn StorageBackend>,
    session: Arc<dyn StorageBackend>,
}

impl core::fmt::Debug for PersistedStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PersistedStore").finish_non_exhaustive()
    }
}

impl PersistedStore {
    pub fn new(local: Arc<dyn StorageBackend>, session: Arc<dyn StorageBackend>) -> Self {
        Self { local, session }
    }

    /// Store backed entirely by memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()))
    }

    fn backend(&self, region: StoreRegion) -> &dyn StorageBackend {
        match region {
            StoreRegion::Local => self.local.as_ref(),
            StoreRegion::Session => self.session.as_ref(),
        }
    }

    /// Read and decode a record.
    pub fn get<T: DeserializeOwned>(&self, key: RecordKey) -> Decoded<T> {
        let raw = match self.backend(key.region()).get(&key.storage_key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Decoded::Empty,
            Err(err) => return Decoded::Fault(err.to_string()),
        };
        codec::decode(&raw)
    }

    /// Read a record, collapsing missing or unreadable data to `T::default()`.
    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: RecordKey) -> T {
        self.get(key).or_default(key.semantic_name())
    }

    /// Read a record, collapsing missing or unreadable data to `None`.
    pub fn get_optional<T: DeserializeOwned>(&self, key: RecordKey) -> Option<T> {
        self.get(key).into_option(key.semantic_name())
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: RecordKey, value: &T) -> Result<(), StorageError> {
        let encoded = codec::encode(value)?;
        self.backend(key.region())
            .set(&key.storage_key(), encoded)
            .inspect_err(|err| tracing::error!(record = key.semantic_name(), "failed to persist record: {err}"))
    }

    pub fn clear(&self, key: RecordKey) -> Result<(), StorageError> {
        self.backend(key.region())
            .remove(&key.storage_key())
            .inspect_err(|err| tracing::error!(record = key.semantic_name(), "failed to clear record: {err}"))
    }

    /// Write a raw, already-encoded string (for migration tooling and tests
    /// that need to plant corrupt data).
    pub fn set_raw(&self, key: RecordKey, raw: impl Into<String>) -> Result<(), StorageError> {
        self.backend(key.region()).set(&key.storage_key(), raw.into())
    }
}
