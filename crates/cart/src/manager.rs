//! Cart Manager: the only writer of the cart record.

use std::sync::Arc;

use thiserror::Error;

use shopfront_catalog::{Catalog, CatalogError, Product};
use shopfront_core::{DomainError, ProductId};
use shopfront_events::{EventBus, InMemoryEventBus, Subscription};
use shopfront_storage::{Decoded, PersistedStore, RecordKey, StorageError};

use crate::cart::Cart;
use crate::line_item::{CartLineItem, VariantSelection};
use crate::totals::{FeePolicy, TotalsSummary, compute_totals};

/// Payload-less "cart changed" broadcast. Subscribers re-read the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartChanged;

#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Owns the canonical cart record.
///
/// Every mutation loads the persisted cart, applies the change, writes it
/// back, and only then publishes [`CartChanged`]. A failed write publishes
/// nothing.
#[derive(Debug, Clone)]
pub struct CartManager {
    store: PersistedStore,
    bus: Arc<InMemoryEventBus<CartChanged>>,
    fees: FeePolicy,
}

impl CartManager {
    pub fn new(store: PersistedStore, fees: FeePolicy) -> Self {
        Self::with_bus(store, Arc::new(InMemoryEventBus::new()), fees)
    }

    /// Share a notification bus with other managers over the same store.
    pub fn with_bus(
        store: PersistedStore,
        bus: Arc<InMemoryEventBus<CartChanged>>,
        fees: FeePolicy,
    ) -> Self {
        Self { store, bus, fees }
    }

    pub fn fees(&self) -> &FeePolicy {
        &self.fees
    }

    pub fn store(&self) -> &PersistedStore {
        &self.store
    }

    /// Current cart. Missing or unreadable data reads as an empty cart.
    pub fn cart(&self) -> Cart {
        let stored: Cart = self.store.get_or_default(RecordKey::Cart);
        Cart::from_lines(stored.into_lines())
    }

    pub fn items(&self) -> Vec<CartLineItem> {
        self.cart().into_lines()
    }

    /// Whether a cart record has ever been written (an empty cart counts).
    pub fn cart_exists(&self) -> bool {
        matches!(self.store.get::<Cart>(RecordKey::Cart), Decoded::Value(_))
    }

    pub fn item_count(&self) -> u32 {
        self.cart().item_count()
    }

    /// Totals recomputed from the persisted cart on every call.
    pub fn totals(&self) -> TotalsSummary {
        compute_totals(self.cart().lines(), &self.fees)
    }

    pub fn subscribe(&self) -> Subscription<CartChanged> {
        self.bus.subscribe()
    }

    pub fn add_item(
        &self,
        product: &Product,
        variant: VariantSelection,
        quantity: u32,
    ) -> Result<(), CartError> {
        let item = CartLineItem::from_product(product, variant, quantity);
        self.mutate(|cart| cart.add(item))
    }

    /// Look `product_id` up in `catalog` and add it. A miss leaves the cart untouched.
    pub fn add_product(
        &self,
        catalog: &dyn Catalog,
        product_id: &ProductId,
        variant: VariantSelection,
        quantity: u32,
    ) -> Result<(), CartError> {
        let product = catalog.product_by_id(product_id).inspect_err(|err| {
            tracing::warn!(product_id = %product_id, "cannot add to cart: {err}");
        })?;
        self.add_item(&product, variant, quantity)
    }

    /// `quantity == 0` removes the line.
    pub fn set_quantity(
        &self,
        product_id: &ProductId,
        variant: &VariantSelection,
        quantity: u32,
    ) -> Result<(), CartError> {
        self.mutate(|cart| cart.set_quantity(product_id, variant, quantity))
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove_item(
        &self,
        product_id: &ProductId,
        variant: &VariantSelection,
    ) -> Result<bool, CartError> {
        let mut removed = false;
        self.mutate(|cart| {
            removed = cart.remove(product_id, variant);
            Ok(())
        })?;
        Ok(removed)
    }

    /// Empty the cart. Idempotent. The record is kept as an empty cart.
    pub fn clear(&self) -> Result<(), CartError> {
        self.mutate(|cart| {
            cart.clear();
            Ok(())
        })
    }

    fn mutate<F>(&self, change: F) -> Result<(), CartError>
    where
        F: FnOnce(&mut Cart) -> Result<(), DomainError>,
    {
        let mut cart = self.cart();
        change(&mut cart)?;
        self.store.set(RecordKey::Cart, &cart)?;

        tracing::debug!(lines = cart.lines().len(), items = cart.item_count(), "cart updated");
        if let Err(err) = self.bus.publish(CartChanged) {
            tracing::warn!(?err, "cart change notification not delivered");
        }
        Ok(())
    }
}

/// Header badge text: hidden at zero, capped at `99+`.
pub fn badge_label(count: u32) -> Option<String> {
    match count {
        0 => None,
        1..=99 => Some(count.to_string()),
        _ => Some("99+".to_string()),
    }
}
