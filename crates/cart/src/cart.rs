use serde::{Deserialize, Serialize};

use shopfront_core::{DomainError, DomainResult, ProductId};

use crate::line_item::{CartLineItem, VariantSelection};

/// Ordered cart lines (insertion order is display order).
///
/// Invariants:
/// - at most one line per `(product_id, variant_selection)`
/// - every line has `quantity >= 1`
///
/// Persisted as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from raw lines, restoring the invariants: zero-quantity
    /// lines are dropped and duplicate lines merged into the first occurrence.
    pub fn from_lines(lines: Vec<CartLineItem>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity > 0 {
                cart.merge(line);
            }
        }
        cart
    }

    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLineItem> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities across lines, saturating at `u32::MAX`.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().fold(0u32, |n, l| n.saturating_add(l.quantity))
    }

    pub fn line(&self, product_id: &ProductId, variant: &VariantSelection) -> Option<&CartLineItem> {
        self.lines.iter().find(|l| l.is_line(product_id, variant))
    }

    /// Add `item`, merging into an existing matching line by incrementing
    /// its quantity.
    pub fn add(&mut self, item: CartLineItem) -> DomainResult<()> {
        if item.quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        self.merge(item);
        Ok(())
    }

    fn merge(&mut self, item: CartLineItem) {
        match self
            .lines
            .iter_mut()
            .find(|l| l.is_line(&item.product_id, &item.variant_selection))
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => self.lines.push(item),
        }
    }

    /// Set the quantity of an existing line. `0` removes the line.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        variant: &VariantSelection,
        quantity: u32,
    ) -> DomainResult<()> {
        if quantity == 0 {
            return if self.remove(product_id, variant) {
                Ok(())
            } else {
                Err(DomainError::not_found())
            };
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.is_line(product_id, variant))
            .ok_or_else(DomainError::not_found)?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: &ProductId, variant: &VariantSelection) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| !l.is_line(product_id, variant));
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
