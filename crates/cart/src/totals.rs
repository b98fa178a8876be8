//! Totals Calculator.
//!
//! A pure function of the cart lines and the fee policy. Values are exact;
//! call [`TotalsSummary::rounded`] only when presenting them.

use serde::{Deserialize, Serialize};

use shopfront_core::Money;

use crate::line_item::CartLineItem;

/// Flat per-order fees. Applied once per non-empty order, never discounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub delivery_charges: Money,
    pub packaging_fee: Money,
}

impl FeePolicy {
    /// Free delivery, no packaging fee.
    pub const FREE: FeePolicy = FeePolicy {
        delivery_charges: Money::ZERO,
        packaging_fee: Money::ZERO,
    };

    pub fn new(delivery_charges: Money, packaging_fee: Money) -> Self {
        Self {
            delivery_charges,
            packaging_fee,
        }
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::FREE
    }
}

/// Derived cart totals. Never persisted on its own.
///
/// `final_amount == total_mrp - total_discount + delivery_charges + packaging_fee`
/// and `savings == total_discount`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsSummary {
    pub total_mrp: Money,
    pub total_discount: Money,
    pub delivery_charges: Money,
    pub packaging_fee: Money,
    pub final_amount: Money,
    pub total_items: u32,
    pub savings: Money,
}

impl TotalsSummary {
    /// Copy with every amount rounded to paise, for display.
    pub fn rounded(&self) -> Self {
        Self {
            total_mrp: self.total_mrp.rounded(),
            total_discount: self.total_discount.rounded(),
            delivery_charges: self.delivery_charges.rounded(),
            packaging_fee: self.packaging_fee.rounded(),
            final_amount: self.final_amount.rounded(),
            total_items: self.total_items,
            savings: self.savings.rounded(),
        }
    }
}

/// Compute totals for `lines`. An empty cart yields an all-zero summary.
pub fn compute_totals(lines: &[CartLineItem], fees: &FeePolicy) -> TotalsSummary {
    if lines.is_empty() {
        return TotalsSummary::default();
    }

    let total_mrp: Money = lines.iter().map(CartLineItem::line_subtotal).sum();
    let total_discount: Money = lines.iter().map(CartLineItem::line_discount).sum();
    let total_items = lines.iter().fold(0u32, |n, l| n.saturating_add(l.quantity));

    TotalsSummary {
        total_mrp,
        total_discount,
        delivery_charges: fees.delivery_charges,
        packaging_fee: fees.packaging_fee,
        final_amount: total_mrp - total_discount + fees.delivery_charges + fees.packaging_fee,
        total_items,
        savings: total_discount,
    }
}
