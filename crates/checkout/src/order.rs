//! The synthetic "current order" record.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use shopfront_cart::{CartLineItem, FeePolicy, TotalsSummary, compute_totals};
use shopfront_core::{DomainError, DomainResult, Money, OrderId};
use shopfront_storage::{PersistedStore, RecordKey, StorageError};

/// Snapshot of the cart at placement time. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub order_date: NaiveDate,
    pub products: Vec<CartLineItem>,
    pub total_discount: Money,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build an order from the cart lines as they are at `now`.
    pub fn from_cart<R: Rng + ?Sized>(
        lines: Vec<CartLineItem>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("cannot place an order for an empty cart"));
        }
        let total_discount = compute_totals(&lines, &FeePolicy::FREE).total_discount;
        Ok(Self {
            order_id: OrderId::generate(now, rng),
            order_date: now.date_naive(),
            products: lines,
            total_discount,
            created_at: now,
        })
    }

    /// Totals recomputed from the snapshot. Stable after the cart is cleared.
    pub fn totals(&self, fees: &FeePolicy) -> TotalsSummary {
        compute_totals(&self.products, fees)
    }

    /// The line shown on order details.
    pub fn primary_item(&self) -> Option<&CartLineItem> {
        self.products.first()
    }

    /// `16 Oct 2026`
    pub fn formatted_date(&self) -> String {
        self.order_date.format("%d %b %Y").to_string()
    }

    /// Expected delivery of the primary item.
    pub fn expected_delivery(&self) -> NaiveDate {
        let days = self
            .primary_item()
            .map(|l| l.delivery_estimate_days)
            .unwrap_or_default();
        self.order_date + Duration::days(i64::from(days))
    }

    /// Order-status timeline. Only the confirmation step is ever complete.
    pub fn tracking_steps(&self) -> Vec<TrackingStep> {
        let placed = self.formatted_date();
        let delivery = self.expected_delivery().format("%a, %d %b").to_string();
        vec![
            TrackingStep::completed(
                format!("Order Confirmed, {placed}"),
                format!("Your Order has been placed, {placed}"),
            ),
            TrackingStep::pending(format!("Shipped, Expected By {delivery}")),
            TrackingStep::pending("Out For Delivery"),
            TrackingStep::pending(format!("Delivery, {delivery} By 11 PM")),
        ]
    }

    /// Read the current order. Missing or unreadable records read as `None`.
    pub fn load(store: &PersistedStore) -> Option<Order> {
        store.get_optional(RecordKey::CurrentOrder)
    }

    /// Persist as the current order, replacing any previous one.
    pub fn save(&self, store: &PersistedStore) -> Result<(), StorageError> {
        store.set(RecordKey::CurrentOrder, self)
    }

    pub fn clear(store: &PersistedStore) -> Result<(), StorageError> {
        store.clear(RecordKey::CurrentOrder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingStep {
    pub title: String,
    pub description: Option<String>,
    pub status: StepStatus,
}

impl TrackingStep {
    fn completed(title: String, description: String) -> Self {
        Self {
            title,
            description: Some(description),
            status: StepStatus::Completed,
        }
    }

    fn pending(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: StepStatus::Pending,
        }
    }
}
