use serde::{Deserialize, Serialize};

use shopfront_core::{Money, ProductId};

/// Variant options a product offers. Empty lists mean "no choice".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantOptions {
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub storage: Vec<String>,
}

/// A catalog product, as the catalog collaborator returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    /// List price.
    pub mrp: Money,
    /// Price actually charged.
    pub sale_price: Money,
    #[serde(default)]
    pub variants: VariantOptions,
    #[serde(default)]
    pub images: Vec<String>,
    /// Days from order to expected delivery.
    #[serde(default)]
    pub delivery_days: u32,
}

impl Product {
    /// First image, used as the cart/order thumbnail.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Discount off list price, never negative.
    pub fn discount(&self) -> Money {
        (self.mrp - self.sale_price).floor_zero()
    }

    /// Whole-percent discount for badges (`20` for `₹1000 -> ₹800`).
    pub fn discount_percent(&self) -> u32 {
        self.discount().whole_percent_of(self.mrp)
    }

    /// Case-insensitive substring match over name, brand and category.
    /// `lowered_term` must already be lowercase.
    pub(crate) fn matches_search(&self, lowered_term: &str) -> bool {
        [&self.name, &self.brand, &self.category]
            .iter()
            .any(|field| field.to_lowercase().contains(lowered_term))
    }
}
