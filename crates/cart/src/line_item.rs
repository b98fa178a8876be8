use serde::{Deserialize, Serialize};

use shopfront_catalog::Product;
use shopfront_core::{Money, ProductId, ValueObject};

/// The variant a shopper picked. Two lines with the same product but
/// different selections are distinct lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantSelection {
    pub size: Option<String>,
    pub color: Option<String>,
    pub storage: Option<String>,
}

impl ValueObject for VariantSelection {}

impl VariantSelection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn size(size: impl Into<String>) -> Self {
        Self {
            size: Some(size.into()),
            ..Self::default()
        }
    }

    pub fn color_storage(color: impl Into<String>, storage: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            storage: Some(storage.into()),
            ..Self::default()
        }
    }
}

/// One product+variant entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub unit_price: Money,
    pub discounted_unit_price: Money,
    /// Always `>= 1` while the line is in a cart.
    pub quantity: u32,
    #[serde(default)]
    pub variant_selection: VariantSelection,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub delivery_estimate_days: u32,
}

impl CartLineItem {
    /// Snapshot the attributes of `product` needed for totals and display.
    pub fn from_product(product: &Product, variant: VariantSelection, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            unit_price: product.mrp,
            discounted_unit_price: product.sale_price,
            quantity,
            variant_selection: variant,
            image_ref: product.primary_image().map(str::to_string),
            delivery_estimate_days: product.delivery_days,
        }
    }

    /// Whether this line is the one identified by `(product_id, variant)`.
    pub fn is_line(&self, product_id: &ProductId, variant: &VariantSelection) -> bool {
        &self.product_id == product_id && &self.variant_selection == variant
    }

    /// `unit_price * quantity`.
    pub fn line_subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// `(unit_price - discounted_unit_price) * quantity`, never negative.
    pub fn line_discount(&self) -> Money {
        (self.unit_price - self.discounted_unit_price).floor_zero() * self.quantity
    }

    /// Short variant description for order views: colour and storage for
    /// phones, size for clothing and shoes, otherwise the brand.
    pub fn variant_label(&self) -> String {
        let v = &self.variant_selection;
        match self.category.to_lowercase().as_str() {
            "mobile" => {
                let parts: Vec<&str> = [v.color.as_deref(), v.storage.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                if parts.is_empty() {
                    self.brand.clone()
                } else {
                    parts.join(", ")
                }
            }
            "cloth" | "shoes" => match v.size.as_deref() {
                Some(size) => format!("Size: {size}"),
                None => self.brand.clone(),
            },
            _ => self.brand.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(category: &str, variant: VariantSelection) -> CartLineItem {
        CartLineItem {
            product_id: ProductId::from("P1"),
            name: "Thing".into(),
            brand: "Acme".into(),
            category: category.into(),
            unit_price: Money::rupees(1000),
            discounted_unit_price: Money::rupees(800),
            quantity: 2,
            variant_selection: variant,
            image_ref: None,
            delivery_estimate_days: 3,
        }
    }

    #[test]
    fn line_amounts() {
        let l = line("mobile", VariantSelection::none());
        assert_eq!(l.line_subtotal(), Money::rupees(2000));
        assert_eq!(l.line_discount(), Money::rupees(400));
    }

    #[test]
    fn discounted_price_above_unit_price_floors_discount_at_zero() {
        let mut l = line("mobile", VariantSelection::none());
        l.discounted_unit_price = Money::rupees(1100);
        assert_eq!(l.line_discount(), Money::ZERO);
    }

    #[test]
    fn variant_label_by_category() {
        assert_eq!(
            line("mobile", VariantSelection::color_storage("Black", "128 GB")).variant_label(),
            "Black, 128 GB"
        );
        assert_eq!(line("shoes", VariantSelection::size("9")).variant_label(), "Size: 9");
        assert_eq!(line("cloth", VariantSelection::none()).variant_label(), "Acme");
        assert_eq!(line("audio", VariantSelection::size("M")).variant_label(), "Acme");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(line("mobile", VariantSelection::none())).unwrap();
        assert!(json.get("discountedUnitPrice").is_some());
        assert!(json.get("deliveryEstimateDays").is_some());
    }
}
