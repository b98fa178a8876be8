//! Cart, totals and the Cart Manager.
//!
//! ```text
//! UI action -> CartManager -> PersistedStore write -> CartChanged -> observers re-read
//! ```

pub mod cart;
pub mod line_item;
pub mod manager;
pub mod totals;

pub use cart::Cart;
pub use line_item::{CartLineItem, VariantSelection};
pub use manager::{CartChanged, CartError, CartManager, badge_label};
pub use totals::{FeePolicy, TotalsSummary, compute_totals};
