//! Product catalog collaborator.
//!
//! The checkout core only needs lookups by id; listing, category filtering
//! and search are simple filters over a static list.

pub mod catalog;
pub mod product;

pub use catalog::{Catalog, CatalogError, StaticCatalog};
pub use product::{Product, VariantOptions};
