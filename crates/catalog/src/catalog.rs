//! Catalog collaborator: read-only product lookup.

use serde::Deserialize;
use thiserror::Error;

use shopfront_core::ProductId;

use crate::product::Product;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("product id is required")]
    MissingId,
}

/// Read-only product catalog.
///
/// Lookups never partially fail: a miss is `CatalogError::NotFound` and list
/// queries return an empty list rather than an error.
pub trait Catalog: Send + Sync {
    fn all_products(&self) -> Vec<Product>;

    fn product_by_id(&self, id: &ProductId) -> Result<Product, CatalogError>;

    /// Products whose category equals `category`, ignoring case.
    fn products_in_category(&self, category: &str) -> Vec<Product> {
        let wanted = category.trim().to_lowercase();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.all_products()
            .into_iter()
            .filter(|p| p.category.to_lowercase() == wanted)
            .collect()
    }

    /// Products whose name, brand or category contains `query`, ignoring
    /// case. A blank query matches nothing.
    fn search(&self, query: &str) -> Vec<Product> {
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }
        self.all_products()
            .into_iter()
            .filter(|p| p.matches_search(&term))
            .collect()
    }
}

/// Static in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Parse a `{ "products": [...] }` document.
    ///
    /// A malformed document yields an empty catalog (logged), so a bad data
    /// file shows an empty storefront instead of failing to start.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<CatalogDocument>(json) {
            Ok(doc) => Self::new(doc.products),
            Err(err) => {
                tracing::error!("failed to load product catalog: {err}");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Catalog for StaticCatalog {
    fn all_products(&self) -> Vec<Product> {
        self.products.clone()
    }

    fn product_by_id(&self, id: &ProductId) -> Result<Product, CatalogError> {
        if id.as_str().trim().is_empty() {
            return Err(CatalogError::MissingId);
        }
        self.products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| {
                tracing::debug!(product_id = %id, "catalog miss");
                CatalogError::NotFound(id.clone())
            })
    }
}
