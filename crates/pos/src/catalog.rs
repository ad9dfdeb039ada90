//! Read-only product catalog.
//!
//! The hosting page hands the register a JSON list of sellable products once
//! per session. Two shapes are accepted:
//!
//! ```json
//! [{"id": 1, "nombre": "Marraqueta", "precio": "1000.00", "stock_actual": 12}]
//! [{"model": "inventario.productos", "pk": 1, "fields": {"nombre": "Marraqueta", "precio": "1000.00"}}]
//! ```
//!
//! The second is what a Django `serialize("json", ...)` call emits. A missing
//! `stock_actual` means the product has no stock limit.

use std::collections::HashMap;
use std::path::Path;

use forneria_core::{Money, ProductId};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors raised while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("product {0} appears more than once in the catalog")]
    DuplicateProduct(ProductId),

    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),

    #[error("product {0} has negative stock")]
    NegativeStock(ProductId),
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Money,
    /// Units on hand; `None` means unlimited.
    pub stock: Option<u32>,
}

impl Product {
    /// Create a product with unlimited stock.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id,
            name: name.into(),
            unit_price,
            stock: None,
        }
    }

    /// Set a finite stock level.
    #[must_use]
    pub const fn with_stock(mut self, stock: u32) -> Self {
        self.stock = Some(stock);
        self
    }

    /// Whether at least one unit can be sold.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        match self.stock {
            Some(stock) => stock > 0,
            None => true,
        }
    }
}

// =============================================================================
// Wire records
// =============================================================================

#[derive(Deserialize)]
struct ProductFields {
    #[serde(alias = "name")]
    nombre: String,
    #[serde(alias = "price")]
    precio: Decimal,
    #[serde(default, alias = "stock")]
    stock_actual: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProductRecord {
    Serialized {
        pk: i32,
        fields: ProductFields,
    },
    Flat {
        id: i32,
        #[serde(flatten)]
        fields: ProductFields,
    },
}

impl ProductRecord {
    fn into_product(self) -> Result<Product, CatalogError> {
        let (id, fields) = match self {
            Self::Serialized { pk, fields } => (ProductId::new(pk), fields),
            Self::Flat { id, fields } => (ProductId::new(id), fields),
        };

        if fields.precio.is_sign_negative() && !fields.precio.is_zero() {
            return Err(CatalogError::NegativePrice(id));
        }

        let stock = fields
            .stock_actual
            .map(|s| u32::try_from(s).map_err(|_| CatalogError::NegativeStock(id)))
            .transpose()?;

        Ok(Product {
            id,
            name: fields.nombre,
            unit_price: Money::new(fields.precio),
            stock,
        })
    }
}

// =============================================================================
// ProductCatalog
// =============================================================================

/// Immutable product list with a single lookup path by identifier.
///
/// Catalog order is preserved for listing and search results.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl ProductCatalog {
    /// Build a catalog from already-parsed products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateProduct` if two products share an
    /// identifier, or `CatalogError::NegativePrice` for a negative price.
    pub fn from_products(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            if product.unit_price.is_negative() {
                return Err(CatalogError::NegativePrice(product.id));
            }
            if index.insert(product.id, position).is_some() {
                return Err(CatalogError::DuplicateProduct(product.id));
            }
        }
        Ok(Self { products, index })
    }

    /// Parse a catalog from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a record fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<ProductRecord> = serde_json::from_str(json)?;
        let products = records
            .into_iter()
            .map(ProductRecord::into_product)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_products(products)
    }

    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are invalid.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&json)?;
        debug!(products = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Look up a product by identifier.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.index
            .get(&id)
            .and_then(|&position| self.products.get(position))
    }

    /// Products whose name contains `query`, ignoring case.
    ///
    /// An empty (or all-whitespace) query matches every product.
    pub fn search<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a Product> + use<'a> {
        let needle = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(move |p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bakery() -> ProductCatalog {
        ProductCatalog::from_products(vec![
            Product::new(ProductId::new(1), "Marraqueta", Money::from_units(1000)),
            Product::new(ProductId::new(2), "Hallulla", Money::from_units(1200)).with_stock(5),
            Product::new(ProductId::new(3), "Pan Amasado", Money::from_units(1500)).with_stock(0),
        ])
        .unwrap()
    }

    #[test]
    fn test_get_by_identifier() {
        let catalog = bakery();
        assert_eq!(catalog.get(ProductId::new(2)).unwrap().name, "Hallulla");
        assert!(catalog.get(ProductId::new(99)).is_none());
    }

    #[test]
    fn test_search_is_case_insensitive_and_ordered() {
        let catalog = bakery();
        let names: Vec<_> = catalog.search("A").map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Marraqueta", "Hallulla", "Pan Amasado"]);

        let names: Vec<_> = catalog.search("  amas ").map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Pan Amasado"]);

        assert_eq!(catalog.search("").count(), 3);
        assert_eq!(catalog.search("croissant").count(), 0);
    }

    #[test]
    fn test_from_json_flat_records() {
        let catalog = ProductCatalog::from_json(
            r#"[
                {"id": 1, "nombre": "Marraqueta", "precio": "1000.00", "stock_actual": 12},
                {"id": 2, "nombre": "Queque", "precio": 4500}
            ]"#,
        )
        .unwrap();

        let first = catalog.get(ProductId::new(1)).unwrap();
        assert_eq!(first.unit_price, Money::from_units(1000));
        assert_eq!(first.stock, Some(12));
        assert_eq!(catalog.get(ProductId::new(2)).unwrap().stock, None);
    }

    #[test]
    fn test_from_json_django_serializer_records() {
        let catalog = ProductCatalog::from_json(
            r#"[{"model": "inventario.productos", "pk": 7,
                 "fields": {"nombre": "Empanada", "precio": "2200.00", "stock_actual": 3}}]"#,
        )
        .unwrap();

        let product = catalog.get(ProductId::new(7)).unwrap();
        assert_eq!(product.name, "Empanada");
        assert_eq!(product.stock, Some(3));
    }

    #[test]
    fn test_from_json_english_aliases() {
        let catalog =
            ProductCatalog::from_json(r#"[{"id": 4, "name": "Kuchen", "price": 6000, "stock": 2}]"#)
                .unwrap();
        assert_eq!(catalog.get(ProductId::new(4)).unwrap().stock, Some(2));
    }

    #[test]
    fn test_rejects_duplicate_identifiers() {
        let result = ProductCatalog::from_json(
            r#"[{"id": 1, "nombre": "A", "precio": 1}, {"id": 1, "nombre": "B", "precio": 2}]"#,
        );
        assert!(matches!(
            result,
            Err(CatalogError::DuplicateProduct(id)) if id == ProductId::new(1)
        ));
    }

    #[test]
    fn test_rejects_negative_values() {
        assert!(matches!(
            ProductCatalog::from_json(r#"[{"id": 1, "nombre": "A", "precio": "-1"}]"#),
            Err(CatalogError::NegativePrice(_))
        ));
        assert!(matches!(
            ProductCatalog::from_json(r#"[{"id": 1, "nombre": "A", "precio": 1, "stock_actual": -2}]"#),
            Err(CatalogError::NegativeStock(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            ProductCatalog::from_json("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_availability() {
        let catalog = bakery();
        assert!(catalog.get(ProductId::new(1)).unwrap().is_available());
        assert!(!catalog.get(ProductId::new(3)).unwrap().is_available());
    }
}
