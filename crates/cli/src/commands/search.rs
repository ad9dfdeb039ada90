//! Catalog search command.
//!
//! # Usage
//!
//! ```bash
//! pos-cli search --catalog productos.json "pan"
//! ```

use std::path::Path;

use forneria_pos::catalog::{CatalogError, Product, ProductCatalog};

/// Print every product whose name contains `query`.
///
/// # Errors
///
/// Returns `CatalogError` if the catalog cannot be loaded.
pub fn run(catalog_path: &Path, query: &str) -> Result<(), CatalogError> {
    let catalog = ProductCatalog::load(catalog_path)?;
    let hits: Vec<&Product> = catalog.search(query).collect();

    if hits.is_empty() {
        tracing::info!("No products match \"{query}\"");
        return Ok(());
    }

    for product in &hits {
        tracing::info!("{}", describe(product));
    }
    tracing::info!("{} of {} products", hits.len(), catalog.len());
    Ok(())
}

/// One-line product summary: `[id] name price (stock)`.
pub fn describe(product: &Product) -> String {
    let stock = product
        .stock
        .map_or_else(|| "unlimited".to_string(), |s| format!("stock {s}"));
    format!(
        "[{}] {} {} ({stock})",
        product.id, product.name, product.unit_price
    )
}
